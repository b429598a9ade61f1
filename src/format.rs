//! Archive format detection (spec.md §4.5).

use std::path::Path;

use crate::error::Error;

/// One of the four supported archive families. Detected solely from the
/// path suffix, case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    TarGz,
    Zip,
    Gzip,
}

impl ArchiveFormat {
    /// Detect a format from a path's suffix. Ties are resolved by longest
    /// suffix, so `.tar.gz`/`.tgz` are matched before the bare `.gz` case.
    pub fn detect(path: &Path) -> Result<Self, Error> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else if name.ends_with(".tar") {
            Ok(Self::Tar)
        } else if name.ends_with(".zip") {
            Ok(Self::Zip)
        } else if name.ends_with(".gz") || name.ends_with(".gzip") {
            Ok(Self::Gzip)
        } else {
            Err(Error::InvalidFormat {
                detail: format!("unrecognized archive suffix in '{}'", path.display()),
            })
        }
    }

    /// The compression label reported in `ArchiveInfo.compression`.
    pub fn compression_label(self) -> &'static str {
        match self {
            Self::Tar => "none",
            Self::TarGz | Self::Gzip => "gzip",
            Self::Zip => "deflate",
        }
    }
}
