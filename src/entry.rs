//! Archive entry types shared by the codec and façade.

use chrono::{DateTime, Utc};

/// The kind of filesystem object an archive entry represents.
///
/// Other tar/zip record types (device nodes, fifos, hardlinks) are not
/// represented here; the codec counts them as "skipped" during scan/extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
    Symlink,
}

/// A single entry as produced by [`crate::facade::scan`] and consumed
/// internally by [`crate::facade::extract`].
///
/// Invariant: `path` is non-empty, never starts with `/` or a drive root,
/// uses forward slashes, and `path_guard::clean(path) == path`.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub path: String,
    pub entry_type: EntryType,
    /// Uncompressed size in bytes. 0 for directories and typically for symlinks.
    pub size: u64,
    /// Compressed size, where the format exposes it; 0 otherwise.
    pub compressed_size: u64,
    pub modified: Option<DateTime<Utc>>,
    /// POSIX permission bits, where applicable.
    pub mode: Option<u32>,
    /// Symlink target, stored verbatim from the archive. Only set for symlinks.
    pub link_target: Option<String>,
}

impl ArchiveEntry {
    pub fn depth(&self) -> usize {
        self.path.split('/').filter(|s| !s.is_empty()).count()
    }
}
