//! `fulpack`: secure archive create/extract/scan/verify engine with
//! glob-based discovery inside a bounded filesystem root (spec.md §1-§2).
//!
//! The four façade operations — [`create`], [`extract`], [`scan`],
//! [`verify`] — plus [`info`] are the primary entry points; [`find_files`]
//! and [`find_repository_root`] are the filesystem-discovery collaborator
//! (pathfinder) used to build the source lists and destination roots those
//! operations act on.
//!
//! ```no_run
//! use fulpack::{CreateOptions, ExtractOptions};
//! use std::path::Path;
//!
//! fulpack::create(
//!     &[Path::new("src").to_path_buf()],
//!     Path::new("bundle.tar.gz"),
//!     fulpack::ArchiveFormat::TarGz,
//!     &CreateOptions::default(),
//! )?;
//!
//! fulpack::extract(Path::new("bundle.tar.gz"), Path::new("/tmp/out"), &ExtractOptions::default())?;
//! # Ok::<(), fulpack::Error>(())
//! ```

mod cancel;
mod checksum;
mod codec;
mod discovery;
mod entry;
mod error;
mod facade;
mod finder;
mod format;
mod ignore;
mod options;
mod path_guard;
mod telemetry;

pub use cancel::{Ctx, Signal};
pub use checksum::ChecksumAlgorithm;
pub use entry::{ArchiveEntry, EntryType};
pub use error::{Error, ErrorKind};
pub use format::ArchiveFormat;
pub use ignore::IgnoreMatcher;
pub use options::{
    ArchiveInfo, CreateOptions, ErrorHandler, ExtractOptions, ExtractResult, ExtractionError,
    FindQuery, FindRootQuery, FinderSeverity, OverwritePolicy, PathResult, ProgressCallback,
    ScanOptions, ValidationError, ValidationResult, VerifyOptions,
};
pub use telemetry::{set_emitter, MetricsEmitter, OperationMetrics};

pub use facade::{create, extract, info, scan, verify};
pub use finder::find_repository_root;

/// Walk `query.root` and return every file matching its include/exclude
/// patterns and `.fulmenignore` rules (spec.md §4.3).
pub fn find_files(query: &FindQuery) -> Result<Vec<PathResult>, Error> {
    discovery::find_files(query)
}
