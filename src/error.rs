use std::fmt;

/// Stable, machine-readable error kind, matching the codes in spec.md §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidFormat,
    UnsupportedCompression,
    PathTraversal,
    AbsolutePath,
    SymlinkEscape,
    DecompressionBomb,
    MaxSizeExceeded,
    MaxEntriesExceeded,
    CorruptArchive,
    FileExists,
    ChecksumMismatch,
    InvalidStartPath,
    InvalidMarkers,
    InvalidBoundary,
    RepositoryNotFound,
    TraversalLoop,
    InvalidPath,
    PathEscape,
    Io,
    Cancelled,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::InvalidFormat => "invalid-format",
            Self::UnsupportedCompression => "unsupported-compression",
            Self::PathTraversal => "path-traversal",
            Self::AbsolutePath => "absolute-path",
            Self::SymlinkEscape => "symlink-escape",
            Self::DecompressionBomb => "decompression-bomb",
            Self::MaxSizeExceeded => "max-size-exceeded",
            Self::MaxEntriesExceeded => "max-entries-exceeded",
            Self::CorruptArchive => "corrupt-archive",
            Self::FileExists => "file-exists",
            Self::ChecksumMismatch => "checksum-mismatch",
            Self::InvalidStartPath => "invalid-start-path",
            Self::InvalidMarkers => "invalid-markers",
            Self::InvalidBoundary => "invalid-boundary",
            Self::RepositoryNotFound => "repository-not-found",
            Self::TraversalLoop => "traversal-loop",
            Self::InvalidPath => "invalid-path",
            Self::PathEscape => "path-escape",
            Self::Io => "io-error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug)]
pub enum Error {
    /// Unknown format, empty output path, zero sources, or gzip of a
    /// directory / multi-file set.
    InvalidFormat { detail: String },

    /// Requested compression level or checksum algorithm is not honored.
    UnsupportedCompression { detail: String },

    /// An entry path (or a patched target) contains `..` after cleaning.
    PathTraversal { entry: String, detail: String },

    /// Archive entry uses an absolute path.
    AbsolutePath { entry: String },

    /// Path escapes destination directory (Zip Slip), or a symlink's target
    /// resolves outside the destination.
    PathEscape { entry: String, detail: String },

    /// Archive contains symlink and policy is Error.
    SymlinkNotAllowed { entry: String, target: String },

    /// Ratio or entry-count decompression-bomb heuristic tripped.
    DecompressionBomb { detail: String },

    /// Exceeded maximum total bytes.
    TotalSizeExceeded { limit: u64, would_be: u64 },

    /// Exceeded maximum file count.
    FileCountExceeded { limit: usize, attempted: usize },

    /// Single file exceeds size limit.
    FileTooLarge {
        entry: String,
        limit: u64,
        size: u64,
    },

    /// Actual decompressed size exceeds declared size (potential zip bomb).
    SizeMismatch {
        entry: String,
        declared: u64,
        actual: u64,
    },

    /// Path exceeds depth limit.
    PathTooDeep {
        entry: String,
        depth: usize,
        limit: usize,
    },

    /// File already exists and policy is Error.
    AlreadyExists { path: String },

    /// Archive headers or bodies could not be parsed.
    CorruptArchive { operation: String, detail: String },

    /// Destination directory does not exist or is invalid.
    DestinationNotFound { path: String },

    /// Filename contains invalid characters or reserved names.
    InvalidFilename { entry: String, reason: String },

    /// A declared checksum did not match the computed one.
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// Repository-root finder: start path empty or does not exist.
    InvalidStartPath { detail: String },

    /// Repository-root finder: marker list is empty.
    InvalidMarkers,

    /// Repository-root finder: boundary path is invalid.
    InvalidBoundary { detail: String },

    /// Repository-root finder: no marker found; carries the termination reason.
    RepositoryNotFound { reason: &'static str },

    /// Repository-root finder: a symlink loop was detected while following links.
    TraversalLoop { path: String },

    /// Path Guard: path is empty, `.`, `/`, `\`, or otherwise structurally invalid.
    InvalidPath { path: String, detail: String },

    /// The Discovery Walker observed a cancellation signal between entries.
    Cancelled,

    /// Zip format error.
    Zip(zip::result::ZipError),

    /// IO error.
    Io(std::io::Error),
}

impl Error {
    /// Wrap an I/O error with operation/path context, folded into the
    /// message since `Error::Io` itself carries none.
    pub fn io(context: &str, path: Option<String>, err: std::io::Error) -> Self {
        let msg = match path {
            Some(p) => format!("{context} ({p}): {err}"),
            None => format!("{context}: {err}"),
        };
        Self::Io(std::io::Error::new(err.kind(), msg))
    }

    /// The stable machine-readable kind for this error, per spec.md §7.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFormat { .. } => ErrorKind::InvalidFormat,
            Self::UnsupportedCompression { .. } => ErrorKind::UnsupportedCompression,
            Self::PathTraversal { .. } => ErrorKind::PathTraversal,
            Self::AbsolutePath { .. } => ErrorKind::AbsolutePath,
            Self::PathEscape { .. } => ErrorKind::PathEscape,
            Self::SymlinkNotAllowed { .. } => ErrorKind::SymlinkEscape,
            Self::DecompressionBomb { .. } => ErrorKind::DecompressionBomb,
            Self::TotalSizeExceeded { .. } => ErrorKind::MaxSizeExceeded,
            Self::FileCountExceeded { .. } => ErrorKind::MaxEntriesExceeded,
            Self::FileTooLarge { .. } => ErrorKind::MaxSizeExceeded,
            Self::SizeMismatch { .. } => ErrorKind::DecompressionBomb,
            Self::PathTooDeep { .. } => ErrorKind::PathTraversal,
            Self::AlreadyExists { .. } => ErrorKind::FileExists,
            Self::CorruptArchive { .. } => ErrorKind::CorruptArchive,
            Self::DestinationNotFound { .. } => ErrorKind::InvalidPath,
            Self::InvalidFilename { .. } => ErrorKind::InvalidPath,
            Self::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            Self::InvalidStartPath { .. } => ErrorKind::InvalidStartPath,
            Self::InvalidMarkers => ErrorKind::InvalidMarkers,
            Self::InvalidBoundary { .. } => ErrorKind::InvalidBoundary,
            Self::RepositoryNotFound { .. } => ErrorKind::RepositoryNotFound,
            Self::TraversalLoop { .. } => ErrorKind::TraversalLoop,
            Self::InvalidPath { .. } => ErrorKind::InvalidPath,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Zip(_) => ErrorKind::CorruptArchive,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

/// Format bytes in human-readable form (e.g., "1.5 GB").
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat { detail } => write!(f, "invalid format: {}", detail),
            Self::UnsupportedCompression { detail } => {
                write!(f, "unsupported compression: {}", detail)
            }
            Self::PathTraversal { entry, detail } => {
                write!(f, "path traversal in '{}': {}", entry, detail)
            }
            Self::AbsolutePath { entry } => {
                write!(f, "archive entry uses absolute path '{}'", entry)
            }
            Self::PathEscape { entry, detail } => {
                write!(f, "path '{}' escapes destination: {}", entry, detail)
            }
            Self::SymlinkNotAllowed { entry, target } => {
                write!(
                    f,
                    "symlink '{}' -> '{}' is not allowed or escapes the destination",
                    entry, target
                )
            }
            Self::DecompressionBomb { detail } => {
                write!(f, "decompression bomb detected: {}", detail)
            }
            Self::CorruptArchive { operation, detail } => {
                write!(f, "corrupt archive during {}: {}", operation, detail)
            }
            Self::ChecksumMismatch {
                path,
                expected,
                actual,
            } => write!(
                f,
                "checksum mismatch for '{}': expected {}, got {}",
                path, expected, actual
            ),
            Self::InvalidStartPath { detail } => write!(f, "invalid start path: {}", detail),
            Self::InvalidMarkers => write!(f, "marker list must be non-empty"),
            Self::InvalidBoundary { detail } => write!(f, "invalid boundary: {}", detail),
            Self::RepositoryNotFound { reason } => {
                write!(f, "repository root not found ({})", reason)
            }
            Self::TraversalLoop { path } => write!(f, "symlink loop detected at '{}'", path),
            Self::InvalidPath { path, detail } => {
                write!(f, "invalid path '{}': {}", path, detail)
            }
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::TotalSizeExceeded { limit, would_be } => {
                write!(
                    f, 
                    "extraction would write {}, exceeding the {} limit",
                    format_bytes(*would_be),
                    format_bytes(*limit)
                )
            }
            Self::FileCountExceeded { limit, attempted } => {
                write!(
                    f, 
                    "archive contains {} files, exceeding the {} file limit",
                    attempted, limit
                )
            }
            Self::FileTooLarge { entry, limit, size } => {
                write!(
                    f, 
                    "file '{}' is {} (limit: {})",
                    entry,
                    format_bytes(*size),
                    format_bytes(*limit)
                )
            }
            Self::SizeMismatch { entry, declared, actual } => {
                write!(
                    f,
                    "file '{}' decompressed to {} but declared {} (possible zip bomb)",
                    entry,
                    format_bytes(*actual),
                    format_bytes(*declared)
                )
            }
            Self::PathTooDeep { entry, depth, limit } => {
                write!(
                    f, 
                    "path '{}' has {} directory levels (limit: {})",
                    entry, depth, limit
                )
            }
            Self::AlreadyExists { path } => {
                write!(f, "file '{}' already exists", path)
            }
            Self::DestinationNotFound { path } => {
                write!(f, "destination directory '{}' does not exist", path)
            }
            Self::InvalidFilename { entry, reason } => {
                write!(f, "invalid filename '{}': {}", entry, reason)
            }
            Self::Zip(e) => write!(f, "zip format error: {}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Zip(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

// Automatic conversions for ease of use
impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self { Self::Zip(e) }
}
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self { Self::Io(e) }
}