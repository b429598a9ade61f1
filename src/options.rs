//! Options and result types shared across the façade, the Discovery Walker,
//! and the Repository-Root Finder (spec.md §3).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::cancel::Ctx;
use crate::entry::EntryType;

// ===========================================================================
// Create
// ===========================================================================

#[derive(Clone)]
pub struct CreateOptions {
    pub compression_level: u32,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub checksum_algorithm: String,
    pub preserve_permissions: bool,
    pub follow_symlinks: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            compression_level: 6,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            checksum_algorithm: "sha256".to_string(),
            preserve_permissions: true,
            follow_symlinks: false,
        }
    }
}

impl CreateOptions {
    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = level;
        self
    }

    pub fn include_patterns(mut self, patterns: Vec<String>) -> Self {
        self.include_patterns = patterns;
        self
    }

    pub fn exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    pub fn checksum_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.checksum_algorithm = algorithm.into();
        self
    }

    pub fn preserve_permissions(mut self, preserve: bool) -> Self {
        self.preserve_permissions = preserve;
        self
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }
}

// ===========================================================================
// Extract
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    #[default]
    Error,
    Skip,
    Overwrite,
}

#[derive(Clone)]
pub struct ExtractOptions {
    pub overwrite: OverwritePolicy,
    pub verify_checksums: bool,
    pub preserve_permissions: bool,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub max_size: u64,
    pub max_entries: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            overwrite: OverwritePolicy::Error,
            verify_checksums: true,
            preserve_permissions: true,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            max_size: 1024 * 1024 * 1024, // 1 GiB
            max_entries: 10_000,
        }
    }
}

impl ExtractOptions {
    pub fn overwrite(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite = policy;
        self
    }

    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    pub fn preserve_permissions(mut self, preserve: bool) -> Self {
        self.preserve_permissions = preserve;
        self
    }

    pub fn include_patterns(mut self, patterns: Vec<String>) -> Self {
        self.include_patterns = patterns;
        self
    }

    pub fn exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    pub fn max_size(mut self, bytes: u64) -> Self {
        self.max_size = bytes;
        self
    }

    pub fn max_entries(mut self, entries: usize) -> Self {
        self.max_entries = entries;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionError {
    pub path: String,
    pub message: String,
    pub code: &'static str,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractResult {
    pub extracted_count: usize,
    pub skipped_count: usize,
    pub error_count: usize,
    pub bytes_written: u64,
    pub errors: Vec<ExtractionError>,
}

// ===========================================================================
// Scan
// ===========================================================================

#[derive(Clone)]
pub struct ScanOptions {
    pub include_metadata: bool,
    pub entry_types: Option<Vec<EntryType>>,
    pub max_depth: Option<usize>,
    pub max_entries: usize,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            include_metadata: true,
            entry_types: None,
            max_depth: None,
            max_entries: 100_000,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl ScanOptions {
    pub fn include_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    pub fn entry_types(mut self, types: Vec<EntryType>) -> Self {
        self.entry_types = Some(types);
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn max_entries(mut self, entries: usize) -> Self {
        self.max_entries = entries;
        self
    }

    pub fn include_patterns(mut self, patterns: Vec<String>) -> Self {
        self.include_patterns = patterns;
        self
    }

    pub fn exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }
}

// ===========================================================================
// Verify
// ===========================================================================

#[derive(Clone, Default)]
pub struct VerifyOptions {
    /// Extra include/exclude narrowing applied to the underlying scan.
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
    pub path: Option<String>,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
    pub entry_count: usize,
    pub checksums_verified: bool,
    pub checks_performed: Vec<String>,
}

// ===========================================================================
// ArchiveInfo
// ===========================================================================

#[derive(Debug, Clone)]
pub struct ArchiveInfo {
    pub format: crate::format::ArchiveFormat,
    pub compression: String,
    pub entry_count: usize,
    pub total_size: u64,
    pub compressed_size: u64,
    pub compression_ratio: f64,
    pub has_checksums: bool,
    pub checksum_algorithm: Option<String>,
    pub checksums: HashMap<String, String>,
    pub created: Option<DateTime<Utc>>,
}

impl ArchiveInfo {
    pub fn compute_ratio(total_size: u64, compressed_size: u64) -> f64 {
        if compressed_size > 0 {
            total_size as f64 / compressed_size as f64
        } else {
            0.0
        }
    }
}

// ===========================================================================
// Discovery Walker
// ===========================================================================

#[derive(Debug, Clone)]
pub struct PathResult {
    pub relative_path: String,
    pub source_path: PathBuf,
    pub logical_path: String,
    pub loader_type: &'static str,
    pub metadata: HashMap<String, String>,
    pub checksum: Option<String>,
    pub checksum_algorithm: Option<String>,
    pub checksum_error: Option<String>,
}

/// Non-fatal per-entry error routed through `FindQuery::error_handler`.
/// Returning `Some(err)` aborts the walk; `None` means "skip and continue".
pub type ErrorHandler = Arc<dyn Fn(&str, &Error) -> Option<Error> + Send + Sync>;
pub type ProgressCallback = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

use crate::error::Error;

#[derive(Clone)]
pub struct FindQuery {
    pub root: PathBuf,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// 0 = unlimited.
    pub max_depth: usize,
    pub follow_symlinks: bool,
    pub include_hidden: bool,
    pub calculate_checksums: bool,
    /// Empty = `xxh3-128` (the walker's default, distinct from Create's
    /// `sha256` default).
    pub checksum_algorithm: String,
    pub error_handler: Option<ErrorHandler>,
    pub progress_callback: Option<ProgressCallback>,
    pub ctx: Ctx,
}

impl Default for FindQuery {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            include: Vec::new(),
            exclude: Vec::new(),
            max_depth: 0,
            follow_symlinks: false,
            include_hidden: false,
            calculate_checksums: false,
            checksum_algorithm: String::new(),
            error_handler: None,
            progress_callback: None,
            ctx: Ctx::new(),
        }
    }
}

impl FindQuery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn include(mut self, patterns: Vec<String>) -> Self {
        self.include = patterns;
        self
    }

    pub fn exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    pub fn calculate_checksums(mut self, calculate: bool) -> Self {
        self.calculate_checksums = calculate;
        self
    }

    pub fn checksum_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.checksum_algorithm = algorithm.into();
        self
    }

    pub fn error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = Some(handler);
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn ctx(mut self, ctx: Ctx) -> Self {
        self.ctx = ctx;
        self
    }
}

// ===========================================================================
// Repository-Root Finder
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinderSeverity {
    Warning,
    Critical,
}

#[derive(Clone)]
pub struct FindRootQuery {
    pub start: PathBuf,
    pub markers: Vec<String>,
    pub stop_at_first: bool,
    pub max_depth: usize,
    pub boundary: Option<PathBuf>,
    pub follow_symlinks: bool,
}

impl FindRootQuery {
    pub fn new(start: impl Into<PathBuf>, markers: Vec<String>) -> Self {
        Self {
            start: start.into(),
            markers,
            stop_at_first: true,
            max_depth: 10,
            boundary: None,
            follow_symlinks: false,
        }
    }

    pub fn stop_at_first(mut self, stop: bool) -> Self {
        self.stop_at_first = stop;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn boundary(mut self, boundary: impl Into<PathBuf>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }
}
