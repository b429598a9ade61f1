//! Archive Façade (spec.md §4.6): the public `create` / `extract` / `scan`
//! / `verify` / `info` operations. None of them hold state across calls —
//! each is a pure function of its inputs plus the filesystem.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use walkdir::WalkDir;

use crate::checksum::ChecksumAlgorithm;
use crate::codec::{self, EntryBody, WriteSource};
use crate::entry::{ArchiveEntry, EntryType};
use crate::error::Error;
use crate::format::ArchiveFormat;
use crate::options::{
    ArchiveInfo, CreateOptions, ExtractOptions, ExtractResult, ExtractionError, OverwritePolicy,
    ScanOptions, ValidationError, ValidationResult, VerifyOptions,
};
use crate::path_guard;
use crate::telemetry::{self, OperationMetrics};

const DECOMPRESSION_BOMB_RATIO: f64 = 100.0;

// ===========================================================================
// Create
// ===========================================================================

pub fn create(
    sources: &[PathBuf],
    output: &Path,
    format: ArchiveFormat,
    options: &CreateOptions,
) -> Result<ArchiveInfo, Error> {
    let started = Instant::now();
    let span = tracing::info_span!("fulpack::create", format = ?format);
    let _guard = span.enter();

    let result = create_inner(sources, output, format, options);

    emit(
        "create",
        format,
        started,
        result.as_ref().ok().map(|info| info.total_size).unwrap_or(0),
        result.as_ref().ok().map(|info| info.entry_count as u64).unwrap_or(0),
        result.as_ref().err(),
    );

    result
}

fn create_inner(
    sources: &[PathBuf],
    output: &Path,
    format: ArchiveFormat,
    options: &CreateOptions,
) -> Result<ArchiveInfo, Error> {
    if sources.is_empty() {
        return Err(Error::InvalidFormat {
            detail: "at least one source is required".to_string(),
        });
    }
    if output.as_os_str().is_empty() {
        return Err(Error::InvalidFormat {
            detail: "output path is empty".to_string(),
        });
    }

    let write_sources = collect_write_sources(sources, options)?;

    if format == ArchiveFormat::Gzip && write_sources.len() != 1 {
        return Err(Error::InvalidFormat {
            detail: "gzip format accepts exactly one file source".to_string(),
        });
    }

    let outcome = codec::write_archive(format, output, &write_sources, options)?;

    let compressed_size = fs::metadata(output)
        .map_err(|e| Error::io("create: stat output", Some(output.display().to_string()), e))?
        .len();

    let requested_algo = ChecksumAlgorithm::resolve(&options.checksum_algorithm);
    let digest = requested_algo
        .digest_file(output)
        .map_err(|e| Error::io("create: checksum output", Some(output.display().to_string()), e))?;

    let mut checksums = HashMap::new();
    checksums.insert(requested_algo.label().to_string(), digest);

    Ok(ArchiveInfo {
        format,
        compression: format.compression_label().to_string(),
        entry_count: outcome.entry_count,
        total_size: outcome.total_size,
        compressed_size,
        compression_ratio: ArchiveInfo::compute_ratio(outcome.total_size, compressed_size),
        has_checksums: true,
        checksum_algorithm: Some(requested_algo.label().to_string()),
        checksums,
        created: Some(Utc::now()),
    })
}

/// Expand `sources` into the writer's flat entry list: directories are
/// walked (synthesizing the directories they contain as their own
/// entries so the writer can emit them), files are matched against the
/// patterns directly, and everything is deduplicated by archive path.
fn collect_write_sources(
    sources: &[PathBuf],
    options: &CreateOptions,
) -> Result<Vec<WriteSource>, Error> {
    let include = if options.include_patterns.is_empty() {
        vec!["**/*".to_string()]
    } else {
        options.include_patterns.clone()
    };

    let mut seen_paths: HashSet<String> = HashSet::new();
    let mut dirs: HashSet<String> = HashSet::new();
    let mut files = Vec::new();

    for source in sources {
        if source.is_dir() {
            let base = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "source".to_string());
            let abs_root = fs::canonicalize(source).map_err(|e| {
                Error::io("create: resolve source", Some(source.display().to_string()), e)
            })?;

            for entry in WalkDir::new(&abs_root).follow_links(options.follow_symlinks) {
                let entry = entry.map_err(|e| Error::CorruptArchive {
                    operation: "create: walk source directory".to_string(),
                    detail: e.to_string(),
                })?;
                if entry.path() == abs_root {
                    continue;
                }

                let rel = path_guard::validate_within_root(entry.path(), &abs_root)?;
                let archive_path = format!("{base}/{rel}");

                if entry.file_type().is_dir() {
                    if dir_excluded(&options.exclude_patterns, &rel) {
                        continue;
                    }
                    register_dir_chain(&archive_path, &mut dirs);
                    continue;
                }

                if !matches_any(&include, &rel) || matches_any(&options.exclude_patterns, &rel) {
                    continue;
                }

                register_dir_chain(&parent_of(&archive_path), &mut dirs);

                let entry_type = if entry.file_type().is_symlink() {
                    EntryType::Symlink
                } else {
                    EntryType::File
                };

                if seen_paths.insert(archive_path.clone()) {
                    files.push(WriteSource {
                        archive_path,
                        entry_type,
                        source_path: entry.path().to_path_buf(),
                        mode: unix_mode(entry.path()),
                    });
                }
            }
        } else {
            let name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_string());

            if !options.include_patterns.is_empty() && !matches_any(&include, &name) {
                continue;
            }
            if matches_any(&options.exclude_patterns, &name) {
                continue;
            }

            if seen_paths.insert(name.clone()) {
                let metadata = fs::symlink_metadata(source).map_err(|e| {
                    Error::io("create: stat source", Some(source.display().to_string()), e)
                })?;
                let entry_type = if metadata.file_type().is_symlink() {
                    EntryType::Symlink
                } else {
                    EntryType::File
                };
                files.push(WriteSource {
                    archive_path: name,
                    entry_type,
                    source_path: source.clone(),
                    mode: unix_mode(source),
                });
            }
        }
    }

    let mut dir_sources: Vec<String> = dirs.into_iter().collect();
    dir_sources.sort();
    let mut result: Vec<WriteSource> = dir_sources
        .into_iter()
        .map(|archive_path| WriteSource {
            archive_path,
            entry_type: EntryType::Directory,
            source_path: PathBuf::new(),
            mode: None,
        })
        .collect();
    result.extend(files);
    Ok(result)
}

fn register_dir_chain(archive_path: &str, dirs: &mut HashSet<String>) {
    let mut cur = archive_path.to_string();
    while !cur.is_empty() {
        dirs.insert(cur.clone());
        match cur.rfind('/') {
            Some(i) => cur.truncate(i),
            None => break,
        }
    }
}

fn parent_of(archive_path: &str) -> String {
    match archive_path.rfind('/') {
        Some(i) => archive_path[..i].to_string(),
        None => String::new(),
    }
}

#[cfg(unix)]
fn unix_mode(path: &Path) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    fs::symlink_metadata(path).ok().map(|m| m.permissions().mode())
}

#[cfg(not(unix))]
fn unix_mode(_path: &Path) -> Option<u32> {
    None
}

fn matches_any(patterns: &[String], rel_path: &str) -> bool {
    if patterns.is_empty() {
        return false;
    }
    patterns.iter().any(|p| glob_match::glob_match(p, rel_path))
}

/// Like `matches_any`, but also treats a `dir/**`-style pattern as covering
/// the directory itself, not just its contents. Without this, excluding
/// `.git/**` would still leave an empty `.git` entry in the archive.
fn dir_excluded(patterns: &[String], rel_path: &str) -> bool {
    if matches_any(patterns, rel_path) {
        return true;
    }
    patterns
        .iter()
        .any(|p| p.strip_suffix("/**").is_some_and(|prefix| prefix == rel_path))
}

// ===========================================================================
// Extract
// ===========================================================================

pub fn extract(archive: &Path, destination: &Path, options: &ExtractOptions) -> Result<ExtractResult, Error> {
    let format = ArchiveFormat::detect(archive)?;
    let started = Instant::now();
    let span = tracing::info_span!("fulpack::extract", format = ?format);
    let _guard = span.enter();

    let result = extract_inner(archive, destination, format, options);

    emit(
        "extract",
        format,
        started,
        result.as_ref().ok().map(|r| r.bytes_written).unwrap_or(0),
        result.as_ref().ok().map(|r| r.extracted_count as u64).unwrap_or(0),
        result.as_ref().err(),
    );

    result
}

fn extract_inner(
    archive: &Path,
    destination: &Path,
    format: ArchiveFormat,
    options: &ExtractOptions,
) -> Result<ExtractResult, Error> {
    fs::create_dir_all(destination).map_err(|e| {
        Error::io(
            "extract: create destination",
            Some(destination.display().to_string()),
            e,
        )
    })?;
    let abs_dest = fs::canonicalize(destination).map_err(|e| {
        Error::io(
            "extract: resolve destination",
            Some(destination.display().to_string()),
            e,
        )
    })?;

    if format == ArchiveFormat::Gzip {
        return extract_gzip(archive, &abs_dest, options);
    }

    let compressed_size = fs::metadata(archive)
        .map_err(|e| Error::io("extract: stat archive", Some(archive.display().to_string()), e))?
        .len();

    let mut result = ExtractResult::default();
    let mut entry_count: usize = 0;
    let mut total_uncompressed: u64 = 0;
    let mut bomb_err: Option<Error> = None;

    codec::for_each_entry(format, archive, &mut |entry, body| {
        entry_count += 1;
        total_uncompressed += entry.size;

        if entry_count > options.max_entries {
            bomb_err = Some(Error::FileCountExceeded {
                limit: options.max_entries,
                attempted: entry_count,
            });
            return Ok(false);
        }
        if total_uncompressed > options.max_size {
            bomb_err = Some(Error::TotalSizeExceeded {
                limit: options.max_size,
                would_be: total_uncompressed,
            });
            return Ok(false);
        }
        if compressed_size > 0 {
            let ratio = total_uncompressed as f64 / compressed_size as f64;
            if ratio > DECOMPRESSION_BOMB_RATIO {
                bomb_err = Some(Error::DecompressionBomb {
                    detail: format!("compression ratio {ratio:.1} exceeds {DECOMPRESSION_BOMB_RATIO}"),
                });
                return Ok(false);
            }
        }

        extract_one_entry(entry, body, &abs_dest, options, &mut result)?;
        Ok(true)
    })?;

    if let Some(err) = bomb_err {
        return Err(err);
    }

    Ok(result)
}

fn extract_one_entry(
    entry: &ArchiveEntry,
    body: EntryBody<'_>,
    abs_dest: &Path,
    options: &ExtractOptions,
    result: &mut ExtractResult,
) -> Result<(), Error> {
    let record_error = |result: &mut ExtractResult, code: &'static str, message: String| {
        result.error_count += 1;
        result.errors.push(ExtractionError {
            path: entry.path.clone(),
            message,
            code,
        });
    };

    if let Err(e) = path_guard::validate_path(&entry.path) {
        record_error(result, e.kind().code(), e.to_string());
        return Ok(());
    }

    if !matches_include_exclude(&entry.path, &options.include_patterns, &options.exclude_patterns) {
        result.skipped_count += 1;
        return Ok(());
    }

    let target = lexical_join(abs_dest, &entry.path);
    let target_rel = match path_guard::validate_within_root(&target, abs_dest) {
        Ok(rel) => rel,
        Err(e) => {
            record_error(result, e.kind().code(), e.to_string());
            return Ok(());
        }
    };
    let _ = target_rel;

    match entry.entry_type {
        EntryType::Directory => {
            let mode = if options.preserve_permissions {
                entry.mode.unwrap_or(0o755)
            } else {
                0o755
            };
            if let Err(e) = fs::create_dir_all(&target) {
                record_error(result, "io-error", e.to_string());
                return Ok(());
            }
            set_unix_mode(&target, mode);
        }
        EntryType::Symlink => {
            let link_target = entry.link_target.clone().unwrap_or_default();
            let cleaned = path_guard::clean(&format!(
                "{}/{}",
                parent_of(&entry.path),
                link_target
            ));
            if has_traversal(&cleaned) {
                record_error(
                    result,
                    "symlink-escape",
                    format!("symlink '{}' -> '{}' escapes destination", entry.path, link_target),
                );
                return Ok(());
            }

            if let Some(parent) = target.parent() {
                let _ = fs::create_dir_all(parent);
            }
            if options.overwrite == OverwritePolicy::Overwrite {
                let _ = fs::remove_file(&target);
            }
            #[cfg(unix)]
            {
                if let Err(e) = std::os::unix::fs::symlink(&link_target, &target) {
                    if e.kind() == std::io::ErrorKind::AlreadyExists
                        && options.overwrite == OverwritePolicy::Skip
                    {
                        result.skipped_count += 1;
                    } else {
                        record_error(result, "io-error", e.to_string());
                    }
                }
            }
        }
        EntryType::File => {
            if let Some(parent) = target.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    record_error(result, "io-error", e.to_string());
                    return Ok(());
                }
            }

            let mut file = match open_for_write(&target, options.overwrite) {
                Ok(Some(f)) => f,
                Ok(None) => {
                    result.skipped_count += 1;
                    return Ok(());
                }
                Err(e) => {
                    record_error(result, e.kind().code(), e.to_string());
                    return Ok(());
                }
            };

            let written = copy_body(body, &mut file)?;

            if entry.size > 0 && written != entry.size {
                record_error(
                    result,
                    "decompression-bomb",
                    format!(
                        "entry '{}' wrote {} bytes but declared {}",
                        entry.path, written, entry.size
                    ),
                );
                return Ok(());
            }

            if options.preserve_permissions {
                if let Some(mode) = entry.mode {
                    set_unix_mode(&target, mode & 0o7777);
                }
            }

            result.extracted_count += 1;
            result.bytes_written += written;
        }
    }

    Ok(())
}

fn copy_body(body: EntryBody<'_>, out: &mut File) -> Result<u64, Error> {
    match body {
        EntryBody::Reader(r) => copy_stream(r, out),
        EntryBody::None => Ok(0),
    }
}

fn copy_stream(reader: &mut dyn Read, out: &mut File) -> Result<u64, Error> {
    let mut buf = [0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| Error::CorruptArchive {
                operation: "extract: read entry body".to_string(),
                detail: e.to_string(),
            })?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])
            .map_err(|e| Error::io("extract: write entry body", None, e))?;
        total += n as u64;
    }
    Ok(total)
}

fn open_for_write(target: &Path, policy: OverwritePolicy) -> Result<Option<File>, Error> {
    match policy {
        OverwritePolicy::Error => match OpenOptions::new().write(true).create_new(true).open(target) {
            Ok(f) => Ok(Some(f)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(Error::AlreadyExists {
                path: target.display().to_string(),
            }),
            Err(e) => Err(Error::io("extract: create file", Some(target.display().to_string()), e)),
        },
        OverwritePolicy::Skip => match OpenOptions::new().write(true).create_new(true).open(target) {
            Ok(f) => Ok(Some(f)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(Error::io("extract: create file", Some(target.display().to_string()), e)),
        },
        OverwritePolicy::Overwrite => {
            if let Ok(meta) = fs::symlink_metadata(target) {
                if meta.file_type().is_symlink() {
                    let _ = fs::remove_file(target);
                }
            }
            File::create(target)
                .map(Some)
                .map_err(|e| Error::io("extract: create file", Some(target.display().to_string()), e))
        }
    }
}

#[cfg(unix)]
fn set_unix_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    let _ = fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777));
}

#[cfg(not(unix))]
fn set_unix_mode(_path: &Path, _mode: u32) {}

fn lexical_join(root: &Path, rel: &str) -> PathBuf {
    let mut p = root.to_path_buf();
    for segment in rel.split('/') {
        if !segment.is_empty() && segment != "." {
            p.push(segment);
        }
    }
    p
}

fn has_traversal(cleaned: &str) -> bool {
    cleaned.split('/').any(|s| s == "..") || cleaned.starts_with("..")
}

fn matches_include_exclude(rel_path: &str, include: &[String], exclude: &[String]) -> bool {
    if !include.is_empty() && !matches_any(include, rel_path) {
        return false;
    }
    if matches_any(exclude, rel_path) {
        return false;
    }
    true
}

fn extract_gzip(archive: &Path, abs_dest: &Path, options: &ExtractOptions) -> Result<ExtractResult, Error> {
    let name = gzip_logical_name(archive)?;
    let target = abs_dest.join(&name);
    path_guard::validate_within_root(&target, abs_dest)?;

    let written = codec::gzip::extract_enforcing_cap(archive, &target, options.max_size)?;

    Ok(ExtractResult {
        extracted_count: 1,
        skipped_count: 0,
        error_count: 0,
        bytes_written: written,
        errors: Vec::new(),
    })
}

fn gzip_logical_name(archive: &Path) -> Result<String, Error> {
    let mut name = None;
    codec::gzip::for_each_entry(archive, &mut |entry, _| {
        name = Some(entry.path.clone());
        Ok(true)
    })?;
    name.ok_or_else(|| Error::CorruptArchive {
        operation: "gzip: determine logical name".to_string(),
        detail: "stream produced no entry".to_string(),
    })
}

// ===========================================================================
// Scan
// ===========================================================================

pub fn scan(archive: &Path, options: &ScanOptions) -> Result<Vec<ArchiveEntry>, Error> {
    let format = ArchiveFormat::detect(archive)?;
    let started = Instant::now();
    let span = tracing::info_span!("fulpack::scan", format = ?format);
    let _guard = span.enter();

    let result = scan_inner(archive, format, options);

    emit(
        "scan",
        format,
        started,
        0,
        result.as_ref().ok().map(|r| r.len() as u64).unwrap_or(0),
        result.as_ref().err(),
    );

    result
}

fn scan_inner(
    archive: &Path,
    format: ArchiveFormat,
    options: &ScanOptions,
) -> Result<Vec<ArchiveEntry>, Error> {
    let mut entries = Vec::new();
    let mut cap_err = None;

    codec::for_each_entry(format, archive, &mut |entry, _body| {
        if let Some(types) = &options.entry_types {
            if !types.contains(&entry.entry_type) {
                return Ok(true);
            }
        }
        if let Some(max_depth) = options.max_depth {
            if entry.depth() > max_depth {
                return Ok(true);
            }
        }
        if !matches_include_exclude(&entry.path, &options.include_patterns, &options.exclude_patterns) {
            return Ok(true);
        }

        entries.push(entry.clone());
        if entries.len() > options.max_entries {
            cap_err = Some(Error::FileCountExceeded {
                limit: options.max_entries,
                attempted: entries.len(),
            });
            return Ok(false);
        }
        Ok(true)
    })?;

    if let Some(err) = cap_err {
        return Err(err);
    }

    Ok(entries)
}

// ===========================================================================
// Verify
// ===========================================================================

pub fn verify(archive: &Path, options: &VerifyOptions) -> ValidationResult {
    let format = match ArchiveFormat::detect(archive) {
        Ok(f) => f,
        Err(e) => {
            return ValidationResult {
                valid: false,
                errors: vec![ValidationError {
                    code: "corrupt-archive",
                    message: e.to_string(),
                    path: None,
                    details: None,
                }],
                warnings: Vec::new(),
                entry_count: 0,
                checksums_verified: false,
                checks_performed: vec!["structure_valid".to_string()],
            }
        }
    };

    let started = Instant::now();
    let span = tracing::info_span!("fulpack::verify", format = ?format);
    let _guard = span.enter();

    let result = verify_inner(archive, format, options);

    emit("verify", format, started, 0, result.entry_count as u64, None);

    result
}

fn verify_inner(archive: &Path, format: ArchiveFormat, options: &VerifyOptions) -> ValidationResult {
    let scan_options = ScanOptions::default()
        .include_patterns(options.include_patterns.clone())
        .exclude_patterns(options.exclude_patterns.clone());

    let entries = match scan_inner(archive, format, &scan_options) {
        Ok(entries) => entries,
        Err(e) => {
            return ValidationResult {
                valid: false,
                errors: vec![ValidationError {
                    code: "corrupt-archive",
                    message: e.to_string(),
                    path: None,
                    details: None,
                }],
                warnings: Vec::new(),
                entry_count: 0,
                checksums_verified: false,
                checks_performed: vec!["structure_valid".to_string()],
            }
        }
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for entry in &entries {
        if let Err(e) = path_guard::validate_path(&entry.path) {
            errors.push(ValidationError {
                code: e.kind().code(),
                message: e.to_string(),
                path: Some(entry.path.clone()),
                details: None,
            });
        }
        if let Some(target) = &entry.link_target {
            let cleaned = path_guard::clean(&format!("{}/{}", parent_of(&entry.path), target));
            if has_traversal(&cleaned) {
                errors.push(ValidationError {
                    code: "symlink-escape",
                    message: format!("symlink '{}' -> '{}' escapes via traversal", entry.path, target),
                    path: Some(entry.path.clone()),
                    details: None,
                });
            }
        }
    }

    let total_size: u64 = entries.iter().map(|e| e.size).sum();
    let info_result = info_from_entries(format, archive, &entries, total_size);
    let mut checksums_present = false;

    if let Ok(info) = &info_result {
        if info.compression_ratio > DECOMPRESSION_BOMB_RATIO || entries.len() > 100_000 {
            errors.push(ValidationError {
                code: "decompression-bomb",
                message: format!(
                    "aggregate compression ratio {:.1} exceeds {DECOMPRESSION_BOMB_RATIO}",
                    info.compression_ratio
                ),
                path: None,
                details: None,
            });
        }
        if info.has_checksums {
            checksums_present = true;
            warnings.push(
                "archive declares checksums; full verification requires extraction with verify_checksums=true"
                    .to_string(),
            );
        }
    }

    let mut checks_performed = vec![
        "structure_valid".to_string(),
        "no_path_traversal".to_string(),
        "no_decompression_bomb".to_string(),
        "symlinks_safe".to_string(),
    ];
    if checksums_present {
        checks_performed.push("checksums_present".to_string());
    }

    ValidationResult {
        valid: errors.is_empty(),
        errors,
        warnings,
        entry_count: entries.len(),
        checksums_verified: false,
        checks_performed,
    }
}

// ===========================================================================
// Info
// ===========================================================================

pub fn info(archive: &Path) -> Result<ArchiveInfo, Error> {
    let format = ArchiveFormat::detect(archive)?;
    let started = Instant::now();
    let span = tracing::info_span!("fulpack::info", format = ?format);
    let _guard = span.enter();

    let result = info_inner(archive, format);

    emit(
        "info",
        format,
        started,
        result.as_ref().ok().map(|i| i.total_size).unwrap_or(0),
        result.as_ref().ok().map(|i| i.entry_count as u64).unwrap_or(0),
        result.as_ref().err(),
    );

    result
}

fn info_inner(archive: &Path, format: ArchiveFormat) -> Result<ArchiveInfo, Error> {
    if format == ArchiveFormat::Gzip {
        let total_size = codec::gzip::uncompressed_size(archive)?;
        let compressed_size = fs::metadata(archive)
            .map_err(|e| Error::io("info: stat archive", Some(archive.display().to_string()), e))?
            .len();
        return Ok(ArchiveInfo {
            format,
            compression: format.compression_label().to_string(),
            entry_count: 1,
            total_size,
            compressed_size,
            compression_ratio: ArchiveInfo::compute_ratio(total_size, compressed_size),
            has_checksums: false,
            checksum_algorithm: None,
            checksums: HashMap::new(),
            created: None,
        });
    }

    let entries = scan_inner(archive, format, &ScanOptions::default())?;
    let total_size: u64 = entries.iter().map(|e| e.size).sum();
    info_from_entries(format, archive, &entries, total_size)
}

fn info_from_entries(
    format: ArchiveFormat,
    archive: &Path,
    entries: &[ArchiveEntry],
    total_size: u64,
) -> Result<ArchiveInfo, Error> {
    let compressed_size = fs::metadata(archive)
        .map_err(|e| Error::io("info: stat archive", Some(archive.display().to_string()), e))?
        .len();

    Ok(ArchiveInfo {
        format,
        compression: format.compression_label().to_string(),
        entry_count: entries.len(),
        total_size,
        compressed_size,
        compression_ratio: ArchiveInfo::compute_ratio(total_size, compressed_size),
        has_checksums: false,
        checksum_algorithm: None,
        checksums: HashMap::new(),
        created: None,
    })
}

// ===========================================================================
// Telemetry helper
// ===========================================================================

fn emit(
    operation: &'static str,
    format: ArchiveFormat,
    started: Instant,
    bytes: u64,
    entries: u64,
    error: Option<&Error>,
) {
    let format_label: &'static str = match format {
        ArchiveFormat::Tar => "tar",
        ArchiveFormat::TarGz => "tar.gz",
        ArchiveFormat::Zip => "zip",
        ArchiveFormat::Gzip => "gzip",
    };
    let status = if error.is_some() { "error" } else { "ok" };
    let error_code = error.map(|e| e.kind().code());

    if let Some(e) = error {
        tracing::warn!(operation, format = format_label, error = %e, "operation failed");
    } else {
        tracing::info!(operation, format = format_label, bytes, entries, "operation completed");
    }

    telemetry::record(OperationMetrics {
        operation,
        format: format_label,
        status,
        duration: started.elapsed(),
        bytes,
        entries,
        error_code,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn create_and_extract_round_trip_tar() {
        let src_dir = tempfile::tempdir().unwrap();
        fs::write(src_dir.path().join("a.txt"), b"alpha").unwrap();
        fs::create_dir_all(src_dir.path().join("nested")).unwrap();
        fs::write(src_dir.path().join("nested/b.txt"), b"beta").unwrap();

        let out_dir = tempfile::tempdir().unwrap();
        let archive_path = out_dir.path().join("bundle.tar");

        let info = create(
            &[src_dir.path().to_path_buf()],
            &archive_path,
            ArchiveFormat::Tar,
            &CreateOptions::default(),
        )
        .unwrap();
        assert_eq!(info.format, ArchiveFormat::Tar);
        assert!(info.entry_count >= 2);

        let dest_dir = tempfile::tempdir().unwrap();
        let result = extract(&archive_path, dest_dir.path(), &ExtractOptions::default()).unwrap();
        assert_eq!(result.error_count, 0);

        let base = src_dir.path().file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(
            fs::read_to_string(dest_dir.path().join(&base).join("a.txt")).unwrap(),
            "alpha"
        );
        assert_eq!(
            fs::read_to_string(dest_dir.path().join(&base).join("nested/b.txt")).unwrap(),
            "beta"
        );
    }

    #[test]
    fn create_requires_non_empty_sources() {
        let out = tempfile::tempdir().unwrap();
        let archive_path = out.path().join("empty.tar");
        let err = create(&[], &archive_path, ArchiveFormat::Tar, &CreateOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { .. }));
    }

    #[test]
    fn extract_refuses_to_overwrite_by_default() {
        let src_dir = tempfile::tempdir().unwrap();
        fs::write(src_dir.path().join("a.txt"), b"one").unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let archive_path = out_dir.path().join("bundle.tar");
        create(
            &[src_dir.path().join("a.txt")],
            &archive_path,
            ArchiveFormat::Tar,
            &CreateOptions::default(),
        )
        .unwrap();

        let dest_dir = tempfile::tempdir().unwrap();
        fs::write(dest_dir.path().join("a.txt"), b"existing").unwrap();

        let result = extract(&archive_path, dest_dir.path(), &ExtractOptions::default()).unwrap();
        assert_eq!(result.error_count, 1);
        assert_eq!(result.errors[0].code, "file-exists");
    }

    #[test]
    fn verify_reports_valid_archive() {
        let src_dir = tempfile::tempdir().unwrap();
        fs::write(src_dir.path().join("a.txt"), b"alpha").unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let archive_path = out_dir.path().join("bundle.zip");
        create(
            &[src_dir.path().join("a.txt")],
            &archive_path,
            ArchiveFormat::Zip,
            &CreateOptions::default(),
        )
        .unwrap();

        let result = verify(&archive_path, &VerifyOptions::default());
        assert!(result.valid);
        assert!(result.checks_performed.contains(&"structure_valid".to_string()));
    }

    #[test]
    fn info_reports_archive_metadata() {
        let src_dir = tempfile::tempdir().unwrap();
        fs::write(src_dir.path().join("a.txt"), b"alpha").unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let archive_path = out_dir.path().join("bundle.zip");
        create(
            &[src_dir.path().join("a.txt")],
            &archive_path,
            ArchiveFormat::Zip,
            &CreateOptions::default(),
        )
        .unwrap();

        let info = info(&archive_path).unwrap();
        assert_eq!(info.format, ArchiveFormat::Zip);
        assert_eq!(info.entry_count, 1);
    }
}
