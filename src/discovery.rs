//! The Discovery Walker (spec.md §4.3): a bounded, deduplicated,
//! safety-checked directory scan driving glob-based source selection.

use std::collections::HashMap;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use crate::checksum::ChecksumAlgorithm;
use crate::error::Error;
use crate::ignore::IgnoreMatcher;
use crate::options::{FindQuery, PathResult};
use crate::path_guard;

/// Run a Discovery Walker query to completion, returning every file entry
/// that survives the safety and pattern filters.
pub fn find_files(query: &FindQuery) -> Result<Vec<PathResult>, Error> {
    let abs_root = fs::canonicalize(&query.root)
        .map_err(|e| Error::io("find_files: resolve root", Some(query.root.display().to_string()), e))?;

    let checksum_algorithm = if query.calculate_checksums {
        match ChecksumAlgorithm::parse_strict(&query.checksum_algorithm) {
            Some(algo) => Some(algo),
            None => {
                return Err(Error::UnsupportedCompression {
                    detail: format!(
                        "unsupported checksum algorithm '{}'",
                        query.checksum_algorithm
                    ),
                })
            }
        }
    } else {
        None
    };

    let ignore_matcher = load_ignore_matcher(&abs_root, query)?;

    let include_patterns: Vec<String> = if query.include.is_empty() {
        vec!["**/*".to_string()]
    } else {
        query.include.clone()
    };

    let mut safe_patterns = Vec::new();
    for pattern in &include_patterns {
        match reject_escaping_literal_base(pattern, &abs_root) {
            Ok(()) => safe_patterns.push(pattern.clone()),
            Err(err) => {
                if let Some(handler) = &query.error_handler {
                    if let Some(aborted) = handler(pattern, &err) {
                        return Err(aborted);
                    }
                }
                tracing::debug!(pattern, "discovery: rejected escaping include pattern");
            }
        }
    }

    if safe_patterns.is_empty() {
        return Ok(Vec::new());
    }

    let candidates = collect_candidates(&abs_root, query)?;
    let total = candidates.len();

    let mut seen: HashSet<String> = HashSet::new();
    let mut results = Vec::new();

    for (index, candidate) in candidates.into_iter().enumerate() {
        if query.ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if let Some(callback) = &query.progress_callback {
            callback(index, total, &candidate.display().to_string());
        }

        match process_candidate(
            &candidate,
            &abs_root,
            query,
            &safe_patterns,
            &ignore_matcher,
            checksum_algorithm,
        ) {
            Ok(Some(result)) => {
                if seen.insert(result.source_path.display().to_string()) {
                    results.push(result);
                }
            }
            Ok(None) => {}
            Err(err) => {
                if let Some(handler) = &query.error_handler {
                    if let Some(aborted) = handler(&candidate.display().to_string(), &err) {
                        return Err(aborted);
                    }
                }
                tracing::debug!(path = %candidate.display(), error = %err, "discovery: skipped entry");
            }
        }
    }

    // Exclude-wins second pass.
    results.retain(|r| !matches_any(&query.exclude, &r.relative_path));

    Ok(results)
}

fn load_ignore_matcher(abs_root: &Path, query: &FindQuery) -> Result<IgnoreMatcher, Error> {
    match IgnoreMatcher::load(abs_root) {
        Ok(matcher) => Ok(matcher),
        Err(e) => {
            let err = Error::io(
                "find_files: load .fulmenignore",
                Some(abs_root.display().to_string()),
                e,
            );
            if let Some(handler) = &query.error_handler {
                if let Some(aborted) = handler(&abs_root.display().to_string(), &err) {
                    return Err(aborted);
                }
            }
            Ok(IgnoreMatcher::default())
        }
    }
}

/// Reject, before any I/O, a pattern whose literal base (the prefix before
/// the first glob metacharacter) would resolve outside the root.
fn reject_escaping_literal_base(pattern: &str, abs_root: &Path) -> Result<(), Error> {
    let meta_idx = pattern
        .find(['*', '?', '['])
        .unwrap_or(pattern.len());
    let literal = &pattern[..meta_idx];
    let base = match literal.rfind('/') {
        Some(i) => &literal[..i],
        None => "",
    };

    if base.is_empty() {
        return Ok(());
    }

    let candidate = lexical_join(abs_root, base);
    match path_guard::validate_within_root(&candidate, abs_root) {
        Ok(_) => Ok(()),
        Err(_) => Err(Error::PathEscape {
            entry: pattern.to_string(),
            detail: format!("literal base '{base}' resolves outside root"),
        }),
    }
}

/// Join `root` with a `/`-separated relative path, collapsing `..`
/// segments lexically (no filesystem access), mirroring `clean` but
/// anchored at an existing absolute path instead of starting empty.
fn lexical_join(root: &Path, rel: &str) -> PathBuf {
    let mut stack: Vec<std::ffi::OsString> =
        root.components().map(|c| c.as_os_str().to_os_string()).collect();

    for segment in rel.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                stack.pop();
            }
            seg => stack.push(std::ffi::OsString::from(seg)),
        }
    }

    stack.iter().collect()
}

fn collect_candidates(abs_root: &Path, query: &FindQuery) -> Result<Vec<PathBuf>, Error> {
    let mut candidates = Vec::new();
    let walker = WalkDir::new(abs_root).follow_links(query.follow_symlinks);

    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_dir() {
                    continue;
                }
                if entry.file_type().is_symlink() && !query.follow_symlinks {
                    continue;
                }
                candidates.push(entry.into_path());
            }
            Err(e) => {
                let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                let err = Error::io(
                    "find_files: walk directory",
                    Some(path.clone()),
                    std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                );
                if let Some(handler) = &query.error_handler {
                    if let Some(aborted) = handler(&path, &err) {
                        return Err(aborted);
                    }
                }
                tracing::debug!(path, "discovery: walk error, skipping");
            }
        }
    }

    Ok(candidates)
}

#[allow(clippy::too_many_arguments)]
fn process_candidate(
    candidate: &Path,
    abs_root: &Path,
    query: &FindQuery,
    include_patterns: &[String],
    ignore_matcher: &IgnoreMatcher,
    checksum_algorithm: Option<ChecksumAlgorithm>,
) -> Result<Option<PathResult>, Error> {
    let canonical = fs::canonicalize(candidate)
        .map_err(|e| Error::io("find_files: canonicalize entry", Some(candidate.display().to_string()), e))?;

    let rel = path_guard::validate_within_root(&canonical, abs_root)?;
    path_guard::validate_path(&rel)?;

    if query.max_depth > 0 && depth(&rel) > query.max_depth {
        return Ok(None);
    }

    if !query.include_hidden && path_guard::contains_hidden_segment(&rel) {
        return Ok(None);
    }

    if ignore_matcher.is_ignored(&rel) {
        return Ok(None);
    }

    if !matches_any(include_patterns, &rel) {
        return Ok(None);
    }

    let metadata = fs::symlink_metadata(&canonical)
        .map_err(|e| Error::io("find_files: stat entry", Some(rel.clone()), e))?;

    let mut meta = HashMap::new();
    meta.insert("size".to_string(), metadata.len().to_string());
    let mtime = metadata
        .modified()
        .ok()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(Utc::now);
    meta.insert(
        "mtime".to_string(),
        mtime.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
    );

    let (checksum, checksum_algo_label, checksum_error) = match checksum_algorithm {
        None => (None, None, None),
        Some(algo) => match algo.digest_file(&canonical) {
            Ok(digest) => (Some(digest), Some(algo.label().to_string()), None),
            Err(e) => (None, None, Some(e.to_string())),
        },
    };

    Ok(Some(PathResult {
        relative_path: rel.clone(),
        source_path: canonical,
        logical_path: rel,
        loader_type: "local",
        metadata: meta,
        checksum,
        checksum_algorithm: checksum_algo_label,
        checksum_error,
    }))
}

fn depth(rel: &str) -> usize {
    rel.split('/').filter(|s| !s.is_empty()).count()
}

fn matches_any(patterns: &[String], rel_path: &str) -> bool {
    if patterns.is_empty() {
        return false;
    }
    patterns.iter().any(|p| glob_match::glob_match(p, rel_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;

    fn touch(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            stdfs::create_dir_all(parent).unwrap();
        }
        stdfs::write(path, contents).unwrap();
    }

    #[test]
    fn finds_files_matching_include_pattern() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a/b.txt"), "hi");
        touch(&dir.path().join("a/c.rs"), "fn main() {}");

        let query = FindQuery::new(dir.path()).include(vec!["**/*.rs".to_string()]);
        let results = find_files(&query).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].relative_path, "a/c.rs");
    }

    #[test]
    fn excludes_hidden_by_default() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("visible/x.txt"), "a");
        touch(&dir.path().join(".secrets/y.txt"), "b");
        touch(&dir.path().join("visible/.hidden.txt"), "c");

        let query = FindQuery::new(dir.path()).include(vec!["**/*".to_string()]);
        let results = find_files(&query).unwrap();
        let rels: Vec<_> = results.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(rels, vec!["visible/x.txt"]);
    }

    #[test]
    fn include_hidden_flag_surfaces_dotfiles() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join(".secrets/y.txt"), "b");

        let query = FindQuery::new(dir.path())
            .include(vec!["**/*".to_string()])
            .include_hidden(true);
        let results = find_files(&query).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn exclude_patterns_win_over_include() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("src/a.txt"), "a");
        touch(&dir.path().join("src/b.txt"), "b");

        let query = FindQuery::new(dir.path())
            .include(vec!["**/*".to_string()])
            .exclude(vec!["**/b.txt".to_string()]);
        let results = find_files(&query).unwrap();
        let rels: Vec<_> = results.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(rels, vec!["src/a.txt"]);
    }

    #[test]
    fn respects_fulmenignore() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join(".fulmenignore"), "*.log\n");
        touch(&dir.path().join("keep.txt"), "a");
        touch(&dir.path().join("debug.log"), "b");

        let query = FindQuery::new(dir.path()).include(vec!["**/*".to_string()]);
        let results = find_files(&query).unwrap();
        let rels: Vec<_> = results.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(rels, vec!["keep.txt"]);
    }

    #[test]
    fn max_depth_limits_results() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.txt"), "1");
        touch(&dir.path().join("nested/b.txt"), "2");
        touch(&dir.path().join("nested/deeper/c.txt"), "3");

        let query = FindQuery::new(dir.path())
            .include(vec!["**/*".to_string()])
            .max_depth(1);
        let results = find_files(&query).unwrap();
        let rels: Vec<_> = results.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(rels, vec!["a.txt"]);
    }

    #[test]
    fn rejects_escaping_include_pattern_without_io() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.txt"), "1");

        let query = FindQuery::new(dir.path()).include(vec!["../**/*.go".to_string()]);
        let results = find_files(&query).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn checksum_calculation_populates_digest() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.txt"), "hello");

        let query = FindQuery::new(dir.path())
            .include(vec!["**/*".to_string()])
            .calculate_checksums(true);
        let results = find_files(&query).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].checksum.is_some());
        assert_eq!(results[0].checksum_algorithm.as_deref(), Some("xxh3-128"));
    }

    #[test]
    fn unsupported_checksum_algorithm_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.txt"), "hello");

        let query = FindQuery::new(dir.path())
            .include(vec!["**/*".to_string()])
            .calculate_checksums(true)
            .checksum_algorithm("md5");
        assert!(find_files(&query).is_err());
    }

    #[test]
    fn deduplicates_results() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.txt"), "1");

        let query = FindQuery::new(dir.path())
            .include(vec!["**/*.txt".to_string(), "a.*".to_string()]);
        let results = find_files(&query).unwrap();
        assert_eq!(results.len(), 1);
    }
}
