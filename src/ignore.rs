//! Loads and applies `.fulmenignore`-style pattern files, gitignore-like
//! semantics, rooted at the Discovery Walker's root.

use std::fs;
use std::path::Path;

/// A loaded set of ignore patterns.
#[derive(Debug, Clone, Default)]
pub struct IgnoreMatcher {
    patterns: Vec<Pattern>,
}

#[derive(Debug, Clone)]
struct Pattern {
    raw: String,
    /// Trailing `/` marks a directory pattern.
    dir_only: bool,
    /// No `/` in the pattern (besides a trailing one) means it matches any basename.
    basename_only: bool,
}

const IGNORE_FILE_NAME: &str = ".fulmenignore";

impl IgnoreMatcher {
    /// Load `.fulmenignore` from `root`. A missing file yields an empty
    /// matcher (non-fatal); an unreadable-but-present file is a real I/O
    /// error the caller may route through its own error handler.
    pub fn load(root: &Path) -> std::io::Result<Self> {
        let path = root.join(IGNORE_FILE_NAME);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Self::from_str(&contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Parse pattern lines directly (used by tests and callers that already
    /// have the file contents).
    pub fn from_str(contents: &str) -> Self {
        let patterns = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(Pattern::new)
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Does `rel_path` (forward-slash, relative to the walker's root) match
    /// any loaded pattern?
    pub fn is_ignored(&self, rel_path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(rel_path))
    }
}

impl Pattern {
    fn new(line: &str) -> Self {
        let dir_only = line.ends_with('/');
        let trimmed = line.trim_end_matches('/');
        let basename_only = !trimmed.contains('/');
        Self {
            raw: trimmed.to_string(),
            dir_only,
            basename_only,
        }
    }

    fn matches(&self, rel_path: &str) -> bool {
        let rel_path = rel_path.trim_end_matches('/');

        // Directory pattern: matches the directory itself and anything under it.
        if self.dir_only {
            if glob_match::glob_match(&self.raw, rel_path) {
                return true;
            }
            if let Some(prefix) = rel_path.strip_prefix(&format!("{}/", self.raw)) {
                let _ = prefix;
                return true;
            }
            if self.basename_only {
                return rel_path
                    .split('/')
                    .any(|segment| glob_match::glob_match(&self.raw, segment));
            }
            return false;
        }

        // A directory-prefix pattern without a trailing slash also matches
        // anything under `pattern/`.
        if rel_path.starts_with(&format!("{}/", self.raw)) {
            return true;
        }

        if self.basename_only {
            // gitignore semantics: a pattern without `/` matches the basename
            // of any path, at any depth.
            let basename = rel_path.rsplit('/').next().unwrap_or(rel_path);
            if glob_match::glob_match(&self.raw, basename) {
                return true;
            }
            return rel_path
                .split('/')
                .any(|segment| glob_match::glob_match(&self.raw, segment));
        }

        glob_match::glob_match(&self.raw, rel_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_empty_matcher() {
        let dir = tempfile::tempdir().unwrap();
        let matcher = IgnoreMatcher::load(dir.path()).unwrap();
        assert!(matcher.is_empty());
        assert!(!matcher.is_ignored("anything.txt"));
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        let matcher = IgnoreMatcher::from_str("\n# comment\n\n*.log\n");
        assert!(matcher.is_ignored("debug.log"));
        assert!(matcher.is_ignored("src/debug.log"));
        assert!(!matcher.is_ignored("debug.txt"));
    }

    #[test]
    fn trailing_slash_matches_directory_and_subtree() {
        let matcher = IgnoreMatcher::from_str(".git/\n");
        assert!(matcher.is_ignored(".git"));
        assert!(matcher.is_ignored(".git/HEAD"));
        assert!(matcher.is_ignored(".git/objects/ab/cdef"));
        assert!(!matcher.is_ignored("gitignore.txt"));
    }

    #[test]
    fn basename_pattern_matches_at_any_depth() {
        let matcher = IgnoreMatcher::from_str("*.log\n");
        assert!(matcher.is_ignored("a/b/c.log"));
        assert!(matcher.is_ignored("c.log"));
    }

    #[test]
    fn directory_prefix_without_slash_matches_subtree() {
        let matcher = IgnoreMatcher::from_str("node_modules\n");
        assert!(matcher.is_ignored("node_modules/pkg/index.js"));
    }
}
