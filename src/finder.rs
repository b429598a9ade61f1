//! Repository-Root Finder (spec.md §4.4): bounded upward search for a
//! marker file/dir, sharing the Path Guard's containment rule.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::options::FindRootQuery;
use crate::path_guard;

/// Walk upward from `query.start` until a marker is found, the boundary is
/// reached, or traversal otherwise terminates. `Ok(None)` is never returned
/// directly — a non-found outcome is `Err(Error::RepositoryNotFound)`
/// carrying the termination reason, per spec.md §4.4.
pub fn find_repository_root(query: &FindRootQuery) -> Result<PathBuf, Error> {
    if query.start.as_os_str().is_empty() {
        return Err(Error::InvalidStartPath {
            detail: "start path is empty".to_string(),
        });
    }
    if !query.start.exists() {
        return Err(Error::InvalidStartPath {
            detail: format!("start path '{}' does not exist", query.start.display()),
        });
    }
    if query.markers.is_empty() {
        return Err(Error::InvalidMarkers);
    }

    let boundary = resolve_boundary(query)?;

    let start_dir = if query.start.is_file() {
        query
            .start
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| query.start.clone())
    } else {
        query.start.clone()
    };

    let mut cur = fs::canonicalize(&start_dir).map_err(|e| {
        Error::io(
            "find_repository_root: resolve start directory",
            Some(start_dir.display().to_string()),
            e,
        )
    })?;

    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut depth = 0usize;
    let mut last_match: Option<PathBuf> = None;

    loop {
        if query.follow_symlinks && !visited.insert(cur.clone()) {
            return Err(Error::TraversalLoop {
                path: cur.display().to_string(),
            });
        }

        if !is_within_boundary(&cur, &boundary) {
            return last_match.ok_or(Error::RepositoryNotFound {
                reason: "boundary_reached",
            });
        }

        if has_marker(&cur, &query.markers) {
            if query.stop_at_first {
                return Ok(cur);
            }
            // Keep walking, remembering the outermost match so a caller
            // asking for a monorepo's topmost root gets it instead of the
            // first (innermost) marker found.
            last_match = Some(cur.clone());
        }

        if depth >= query.max_depth {
            return last_match.ok_or(Error::RepositoryNotFound {
                reason: "max_depth_reached",
            });
        }

        let parent = match cur.parent() {
            Some(p) if p != cur => p.to_path_buf(),
            _ => {
                return last_match.ok_or(Error::RepositoryNotFound {
                    reason: "filesystem_root_reached",
                })
            }
        };

        cur = if query.follow_symlinks {
            match fs::canonicalize(&parent) {
                Ok(resolved) => resolved,
                Err(e) if is_permission_denied(&e) => parent,
                Err(_) => {
                    return last_match.ok_or(Error::RepositoryNotFound {
                        reason: "traversal_termination",
                    })
                }
            }
        } else {
            parent
        };

        depth += 1;
    }
}

fn has_marker(dir: &Path, markers: &[String]) -> bool {
    markers.iter().any(|m| dir.join(m).exists())
}

fn is_permission_denied(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::PermissionDenied
}

fn resolve_boundary(query: &FindRootQuery) -> Result<PathBuf, Error> {
    match &query.boundary {
        Some(b) => {
            if b.as_os_str().is_empty() {
                return Err(Error::InvalidBoundary {
                    detail: "boundary path is empty".to_string(),
                });
            }
            fs::canonicalize(b).map_err(|e| Error::InvalidBoundary {
                detail: format!("boundary '{}' is not usable: {e}", b.display()),
            })
        }
        None => {
            let home = std::env::var_os("HOME").map(PathBuf::from);
            match home.and_then(|h| fs::canonicalize(&h).ok()) {
                Some(h) if h != Path::new("/") => Ok(h),
                _ => fs::canonicalize(&query.start).or_else(|_| Ok(query.start.clone())),
            }
        }
    }
}

/// Containment check reusing the Path Guard's rule: `dir` is within
/// `boundary` iff it equals the boundary or can be expressed as a
/// boundary-relative path with no `..` component.
fn is_within_boundary(dir: &Path, boundary: &Path) -> bool {
    if dir == boundary {
        return true;
    }
    path_guard::validate_within_root(dir, boundary).is_ok()
}
