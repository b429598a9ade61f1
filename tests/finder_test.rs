//! Repository-Root Finder properties driven through the public
//! `fulpack::find_repository_root` façade, including the non-escape
//! invariant for a marker that only exists outside the search boundary.

use std::fs;

use fulpack::{Error, FindRootQuery};
use tempfile::tempdir;

#[test]
fn finds_marker_at_the_start_directory() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("Cargo.toml"), "").unwrap();

    let query = FindRootQuery::new(dir.path(), vec!["Cargo.toml".to_string()]).boundary(dir.path());
    let found = fulpack::find_repository_root(&query).unwrap();
    assert_eq!(
        fs::canonicalize(&found).unwrap(),
        fs::canonicalize(dir.path()).unwrap()
    );
}

/// S9 (repository-root non-escape): a marker that exists only in the
/// boundary's parent must never be returned, even when the boundary itself
/// coincides with the search's start directory.
#[test]
fn marker_outside_boundary_is_never_returned() {
    let outer = tempdir().unwrap();
    let proj = outer.path().join("proj");
    fs::create_dir_all(&proj).unwrap();
    fs::write(outer.path().join(".git"), "").unwrap();

    let query = FindRootQuery::new(proj.as_path(), vec![".git".to_string()])
        .boundary(proj.as_path())
        .stop_at_first(true);
    let err = fulpack::find_repository_root(&query).unwrap_err();
    assert!(matches!(
        err,
        Error::RepositoryNotFound {
            reason: "boundary_reached"
        }
    ));
}

#[test]
fn boundary_reached_without_marker_is_not_found() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("a/b");
    fs::create_dir_all(&nested).unwrap();

    let query = FindRootQuery::new(nested.as_path(), vec!["nonexistent.marker".to_string()])
        .boundary(dir.path());
    let err = fulpack::find_repository_root(&query).unwrap_err();
    assert!(matches!(
        err,
        Error::RepositoryNotFound {
            reason: "boundary_reached"
        }
    ));
}
