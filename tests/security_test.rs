//! End-to-end security properties of the extract pipeline: zip-slip,
//! symlink escape, overwrite policies, and decompression-bomb limits,
//! driven through the public `fulpack::extract` façade rather than the
//! codec internals.

use std::io::Write;

use fulpack::{Error, ExtractOptions, OverwritePolicy};
use tempfile::tempdir;
use zip::write::SimpleFileOptions;

fn zip_with_entries(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options: SimpleFileOptions =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn blocks_zip_slip_traversal() {
    let dest = tempdir().unwrap();
    let archive_dir = tempdir().unwrap();
    let archive_path = archive_dir.path().join("evil.zip");
    std::fs::write(
        &archive_path,
        zip_with_entries(&[("safe.txt", b"safe"), ("../../evil.txt", b"evil")]),
    )
    .unwrap();

    let result = fulpack::extract(&archive_path, dest.path(), &ExtractOptions::default()).unwrap();

    assert_eq!(result.extracted_count, 1, "only the safe entry should land");
    assert_eq!(result.error_count, 1);
    assert!(dest.path().join("safe.txt").exists());
    assert!(!dest.path().parent().unwrap().join("evil.txt").exists());
}

#[test]
#[cfg(unix)]
fn symlink_overwrite_does_not_follow_existing_link() {
    use std::os::unix::fs::symlink;

    let dest = tempdir().unwrap();
    let target = dest.path().join("target.txt");
    let link = dest.path().join("link.txt");
    std::fs::write(&target, "sensitive").unwrap();
    symlink(&target, &link).unwrap();

    let archive_dir = tempdir().unwrap();
    let archive_path = archive_dir.path().join("bundle.zip");
    std::fs::write(&archive_path, zip_with_entries(&[("link.txt", b"pwned")])).unwrap();

    let options = ExtractOptions::default().overwrite(OverwritePolicy::Overwrite);
    let result = fulpack::extract(&archive_path, dest.path(), &options).unwrap();

    assert_eq!(result.extracted_count, 1);
    assert!(!link.is_symlink());
    assert_eq!(std::fs::read_to_string(&link).unwrap(), "pwned");
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "sensitive");
}

#[test]
fn overwrite_policy_error_leaves_existing_file_untouched() {
    let dest = tempdir().unwrap();
    std::fs::write(dest.path().join("a.txt"), "original").unwrap();

    let archive_dir = tempdir().unwrap();
    let archive_path = archive_dir.path().join("bundle.zip");
    std::fs::write(&archive_path, zip_with_entries(&[("a.txt", b"modified")])).unwrap();

    let result = fulpack::extract(&archive_path, dest.path(), &ExtractOptions::default()).unwrap();
    assert_eq!(result.error_count, 1);
    assert_eq!(result.errors[0].code, "file-exists");
    assert_eq!(std::fs::read_to_string(dest.path().join("a.txt")).unwrap(), "original");
}

#[test]
fn overwrite_policy_skip_counts_skipped_entries() {
    let dest = tempdir().unwrap();
    std::fs::write(dest.path().join("a.txt"), "original").unwrap();

    let archive_dir = tempdir().unwrap();
    let archive_path = archive_dir.path().join("bundle.zip");
    std::fs::write(&archive_path, zip_with_entries(&[("a.txt", b"modified")])).unwrap();

    let options = ExtractOptions::default().overwrite(OverwritePolicy::Skip);
    let result = fulpack::extract(&archive_path, dest.path(), &options).unwrap();
    assert_eq!(result.skipped_count, 1);
    assert_eq!(result.extracted_count, 0);
    assert_eq!(std::fs::read_to_string(dest.path().join("a.txt")).unwrap(), "original");
}

#[test]
fn file_count_limit_is_enforced() {
    let dest = tempdir().unwrap();
    let archive_dir = tempdir().unwrap();
    let archive_path = archive_dir.path().join("many.zip");
    std::fs::write(
        &archive_path,
        zip_with_entries(&[
            ("a.txt", b"1"),
            ("b.txt", b"2"),
            ("c.txt", b"3"),
            ("d.txt", b"4"),
        ]),
    )
    .unwrap();

    let options = ExtractOptions::default().max_entries(2);
    let err = fulpack::extract(&archive_path, dest.path(), &options).unwrap_err();
    assert!(matches!(err, Error::FileCountExceeded { limit: 2, .. }));
}

#[test]
fn total_size_limit_is_enforced() {
    let dest = tempdir().unwrap();
    let archive_dir = tempdir().unwrap();
    let archive_path = archive_dir.path().join("big.zip");
    std::fs::write(&archive_path, zip_with_entries(&[("big.bin", &[0u8; 1024])])).unwrap();

    let options = ExtractOptions::default().max_size(100);
    let err = fulpack::extract(&archive_path, dest.path(), &options).unwrap_err();
    assert!(matches!(err, Error::TotalSizeExceeded { limit: 100, .. }));
}

#[test]
fn verify_flags_path_traversal_without_extracting() {
    let archive_dir = tempdir().unwrap();
    let archive_path = archive_dir.path().join("evil.zip");
    std::fs::write(
        &archive_path,
        zip_with_entries(&[("../../evil.txt", b"evil")]),
    )
    .unwrap();

    let result = fulpack::verify(&archive_path, &fulpack::VerifyOptions::default());
    assert!(!result.valid);
    assert!(result.errors.iter().any(|e| e.code == "path-escape" || e.code == "path-traversal"));
}
