//! Façade seed scenarios driven through the public `fulpack::create` /
//! `fulpack::extract` / `fulpack::verify` functions (spec.md §8 S2, S3, S4).

use std::fs;
use std::io::Write;

use fulpack::{ArchiveFormat, CreateOptions, EntryType, ExtractOptions};
use tempfile::tempdir;

/// S2: a path-traversal payload is recorded as a per-entry error, the safe
/// entry still lands, and nothing escapes the destination.
#[test]
fn extract_records_path_traversal_as_a_per_entry_error() {
    let dest = tempdir().unwrap();
    let archive_dir = tempdir().unwrap();
    let archive_path = archive_dir.path().join("evil.zip");

    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options: zip::write::SimpleFileOptions =
        zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    writer.start_file("good.txt", options).unwrap();
    writer.write_all(b"good").unwrap();
    writer.start_file("../evil.txt", options).unwrap();
    writer.write_all(b"evil").unwrap();
    fs::write(&archive_path, writer.finish().unwrap().into_inner()).unwrap();

    let result = fulpack::extract(&archive_path, dest.path(), &ExtractOptions::default()).unwrap();

    assert_eq!(result.extracted_count, 1);
    assert_eq!(result.error_count, 1);
    assert_eq!(result.errors[0].path, "../evil.txt");
    assert_eq!(result.errors[0].code, "path-traversal");
    assert!(dest.path().join("good.txt").exists());
    assert!(!dest.path().parent().unwrap().join("evil.txt").exists());
}

/// S3: creating from a directory with `.git/**` excluded never surfaces a
/// `.git`-rooted entry on scan.
#[test]
fn create_excludes_git_directory_from_the_resulting_archive() {
    let src = tempdir().unwrap();
    fs::write(src.path().join("a.txt"), b"hello").unwrap();
    fs::create_dir_all(src.path().join(".git")).unwrap();
    fs::write(src.path().join(".git/HEAD"), b"ref: refs/heads/main").unwrap();

    let archive_dir = tempdir().unwrap();
    let output = archive_dir.path().join("out.tar.gz");
    let options = CreateOptions::default().exclude_patterns(vec![".git/**".to_string()]);
    fulpack::create(&[src.path().to_path_buf()], &output, ArchiveFormat::TarGz, &options).unwrap();

    let options = fulpack::ScanOptions::default().entry_types(vec![EntryType::File]);
    let entries = fulpack::scan(&output, &options).unwrap();
    assert!(entries.iter().any(|e| e.path.ends_with("a.txt")));
    assert!(!entries.iter().any(|e| e.path.contains(".git")));
}

/// S4: a symlink whose target contains `..` fails verification with
/// `symlink-escape`, without ever extracting.
#[test]
fn verify_flags_symlink_escape_on_a_malicious_tar() {
    let archive_dir = tempdir().unwrap();
    let archive_path = archive_dir.path().join("malicious.tar");
    let file = fs::File::create(&archive_path).unwrap();
    let mut builder = tar::Builder::new(file);

    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Symlink);
    header.set_mode(0o777);
    header.set_size(0);
    header.set_cksum();
    builder
        .append_link(&mut header, "sub/link.txt", "../../etc/passwd")
        .unwrap();
    builder.finish().unwrap();

    let result = fulpack::verify(&archive_path, &fulpack::VerifyOptions::default());
    assert!(!result.valid);
    assert!(result.errors.iter().any(|e| e.code == "symlink-escape"));
}
