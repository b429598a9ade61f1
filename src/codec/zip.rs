//! `zip` (PKZIP + deflate) read/write pipeline (spec.md §4.5, §6.1). Zip
//! does not natively carry symlinks; directory entries are zero-byte names
//! ending in `/`.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{resolve_mode, EntryBody, WriteOutcome, WriteSource};
use crate::entry::{ArchiveEntry, EntryType};
use crate::error::Error;
use crate::options::CreateOptions;
use crate::path_guard;

const DEFAULT_DIR_MODE: u32 = 0o755;
const DEFAULT_FILE_MODE: u32 = 0o644;

pub fn for_each_entry(
    path: &Path,
    visitor: &mut dyn FnMut(&ArchiveEntry, EntryBody<'_>) -> Result<bool, Error>,
) -> Result<(), Error> {
    let file = File::open(path)
        .map_err(|e| Error::io("zip: open archive", Some(path.display().to_string()), e))?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| Error::CorruptArchive {
        operation: "zip: read central directory".to_string(),
        detail: e.to_string(),
    })?;

    for i in 0..archive.len() {
        let mut zip_entry = archive.by_index(i).map_err(|e| Error::CorruptArchive {
            operation: format!("zip: read entry {i}"),
            detail: e.to_string(),
        })?;

        let raw_name = zip_entry.name().replace('\\', "/");
        let is_dir = raw_name.ends_with('/') || zip_entry.is_dir();
        let cleaned_name = path_guard::clean(&raw_name);
        let entry_type = if is_dir {
            EntryType::Directory
        } else {
            EntryType::File
        };

        let modified = zip_entry
            .last_modified()
            .and_then(|dt| {
                chrono::NaiveDate::from_ymd_opt(
                    dt.year() as i32,
                    dt.month() as u32,
                    dt.day() as u32,
                )
                .and_then(|d| d.and_hms_opt(dt.hour() as u32, dt.minute() as u32, dt.second() as u32))
            })
            .map(|naive| naive.and_utc());

        let info = ArchiveEntry {
            path: cleaned_name,
            entry_type,
            size: zip_entry.size(),
            compressed_size: zip_entry.compressed_size(),
            modified,
            mode: zip_entry.unix_mode(),
            link_target: None,
        };

        let keep_going = if entry_type == EntryType::File {
            visitor(&info, EntryBody::Reader(&mut zip_entry))?
        } else {
            visitor(&info, EntryBody::None)?
        };

        if !keep_going {
            break;
        }
    }

    Ok(())
}

pub fn write_archive(
    output: &Path,
    sources: &[WriteSource],
    options: &CreateOptions,
) -> Result<WriteOutcome, Error> {
    if !(1..=9).contains(&options.compression_level) {
        return Err(Error::UnsupportedCompression {
            detail: format!(
                "zip compression level {} is out of range 1..=9",
                options.compression_level
            ),
        });
    }

    let file = File::create(output)
        .map_err(|e| Error::io("zip: create output", Some(output.display().to_string()), e))?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let mut total_size = 0u64;
    let mut entry_count = 0usize;

    for source in sources {
        match source.entry_type {
            EntryType::Directory => {
                let mode = resolve_mode(source.mode, options.preserve_permissions, DEFAULT_DIR_MODE);
                let dir_options = SimpleFileOptions::default().unix_permissions(mode);
                let name = format!("{}/", source.archive_path.trim_end_matches('/'));
                writer
                    .add_directory(name, dir_options)
                    .map_err(|e| write_err(&source.archive_path, e))?;
            }
            EntryType::Symlink => {
                if options.follow_symlinks {
                    append_file(&mut writer, source, options, &mut total_size)?;
                }
                // zip has no native symlink record; without follow_symlinks
                // the entry is silently skipped, per spec.md §4.5.
            }
            EntryType::File => {
                append_file(&mut writer, source, options, &mut total_size)?;
            }
        }
        entry_count += 1;
    }

    writer
        .finish()
        .map_err(|e| write_err("<archive finish>", e))?;

    Ok(WriteOutcome {
        total_size,
        entry_count,
    })
}

fn append_file<W: std::io::Write + std::io::Seek>(
    writer: &mut ZipWriter<W>,
    source: &WriteSource,
    options: &CreateOptions,
    total_size: &mut u64,
) -> Result<(), Error> {
    let mode = resolve_mode(source.mode, options.preserve_permissions, DEFAULT_FILE_MODE);
    let file_options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(options.compression_level as i64))
        .unix_permissions(mode);

    writer
        .start_file(&source.archive_path, file_options)
        .map_err(|e| write_err(&source.archive_path, e))?;

    let mut input = File::open(&source.source_path).map_err(|e| {
        Error::io(
            "zip: open source",
            Some(source.source_path.display().to_string()),
            e,
        )
    })?;

    let written = std::io::copy(&mut input, writer).map_err(|e| write_err(&source.archive_path, e))?;
    *total_size += written;
    Ok(())
}

fn write_err(entry: &str, e: impl std::fmt::Display) -> Error {
    Error::CorruptArchive {
        operation: format!("zip: write entry '{entry}'"),
        detail: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;

    #[test]
    fn round_trips_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("hello.txt");
        fs::write(&file_path, b"hello zip").unwrap();
        let output = dir.path().join("out.zip");

        let sources = vec![
            WriteSource {
                archive_path: "sub".to_string(),
                entry_type: EntryType::Directory,
                source_path: dir.path().to_path_buf(),
                mode: None,
            },
            WriteSource {
                archive_path: "sub/hello.txt".to_string(),
                entry_type: EntryType::File,
                source_path: file_path,
                mode: None,
            },
        ];
        write_archive(&output, &sources, &CreateOptions::default()).unwrap();

        let mut seen = Vec::new();
        for_each_entry(&output, &mut |entry, body| {
            seen.push((entry.path.clone(), entry.entry_type));
            if let EntryBody::Reader(r) = body {
                let mut data = Vec::new();
                r.read_to_end(&mut data).unwrap();
                assert_eq!(data, b"hello zip");
            }
            Ok(true)
        })
        .unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.contains(&("sub/hello.txt".to_string(), EntryType::File)));
    }

    #[test]
    fn rejects_out_of_range_compression_level() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.zip");
        let options = CreateOptions::default().compression_level(0);
        assert!(write_archive(&output, &[], &options).is_err());
    }

    #[test]
    fn skips_symlinks_when_not_following() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target.txt");
        fs::write(&target, "t").unwrap();
        let link = dir.path().join("link.txt");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let sources = vec![WriteSource {
            archive_path: "link.txt".to_string(),
            entry_type: EntryType::Symlink,
            source_path: link,
            mode: None,
        }];
        let output = dir.path().join("out.zip");
        let outcome = write_archive(&output, &sources, &CreateOptions::default()).unwrap();
        assert_eq!(outcome.total_size, 0);

        let mut count = 0;
        for_each_entry(&output, &mut |_, _| {
            count += 1;
            Ok(true)
        })
        .unwrap();
        assert_eq!(count, 0);
    }
}
