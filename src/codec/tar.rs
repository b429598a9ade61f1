//! Uncompressed `tar` read/write pipeline (spec.md §4.5, §6.1).

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use chrono::DateTime;

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
        .map_err(|e| Error::io("tar: open archive", Some(path.display().to_string()), e))?;
    let reader = BufReader::new(file);
    read_entries(reader, visitor)
}

pub(super) fn read_entries<R: Read>(
    reader: R,
    visitor: &mut dyn FnMut(&ArchiveEntry, EntryBody<'_>) -> Result<bool, Error>,
) -> Result<(), Error> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive.entries().map_err(|e| Error::CorruptArchive {
        operation: "tar: read entries".to_string(),
        detail: e.to_string(),
    })?;

    for entry_result in entries {
        let mut entry = entry_result.map_err(|e| Error::CorruptArchive {
            operation: "tar: read entry header".to_string(),
            detail: e.to_string(),
        })?;

        let raw_path = entry
            .path()
            .map_err(|e| Error::CorruptArchive {
                operation: "tar: decode entry path".to_string(),
                detail: e.to_string(),
            })?
            .to_string_lossy()
            .replace('\\', "/");
        let raw_path = path_guard::clean(&raw_path);

        let header = entry.header().clone();
        let entry_type = match header.entry_type() {
            tar::EntryType::Regular | tar::EntryType::Continuous => EntryType::File,
            tar::EntryType::Directory => EntryType::Directory,
            tar::EntryType::Symlink => EntryType::Symlink,
            // Device nodes, fifos, hardlinks: scan/extract treat them as skipped.
            _ => continue,
        };

        let link_target = if entry_type == EntryType::Symlink {
            entry
                .link_name()
                .ok()
                .flatten()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        } else {
            None
        };

        let modified = header
            .mtime()
            .ok()
            .and_then(|t| DateTime::from_timestamp(t as i64, 0));

        let info = ArchiveEntry {
            path: raw_path,
            entry_type,
            size: header.size().unwrap_or(0),
            compressed_size: 0,
            modified,
            mode: header.mode().ok(),
            link_target,
        };

        let keep_going = if entry_type == EntryType::File {
            visitor(&info, EntryBody::Reader(&mut entry))?
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
    let file = File::create(output)
        .map_err(|e| Error::io("tar: create output", Some(output.display().to_string()), e))?;
    let writer = BufWriter::new(file);
    let (_writer, outcome) = write_into(writer, sources, options)?;
    Ok(outcome)
}

pub(super) fn write_into<W: std::io::Write>(
    writer: W,
    sources: &[WriteSource],
    options: &CreateOptions,
) -> Result<(W, WriteOutcome), Error> {
    let mut builder = tar::Builder::new(writer);
    let mut total_size = 0u64;
    let mut entry_count = 0usize;

    for source in sources {
        match source.entry_type {
            EntryType::Directory => {
                let mode = resolve_mode(source.mode, options.preserve_permissions, DEFAULT_DIR_MODE);
                let mut header = tar::Header::new_gnu();
                header.set_entry_type(tar::EntryType::Directory);
                header.set_mode(mode);
                header.set_size(0);
                header.set_cksum();
                builder
                    .append_data(&mut header, &source.archive_path, std::io::empty())
                    .map_err(|e| write_err(&source.archive_path, e))?;
            }
            EntryType::Symlink => {
                if options.follow_symlinks {
                    append_file(&mut builder, source, options)?;
                } else {
                    let target = fs::read_link(&source.source_path).map_err(|e| {
                        Error::io(
                            "tar: readlink",
                            Some(source.source_path.display().to_string()),
                            e,
                        )
                    })?;
                    let mut header = tar::Header::new_gnu();
                    header.set_entry_type(tar::EntryType::Symlink);
                    header.set_mode(resolve_mode(source.mode, options.preserve_permissions, 0o777));
                    header.set_size(0);
                    header.set_cksum();
                    builder
                        .append_link(&mut header, &source.archive_path, &target)
                        .map_err(|e| write_err(&source.archive_path, e))?;
                }
            }
            EntryType::File => {
                total_size += append_file(&mut builder, source, options)?;
            }
        }
        entry_count += 1;
    }

    let inner = builder
        .into_inner()
        .map_err(|e| write_err("<archive finish>", e))?;

    Ok((
        inner,
        WriteOutcome {
            total_size,
            entry_count,
        },
    ))
}

fn append_file<W: std::io::Write>(
    builder: &mut tar::Builder<W>,
    source: &WriteSource,
    options: &CreateOptions,
) -> Result<u64, Error> {
    let metadata = fs::metadata(&source.source_path).map_err(|e| {
        Error::io(
            "tar: stat source",
            Some(source.source_path.display().to_string()),
            e,
        )
    })?;
    let mode = if options.preserve_permissions {
        source
            .mode
            .unwrap_or_else(|| metadata.permissions().mode())
    } else {
        DEFAULT_FILE_MODE
    };

    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_mode(mode & 0o7777);
    header.set_size(metadata.len());
    header.set_mtime(
        metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0),
    );
    header.set_cksum();

    let mut file = File::open(&source.source_path).map_err(|e| {
        Error::io(
            "tar: open source",
            Some(source.source_path.display().to_string()),
            e,
        )
    })?;

    builder
        .append_data(&mut header, &source.archive_path, &mut file)
        .map_err(|e| write_err(&source.archive_path, e))?;

    Ok(metadata.len())
}

fn write_err(entry: &str, e: std::io::Error) -> Error {
    Error::CorruptArchive {
        operation: format!("tar: write entry '{entry}'"),
        detail: e.to_string(),
    }
}
