//! Single-file `gzip` read/write pipeline (spec.md §4.5, §6.1). Always
//! exactly one logical entry; the stream's `name` header carries the
//! filename.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};

use super::{EntryBody, WriteOutcome, WriteSource};
use crate::entry::{ArchiveEntry, EntryType};
use crate::error::Error;
use crate::options::CreateOptions;
use crate::path_guard;

pub fn for_each_entry(
    path: &Path,
    visitor: &mut dyn FnMut(&ArchiveEntry, EntryBody<'_>) -> Result<bool, Error>,
) -> Result<(), Error> {
    let file = File::open(path)
        .map_err(|e| Error::io("gzip: open archive", Some(path.display().to_string()), e))?;
    let mut decoder = GzDecoder::new(BufReader::new(file));

    // `GzDecoder::header()` is only populated once the header bytes have
    // actually been read, which happens lazily on the first `read` call.
    // Force that by reading one byte, then splice it back onto the stream.
    let mut probe = [0u8; 1];
    let probed = decoder
        .read(&mut probe)
        .map_err(|e| Error::CorruptArchive {
            operation: "gzip: read header".to_string(),
            detail: e.to_string(),
        })?;

    let name = decoder
        .header()
        .and_then(|h| h.filename())
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .unwrap_or_else(|| fallback_name(path));
    let name = path_guard::clean(&name);

    let info = ArchiveEntry {
        path: name,
        entry_type: EntryType::File,
        size: 0,
        compressed_size: 0,
        modified: None,
        mode: None,
        link_target: None,
    };

    let mut body: Box<dyn Read> = if probed == 0 {
        Box::new(std::io::empty())
    } else {
        Box::new(std::io::Cursor::new(probe[..probed].to_vec()).chain(decoder))
    };

    visitor(&info, EntryBody::Reader(&mut *body))?;
    Ok(())
}

fn fallback_name(path: &Path) -> String {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    for suffix in [".gz", ".gzip"] {
        if let Some(stripped) = name.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    name
}

/// Decode `path` fully, discarding the bytes, to measure its uncompressed
/// size (used by Info, which never writes files to disk).
pub fn uncompressed_size(path: &Path) -> Result<u64, Error> {
    let file = File::open(path)
        .map_err(|e| Error::io("gzip: open archive", Some(path.display().to_string()), e))?;
    let mut decoder = GzDecoder::new(BufReader::new(file));
    let mut sink = std::io::sink();
    std::io::copy(&mut decoder, &mut sink)
        .map_err(|e| Error::CorruptArchive {
            operation: "gzip: measure uncompressed size".to_string(),
            detail: e.to_string(),
        })
}

pub fn write_archive(
    output: &Path,
    sources: &[WriteSource],
    options: &CreateOptions,
) -> Result<WriteOutcome, Error> {
    if sources.len() != 1 {
        return Err(Error::InvalidFormat {
            detail: format!(
                "gzip format requires exactly one file source, got {}",
                sources.len()
            ),
        });
    }
    let source = &sources[0];
    if source.entry_type != EntryType::File {
        return Err(Error::InvalidFormat {
            detail: "gzip format only supports a single regular file".to_string(),
        });
    }
    if !(1..=9).contains(&options.compression_level) {
        return Err(Error::UnsupportedCompression {
            detail: format!(
                "gzip compression level {} is out of range 1..=9",
                options.compression_level
            ),
        });
    }

    let basename = source
        .source_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let out_file = File::create(output)
        .map_err(|e| Error::io("gzip: create output", Some(output.display().to_string()), e))?;
    let mut encoder = GzBuilder::new()
        .filename(basename)
        .write(out_file, Compression::new(options.compression_level));

    let mut input = File::open(&source.source_path).map_err(|e| {
        Error::io(
            "gzip: open source",
            Some(source.source_path.display().to_string()),
            e,
        )
    })?;

    let total_size = std::io::copy(&mut input, &mut encoder).map_err(|e| {
        Error::io(
            "gzip: write compressed stream",
            Some(output.display().to_string()),
            e,
        )
    })?;

    encoder
        .finish()
        .map_err(|e| Error::io("gzip: finish stream", Some(output.display().to_string()), e))?;

    Ok(WriteOutcome {
        total_size,
        entry_count: 1,
    })
}

/// Extraction-side helper matching spec.md §4.6 step 8: write the decoded
/// stream, then unlink it if it exceeds `max_size`.
pub fn extract_enforcing_cap(
    path: &Path,
    dest_file: &Path,
    max_size: u64,
) -> Result<u64, Error> {
    let file = File::open(path)
        .map_err(|e| Error::io("gzip: open archive", Some(path.display().to_string()), e))?;
    let mut decoder = GzDecoder::new(BufReader::new(file));
    let mut out = File::create(dest_file).map_err(|e| {
        Error::io("gzip: create destination", Some(dest_file.display().to_string()), e)
    })?;

    let total = std::io::copy(&mut decoder, &mut out).map_err(|e| Error::CorruptArchive {
        operation: "gzip: decompress".to_string(),
        detail: e.to_string(),
    })?;
    drop(out);

    let actual = fs::metadata(dest_file)
        .map_err(|e| Error::io("gzip: stat destination", Some(dest_file.display().to_string()), e))?
        .len();

    if actual > max_size {
        let _ = fs::remove_file(dest_file);
        return Err(Error::TotalSizeExceeded {
            limit: max_size,
            would_be: actual,
        });
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("payload.txt");
        fs::write(&file_path, b"just one file").unwrap();
        let output = dir.path().join("payload.txt.gz");

        let sources = vec![WriteSource {
            archive_path: "payload.txt".to_string(),
            entry_type: EntryType::File,
            source_path: file_path,
            mode: None,
        }];
        write_archive(&output, &sources, &CreateOptions::default()).unwrap();

        let mut seen_name = None;
        for_each_entry(&output, &mut |entry, body| {
            seen_name = Some(entry.path.clone());
            if let EntryBody::Reader(r) = body {
                let mut data = Vec::new();
                r.read_to_end(&mut data).unwrap();
                assert_eq!(data, b"just one file");
            }
            Ok(true)
        })
        .unwrap();
        assert_eq!(seen_name.as_deref(), Some("payload.txt"));
    }

    #[test]
    fn rejects_multiple_sources() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();
        let sources = vec![
            WriteSource {
                archive_path: "a.txt".to_string(),
                entry_type: EntryType::File,
                source_path: a,
                mode: None,
            },
            WriteSource {
                archive_path: "b.txt".to_string(),
                entry_type: EntryType::File,
                source_path: b,
                mode: None,
            },
        ];
        let output = dir.path().join("out.gz");
        assert!(matches!(
            write_archive(&output, &sources, &CreateOptions::default()),
            Err(Error::InvalidFormat { .. })
        ));
    }

    #[test]
    fn cap_enforcement_unlinks_oversize_output() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("big.bin");
        fs::write(&file_path, vec![7u8; 10_000]).unwrap();
        let archive = dir.path().join("big.bin.gz");

        let sources = vec![WriteSource {
            archive_path: "big.bin".to_string(),
            entry_type: EntryType::File,
            source_path: file_path,
            mode: None,
        }];
        write_archive(&archive, &sources, &CreateOptions::default()).unwrap();

        let dest = dir.path().join("big.bin");
        let err = extract_enforcing_cap(&archive, &dest, 100).unwrap_err();
        assert!(matches!(err, Error::TotalSizeExceeded { .. }));
        assert!(!dest.exists());
    }
}
