//! `tar.gz` / `.tgz` read/write pipeline: a gzip stream wrapping a tar
//! stream (spec.md §4.5, §6.1).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use super::tar::{read_entries, write_into};
use super::{EntryBody, WriteOutcome, WriteSource};
use crate::entry::ArchiveEntry;
use crate::error::Error;
use crate::options::CreateOptions;

pub fn for_each_entry(
    path: &Path,
    visitor: &mut dyn FnMut(&ArchiveEntry, EntryBody<'_>) -> Result<bool, Error>,
) -> Result<(), Error> {
    let file = File::open(path)
        .map_err(|e| Error::io("tar.gz: open archive", Some(path.display().to_string()), e))?;
    let decoder = GzDecoder::new(BufReader::new(file));
    read_entries(decoder, visitor)
}

pub fn write_archive(
    output: &Path,
    sources: &[WriteSource],
    options: &CreateOptions,
) -> Result<WriteOutcome, Error> {
    if !(1..=9).contains(&options.compression_level) {
        return Err(Error::UnsupportedCompression {
            detail: format!(
                "gzip compression level {} is out of range 1..=9",
                options.compression_level
            ),
        });
    }

    let file = File::create(output)
        .map_err(|e| Error::io("tar.gz: create output", Some(output.display().to_string()), e))?;
    let encoder = GzEncoder::new(file, Compression::new(options.compression_level));
    let (encoder, outcome) = write_into(encoder, sources, options)?;
    encoder
        .finish()
        .map_err(|e| Error::io("tar.gz: finish gzip stream", Some(output.display().to_string()), e))?;
    Ok(outcome)
}
