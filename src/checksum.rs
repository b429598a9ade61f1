//! Digest helpers for the whole-archive checksum and per-file discovery
//! checksums, plus the checksum-algorithm fallback rule (spec.md §3, §8
//! invariant 8).

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// A supported checksum algorithm. `ChecksumAlgorithm::resolve` is the
/// fallback rule: any unrecognized/unsupported name maps to `Sha256`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Sha256,
    Xxh3_128,
}

impl ChecksumAlgorithm {
    /// The label used in `ArchiveInfo.checksum_algorithm` / `checksums`.
    pub fn label(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Xxh3_128 => "xxh3-128",
        }
    }

    /// Resolve a requested algorithm name, falling back to `sha256` for
    /// anything unrecognized. Never fails: this is the documented fallback
    /// law, not a validation gate.
    pub fn resolve(requested: &str) -> Self {
        match requested.to_ascii_lowercase().as_str() {
            "xxh3-128" | "xxh3_128" | "xxh3" => Self::Xxh3_128,
            _ => Self::Sha256,
        }
    }

    /// Like `resolve`, but treats an empty string as "use the default"
    /// (`xxh3-128`), per `FindQuery::checksum_algorithm`'s documented
    /// default.
    pub fn resolve_or_default(requested: &str) -> Self {
        if requested.is_empty() {
            Self::Xxh3_128
        } else {
            Self::resolve(requested)
        }
    }

    /// Strict parse used by the Discovery Walker: an empty string means
    /// "use the default" (`xxh3-128`), but an unrecognized non-empty name
    /// is a configuration error rather than a silent fallback (spec.md
    /// §4.3's "configuration error ... is fatal" rule, distinct from
    /// Create's fallback law).
    pub fn parse_strict(requested: &str) -> Option<Self> {
        match requested.to_ascii_lowercase().as_str() {
            "" => Some(Self::Xxh3_128),
            "xxh3-128" | "xxh3_128" | "xxh3" => Some(Self::Xxh3_128),
            "sha256" => Some(Self::Sha256),
            _ => None,
        }
    }

    pub fn digest_reader<R: Read>(self, reader: R) -> io::Result<String> {
        match self {
            Self::Sha256 => sha256_reader(reader),
            Self::Xxh3_128 => xxh3_reader(reader),
        }
    }

    pub fn digest_file(self, path: &Path) -> io::Result<String> {
        let file = File::open(path)?;
        self.digest_reader(BufReader::new(file))
    }

    pub fn digest_bytes(self, data: &[u8]) -> String {
        match self {
            Self::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(data);
                hex::encode(hasher.finalize())
            }
            Self::Xxh3_128 => hex::encode(xxhash_rust::xxh3::xxh3_128(data).to_be_bytes()),
        }
    }
}

fn sha256_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn xxh3_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    Ok(hex::encode(xxhash_rust::xxh3::xxh3_128(&data).to_be_bytes()))
}
