//! Compression level and archive checksums.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use devftp_core::{Error, Result};
use flate2::Compression;
use sha2::{Digest, Sha256};

/// Default compression level (7 = a little slower than zlib's default, smaller output).
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 7;

/// Highest accepted level.
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Validated compression level in `0..=9`.
///
/// `0` stores entries without compression, `9` compresses hardest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompressionLevel(u32);

impl CompressionLevel {
    /// Validates a raw level, failing with `InvalidConfig` outside `0..=9`.
    pub fn new(level: i64) -> Result<Self> {
        if (0..=MAX_COMPRESSION_LEVEL as i64).contains(&level) {
            Ok(Self(level as u32))
        } else {
            Err(Error::invalid_config(format!(
                "Invalid compression level {}. It must be between 0 and {}.",
                level, MAX_COMPRESSION_LEVEL
            )))
        }
    }

    pub fn store_only() -> Self {
        Self(0)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn is_store_only(self) -> bool {
        self.0 == 0
    }

    /// The flate2 setting for this level.
    pub fn to_flate2(self) -> Compression {
        Compression::new(self.0)
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Calculates SHA256 checksum of a file.
pub fn calculate_checksum(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;

    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;

    let hash = hasher.finalize();
    Ok(format!("{:x}", hash))
}
