//! # Block Compression
//!
//! Zstd compression for archived blocks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

/// Default zstd level.
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// Compression applied to each archived block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionScheme {
    /// Stored as-is
    None,
    /// Zstd at [`DEFAULT_ZSTD_LEVEL`]
    #[default]
    Zstd,
}

impl CompressionScheme {
    /// Compressor implementing this scheme.
    pub fn compressor(self) -> Box<dyn BlockCompressor> {
        match self {
            CompressionScheme::None => Box::new(NoOpCompressor),
            CompressionScheme::Zstd => Box::new(ZstdCompressor::new(DEFAULT_ZSTD_LEVEL)),
        }
    }
}

impl fmt::Display for CompressionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionScheme::None => f.write_str("none"),
            CompressionScheme::Zstd => f.write_str("zstd"),
        }
    }
}

impl FromStr for CompressionScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(CompressionScheme::None),
            "zstd" => Ok(CompressionScheme::Zstd),
            other => Err(format!("unknown compression {other:?} (expected none or zstd)")),
        }
    }
}

/// Trait for block compression implementations
pub trait BlockCompressor: Send + Sync {
    /// Compress data
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, ArchiveError>;
    /// Decompress data
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, ArchiveError>;
}

/// Zstd compressor
pub struct ZstdCompressor {
    level: i32,
}

impl ZstdCompressor {
    /// Compressor at `level` (1-22).
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl BlockCompressor for ZstdCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, ArchiveError> {
        zstd::encode_all(data, self.level).map_err(|e| ArchiveError::Compression(e.to_string()))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, ArchiveError> {
        zstd::decode_all(data).map_err(|e| ArchiveError::Compression(e.to_string()))
    }
}

/// Pass-through compressor
pub struct NoOpCompressor;

impl BlockCompressor for NoOpCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, ArchiveError> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, ArchiveError> {
        Ok(data.to_vec())
    }
}
