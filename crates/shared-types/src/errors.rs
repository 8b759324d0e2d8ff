//! # Error Types
//!
//! Codec errors shared by every entity in this crate.

use thiserror::Error;

/// Errors raised while encoding or decoding chain entities.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Value could not be encoded.
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// Bytes do not describe a valid value.
    #[error("Decoding failed: {0}")]
    Decode(String),

    /// Input was empty where a value was required.
    #[error("Empty input")]
    Empty,
}
