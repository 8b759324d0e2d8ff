//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Sealing a secret failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Opening a sealed secret failed (wrong key or tampered data)
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Bytes are not a valid curve point
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Key derivation parameters rejected
    #[error("Invalid KDF parameters: {0}")]
    InvalidKdfParams(String),

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,
}
