//! # Symmetric Encryption
//!
//! XChaCha20-Poly1305 sealing for wallet secrets at rest.
//!
//! The 192-bit nonce is random per seal, so reusing a key across many
//! wallet files is safe.

use crate::CryptoError;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use zeroize::Zeroize;

/// Secret key (256-bit).
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretKey([u8; 32]);

impl SecretKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Ciphertext plus the nonce it was sealed under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedBox {
    /// XChaCha20 nonce
    pub nonce: [u8; 24],
    /// Ciphertext with Poly1305 tag appended
    pub ciphertext: Vec<u8>,
}

/// Seal `plaintext` under `key` with a fresh random nonce.
///
/// # Errors
///
/// Returns `CryptoError::EncryptionFailed` if the AEAD rejects the input.
pub fn seal(key: &SecretKey, plaintext: &[u8]) -> Result<SealedBox, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    let mut nonce = [0u8; 24];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce);

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok(SealedBox { nonce, ciphertext })
}

/// Open a sealed box.
///
/// # Errors
///
/// Returns `CryptoError::DecryptionFailed` on a wrong key or tampered data.
pub fn open(key: &SecretKey, sealed: &SealedBox) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    cipher
        .decrypt(XNonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}
