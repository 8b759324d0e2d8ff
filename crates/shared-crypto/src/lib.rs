//! # Shared Crypto - Cryptographic Primitives for Tx Replay
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `merkle` | SHA-256 binary tree, MMR | Transactions root, block root |
//! | `signatures` | Ed25519 | Bookkeeper block signatures |
//! | `symmetric` | XChaCha20-Poly1305 | Wallet sealing |
//! | `kdf` | scrypt | Wallet password key derivation |
//!
//! ## Security Properties
//!
//! - **Ed25519**: Deterministic nonces, no RNG dependency when signing
//! - **XChaCha20**: 192-bit random nonce per seal
//! - **scrypt**: memory-hard password stretching, N=2^18 by default

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod kdf;
pub mod merkle;
pub mod signatures;
pub mod symmetric;

// Re-exports
pub use errors::CryptoError;
pub use kdf::{scrypt_derive_key, SCRYPT_LOG_N, SCRYPT_P, SCRYPT_R};
pub use merkle::{compute_merkle_root, MerkleAccumulator, EMPTY_MERKLE_ROOT};
pub use signatures::{verify_signature, Ed25519KeyPair};
pub use symmetric::{open, seal, SealedBox, SecretKey};

/// 32-byte digest used by every module in this crate.
pub type Hash = [u8; 32];
