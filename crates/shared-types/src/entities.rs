//! # Core Chain Entities
//!
//! ## Clusters
//!
//! - **Primitives**: `Hash`, `Signature`, `PublicKey`, `Address`
//! - **Chain**: `Transaction`, `BlockHeader`, `Block`
//!
//! All entities share one canonical binary codec (fixed-width bincode that
//! rejects trailing bytes). Hashes are never taken over serde output directly;
//! each entity feeds its fields into SHA-256 in a fixed order instead.

use bincode::Options;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha2::{Digest, Sha256};

use crate::errors::CodecError;

// =============================================================================
// PRIMITIVES
// =============================================================================

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// A 20-byte account address.
pub type Address = [u8; 20];

/// The all-zero hash (genesis parent, empty roots).
pub const ZERO_HASH: Hash = [0u8; 32];

/// Header version written by this crate.
pub const BLOCK_VERSION: u32 = 0;

/// Compute SHA-256 of data.
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Compute double SHA-256 of data.
pub fn sha256d(data: &[u8]) -> Hash {
    sha256(&sha256(data))
}

/// Lowercase hex encoding of a hash.
pub fn hash_to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// Parse a 64-character hex string into a hash.
pub fn hash_from_hex(s: &str) -> Result<Hash, CodecError> {
    let bytes = hex::decode(s).map_err(|e| CodecError::Decode(format!("invalid hex: {e}")))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        CodecError::Decode(format!("hash must be 32 bytes, got {}", b.len()))
    })
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    codec()
        .serialize(value)
        .map_err(|e| CodecError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::Empty);
    }
    codec()
        .deserialize(bytes)
        .map_err(|e| CodecError::Decode(e.to_string()))
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// A signed transaction as carried in blocks and export files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction format version.
    pub version: u8,
    /// Payer nonce.
    pub nonce: u64,
    /// Account paying for execution.
    pub payer: Address,
    /// Opaque invocation payload.
    pub payload: Vec<u8>,
    /// Payer signature over the unsigned fields.
    pub signature: Vec<u8>,
}

impl Transaction {
    /// Compute the transaction hash.
    ///
    /// The signature is excluded, so re-signing does not change identity.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update([self.version]);
        hasher.update(self.nonce.to_le_bytes());
        hasher.update(self.payer);
        hasher.update((self.payload.len() as u64).to_le_bytes());
        hasher.update(&self.payload);
        hasher.finalize().into()
    }

    /// Canonical binary encoding.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        encode(self)
    }

    /// Decode from the canonical binary encoding.
    pub fn decode(raw: &[u8]) -> Result<Self, CodecError> {
        decode(raw)
    }

    /// Canonical encoding as lowercase hex (export file / RPC form).
    pub fn encode_hex(&self) -> Result<String, CodecError> {
        self.encode().map(hex::encode)
    }
}

// =============================================================================
// BLOCKS
// =============================================================================

/// Block header.
///
/// `bookkeepers` and `sig_data` are parallel sequences: entry `i` of
/// `sig_data` is the signature of `bookkeepers[i]` over the block hash.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Header format version.
    pub version: u32,
    /// Hash of the parent block.
    pub prev_block_hash: Hash,
    /// Merkle root of the block's transaction hashes.
    pub transactions_root: Hash,
    /// Accumulated root over every transactions root up to this block.
    pub block_root: Hash,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Block height.
    pub height: u32,
    /// Freshness nonce.
    pub consensus_data: u64,
    /// JSON-encoded consensus payload.
    pub consensus_payload: Vec<u8>,
    /// Public keys of the signers.
    pub bookkeepers: Vec<PublicKey>,
    /// Signatures over the block hash.
    #[serde_as(as = "Vec<Bytes>")]
    pub sig_data: Vec<Signature>,
}

impl BlockHeader {
    /// Byte layout of the unsigned header (everything except signers).
    pub fn unsigned_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(128 + self.consensus_payload.len());
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&self.prev_block_hash);
        bytes.extend_from_slice(&self.transactions_root);
        bytes.extend_from_slice(&self.block_root);
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes.extend_from_slice(&self.height.to_le_bytes());
        bytes.extend_from_slice(&self.consensus_data.to_le_bytes());
        bytes.extend_from_slice(&(self.consensus_payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&self.consensus_payload);
        bytes
    }

    /// Block hash: double SHA-256 of the unsigned header.
    pub fn hash(&self) -> Hash {
        sha256d(&self.unsigned_bytes())
    }
}

/// A block: header plus ordered transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block header.
    pub header: BlockHeader,
    /// Transactions in execution order.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Block hash (see [`BlockHeader::hash`]).
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Block height.
    pub fn height(&self) -> u32 {
        self.header.height
    }

    /// Hashes of the contained transactions, in order.
    pub fn transaction_hashes(&self) -> Vec<Hash> {
        self.transactions.iter().map(Transaction::hash).collect()
    }

    /// Canonical binary encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        encode(self)
    }

    /// Decode from the canonical binary encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        decode(bytes)
    }
}
