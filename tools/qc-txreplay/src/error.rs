//! Error types for the replay engine

use shared_crypto::CryptoError;
use shared_types::CodecError;
use thiserror::Error;

/// Result type alias for replay operations
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Top-level replay error. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Malformed or inconsistent export file
    #[error("Input format error at line {line}: {reason} (line: {content:?})")]
    InputFormat {
        /// 1-based line number
        line: usize,
        /// Offending line, verbatim
        content: String,
        /// What was wrong with it
        reason: String,
    },

    /// Block could not be built
    #[error("Block construction failed: {0}")]
    Construction(#[from] ConstructionError),

    /// Ledger refused a block
    #[error("Chain state error: {0}")]
    ChainState(#[from] ChainStateError),

    /// Remote node call failed
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// Re-export archive failure
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Wallet loading failure
    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Worker pool failure
    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),

    /// Reading the export file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReplayError {
    /// Build an input-format error for `line_no`.
    pub fn input_format(line_no: usize, content: &str, reason: impl Into<String>) -> Self {
        ReplayError::InputFormat {
            line: line_no,
            content: content.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while assembling a block.
#[derive(Debug, Error)]
pub enum ConstructionError {
    /// Target height or parent does not match the chain tip
    #[error("Stale parent at target height {target_height} (chain height {chain_height}): {reason}")]
    StaleParent {
        /// Height requested by the caller
        target_height: u32,
        /// Chain height at construction time
        chain_height: u32,
        /// Which check failed
        reason: String,
    },

    /// No bookkeepers configured
    #[error("No signers configured")]
    NoSigners,

    /// A bookkeeper failed to sign the block hash
    #[error("Signer #{index} ({label}) failed: {reason}")]
    Signing {
        /// Position of the signer
        index: usize,
        /// Human-readable signer label
        label: String,
        /// Underlying failure
        reason: String,
    },

    /// Previous block's consensus payload is unreadable, or ours failed to encode
    #[error("Consensus payload error: {0}")]
    Payload(#[from] CodecError),
}

/// Errors raised by a chain state implementation.
#[derive(Debug, Error)]
pub enum ChainStateError {
    /// Block is not the next height
    #[error("Height mismatch: expected {expected}, got {actual}")]
    HeightMismatch {
        /// Next expected height
        expected: u32,
        /// Height of the rejected block
        actual: u32,
    },

    /// Block does not extend the tip
    #[error("Block {height} does not extend the tip")]
    PrevHashMismatch {
        /// Height of the rejected block
        height: u32,
    },

    /// Header transactions root disagrees with the body
    #[error("Block {height}: transactions root mismatch")]
    TransactionsRootMismatch {
        /// Height of the rejected block
        height: u32,
    },

    /// Header block root disagrees with the ledger accumulator
    #[error("Block {height}: block root mismatch")]
    BlockRootMismatch {
        /// Height of the rejected block
        height: u32,
    },

    /// Bookkeepers and signatures are not parallel
    #[error("Block {height}: {bookkeepers} bookkeepers but {signatures} signatures")]
    SignatureCount {
        /// Height of the rejected block
        height: u32,
        /// Number of bookkeepers
        bookkeepers: usize,
        /// Number of signatures
        signatures: usize,
    },

    /// A signature does not verify against its bookkeeper
    #[error("Block {height}: invalid signature #{index}")]
    InvalidSignature {
        /// Height of the rejected block
        height: u32,
        /// Signature position
        index: usize,
    },

    /// Transaction already committed or repeated inside the block
    #[error("Duplicate transaction {0}")]
    DuplicateTransaction(String),

    /// Stored genesis differs from the configured one
    #[error("Genesis mismatch: stored {stored}, configured {configured}")]
    GenesisMismatch {
        /// Hash of the genesis found on disk
        stored: String,
        /// Hash of the genesis built from configuration
        configured: String,
    },

    /// Block log is unreadable
    #[error("Corrupt block log at offset {offset}: {reason}")]
    Corrupt {
        /// Byte offset of the bad record
        offset: u64,
        /// What was wrong with it
        reason: String,
    },

    /// Block could not be encoded
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Block log I/O failure
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when talking to the node's JSON-RPC endpoint.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Request could not be sent or completed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Node is not reachable
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Node answered with a non-zero error code
    #[error("Remote error {code}: {desc}")]
    Remote {
        /// Node error code
        code: i64,
        /// Node error description
        desc: String,
    },

    /// Response body is not what the method promises
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// Errors raised while writing or reading a block archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Underlying file failure
    #[error("Archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File does not start with the archive magic
    #[error("Not a block archive (bad magic)")]
    BadMagic,

    /// Archive written by an unknown format version
    #[error("Unsupported archive version {0}")]
    UnsupportedVersion(u32),

    /// File ends inside a record
    #[error("Archive truncated: {0}")]
    Truncated(String),

    /// Compression or decompression failed
    #[error("Compression error: {0}")]
    Compression(String),

    /// Metadata or block could not be (de)serialized
    #[error("Archive codec error: {0}")]
    Codec(String),

    /// Ledger has no block at a height inside the requested range
    #[error("Ledger has no block at height {0}")]
    MissingBlock(u32),
}

impl From<CodecError> for ArchiveError {
    fn from(e: CodecError) -> Self {
        ArchiveError::Codec(e.to_string())
    }
}

/// Errors raised while loading bookkeeper wallets.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Wallet or wallet list could not be read
    #[error("Cannot read {path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// File content is not the expected JSON
    #[error("Cannot parse {path}: {reason}")]
    Parse {
        /// File path
        path: String,
        /// Parser message
        reason: String,
    },

    /// Sealing failed, or wrong password / damaged wallet on unlock
    #[error("Wallet {label}: {source}")]
    Crypto {
        /// Wallet label
        label: String,
        /// Underlying failure
        #[source]
        source: CryptoError,
    },

    /// Unlocked key does not match the recorded public key
    #[error("Wallet {label}: public key does not match the sealed seed")]
    PublicKeyMismatch {
        /// Wallet label
        label: String,
    },

    /// Wallet list is empty
    #[error("No wallets configured")]
    Empty,
}

/// Invalid configuration value.
#[derive(Debug, Error)]
#[error("{field}: {reason}")]
pub struct ConfigError {
    /// Offending setting
    pub field: &'static str,
    /// Why it is rejected
    pub reason: String,
}

impl ConfigError {
    /// Build a config error.
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Worker pool errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// Queues were closed
    #[error("Worker pool is closed")]
    Closed,

    /// Slot index out of range
    #[error("Invalid worker slot {slot} (pool size {size})")]
    InvalidSlot {
        /// Requested slot
        slot: usize,
        /// Number of workers
        size: usize,
    },

    /// A worker task ended abnormally
    #[error("Worker {slot} terminated abnormally: {reason}")]
    WorkerFailed {
        /// Worker slot
        slot: usize,
        /// Join error text
        reason: String,
    },
}

/// Signing failure reported by a [`crate::ports::outbound::BlockSigner`].
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SignerError(pub String);
