//! # Outbound Ports (Driven Ports)
//!
//! Capabilities the replay engine requires from its environment.
//!
//! Production adapters live in `crate::adapters`; tests substitute in-memory
//! implementations.

use async_trait::async_trait;
use shared_types::{Block, Hash, PublicKey, Signature};

use crate::domain::Batch;
use crate::error::{ChainStateError, RpcError, SignerError};

/// Block lookup key for [`RemoteSubmitter::fetch_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRef {
    /// By height
    Height(u32),
    /// By block hash
    Hash(Hash),
}

/// Remote node accepting raw transactions.
#[async_trait]
pub trait RemoteSubmitter: Send + Sync {
    /// Number of blocks the node holds.
    async fn count(&self) -> Result<u32, RpcError>;

    /// Raw encoding of one block.
    async fn fetch_block(&self, block: BlockRef) -> Result<Vec<u8>, RpcError>;

    /// Submit one raw transaction (hex). No retry.
    async fn submit(&self, raw_tx_hex: &str) -> Result<(), RpcError>;
}

/// Persistent chain the direct mode appends to.
///
/// Implementations always hold at least the genesis block.
pub trait ChainState: Send {
    /// Height of the tip.
    fn current_height(&self) -> u32;

    /// Tip block.
    fn tip(&self) -> &Block;

    /// Block at `height`, if committed.
    fn block_at(&self, height: u32) -> Option<&Block>;

    /// Block root the next block must carry if its transactions root is
    /// `transactions_root`. Does not mutate the chain.
    fn projected_state_root(&self, transactions_root: Hash) -> Hash;

    /// Whether a committed block already contains `hash`.
    fn has_transaction(&self, hash: &Hash) -> bool;

    /// Validate and append `block`.
    fn commit(&mut self, block: Block) -> Result<(), ChainStateError>;
}

/// Authorized block signer (bookkeeper).
pub trait BlockSigner: Send + Sync {
    /// Human-readable name used in errors and logs.
    fn label(&self) -> &str;

    /// Public key recorded in the block header.
    fn public_key(&self) -> PublicKey;

    /// Sign `payload` (a block hash).
    fn sign(&self, payload: &[u8]) -> Result<Signature, SignerError>;
}

/// Abstract interface for time operations (for testability).
pub trait TimeSource: Send + Sync {
    /// Current timestamp in seconds since epoch.
    fn now(&self) -> u64;
}

/// Default time source using system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Cumulative dispatch counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Transactions sent (RPC mode) or packed into blocks (direct mode)
    pub delivered: u64,
    /// Failed submissions (RPC mode) or dropped duplicates (direct mode)
    pub errors: u64,
    /// Blocks committed (direct mode)
    pub blocks_committed: u64,
    /// Ledger tip height (direct mode)
    pub chain_height: Option<u32>,
}

/// Where the replay driver sends each completed batch.
#[async_trait]
pub trait BatchDispatcher: Send {
    /// Short mode name for logs.
    fn mode(&self) -> &'static str;

    /// Hand over one batch. An empty batch is a no-op.
    async fn dispatch(&mut self, batch: Batch) -> crate::Result<()>;

    /// Flush everything after the last batch.
    async fn finish(&mut self) -> crate::Result<()>;

    /// Counters so far.
    fn stats(&self) -> DispatchStats;
}
