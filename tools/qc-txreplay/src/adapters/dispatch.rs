//! Batch dispatchers: what the replay driver does with each batch.
//!
//! - [`RemoteDispatcher`]: RPC mode, fans raw transactions out to the worker pool.
//! - [`LocalCommitDispatcher`]: direct mode, builds one signed block per batch,
//!   commits it, and archives the whole chain once the input is exhausted.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shared_types::{hash_to_hex, Transaction};
use tracing::{debug, info, warn};

use crate::adapters::archive::write_chain_archive;
use crate::adapters::compression::CompressionScheme;
use crate::config::PoolConfig;
use crate::domain::{Batch, BlockConstructor};
use crate::pool::WorkerPool;
use crate::ports::{
    BatchDispatcher, BlockSigner, ChainState, DispatchStats, RemoteSubmitter, SystemTimeSource,
    TimeSource,
};
use crate::Result;

/// RPC-mode dispatcher.
pub struct RemoteDispatcher {
    pool: WorkerPool,
    submitter: Arc<dyn RemoteSubmitter>,
}

impl RemoteDispatcher {
    /// Start the worker pool and probe the node.
    pub async fn start(
        config: &PoolConfig,
        delay: Duration,
        submitter: Arc<dyn RemoteSubmitter>,
    ) -> Result<Self> {
        let pool = WorkerPool::start(config, delay, Arc::clone(&submitter))?;
        let dispatcher = Self { pool, submitter };
        dispatcher.probe("before replay").await;
        Ok(dispatcher)
    }

    /// Log the node's block count. Failure is logged and ignored.
    async fn probe(&self, when: &str) {
        match self.submitter.count().await {
            Ok(count) => info!("[qc-txreplay] Node block count {}: {}", when, count),
            Err(e) => warn!("[qc-txreplay] Cannot read node block count {}: {}", when, e),
        }
    }
}

#[async_trait]
impl BatchDispatcher for RemoteDispatcher {
    fn mode(&self) -> &'static str {
        "rpc"
    }

    async fn dispatch(&mut self, batch: Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.pool
            .submit_round_robin(batch.entries.into_iter().map(|entry| entry.raw_hex))
            .await?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        let stats = self.pool.await_completion().await?;
        debug!(
            "[qc-txreplay] Workers drained: {} sent, {} failed",
            stats.sent, stats.failed
        );
        self.probe("after replay").await;
        Ok(())
    }

    fn stats(&self) -> DispatchStats {
        let stats = self.pool.snapshot_stats();
        DispatchStats {
            delivered: stats.sent,
            errors: stats.failed,
            ..Default::default()
        }
    }
}

/// Direct-mode dispatcher.
pub struct LocalCommitDispatcher<C: ChainState, T: TimeSource = SystemTimeSource> {
    chain: C,
    signers: Vec<Arc<dyn BlockSigner>>,
    constructor: BlockConstructor<T>,
    archive_path: PathBuf,
    compression: CompressionScheme,
    packed: u64,
    duplicates: u64,
    blocks_committed: u64,
}

impl<C: ChainState> LocalCommitDispatcher<C> {
    /// Dispatcher committing to `chain`, signed by `signers` in order. The
    /// chain is archived to `archive_path` when the replay finishes.
    pub fn new(chain: C, signers: Vec<Arc<dyn BlockSigner>>, archive_path: PathBuf) -> Self {
        Self::with_clock(chain, signers, archive_path, SystemTimeSource)
    }
}

impl<C: ChainState, T: TimeSource> LocalCommitDispatcher<C, T> {
    /// Dispatcher with an explicit clock.
    pub fn with_clock(
        chain: C,
        signers: Vec<Arc<dyn BlockSigner>>,
        archive_path: PathBuf,
        clock: T,
    ) -> Self {
        Self {
            chain,
            signers,
            constructor: BlockConstructor::new(clock),
            archive_path,
            compression: CompressionScheme::default(),
            packed: 0,
            duplicates: 0,
            blocks_committed: 0,
        }
    }

    /// Compress archived blocks with `compression`.
    pub fn with_compression(mut self, compression: CompressionScheme) -> Self {
        self.compression = compression;
        self
    }

    /// Where the archive is written on finish.
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Chain being appended to.
    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Consume the dispatcher, returning the chain.
    pub fn into_chain(self) -> C {
        self.chain
    }

    /// Drop already-committed and repeated transactions, counting each as an error.
    fn drop_duplicates(&mut self, batch: Batch) -> Vec<Transaction> {
        let mut seen = HashSet::with_capacity(batch.len());
        let mut kept = Vec::with_capacity(batch.len());
        for entry in batch.entries {
            if self.chain.has_transaction(&entry.hash) || !seen.insert(entry.hash) {
                warn!(
                    "[qc-txreplay] Skipping duplicate tx {} (source block {})",
                    hash_to_hex(&entry.hash),
                    batch.source_height
                );
                self.duplicates += 1;
                continue;
            }
            kept.push(entry.transaction);
        }
        kept
    }
}

#[async_trait]
impl<C: ChainState, T: TimeSource> BatchDispatcher for LocalCommitDispatcher<C, T> {
    fn mode(&self) -> &'static str {
        "direct"
    }

    async fn dispatch(&mut self, batch: Batch) -> Result<()> {
        let source_height = batch.source_height;
        let transactions = self.drop_duplicates(batch);
        if transactions.is_empty() {
            debug!(
                "[qc-txreplay] Nothing to pack for source block {}",
                source_height
            );
            return Ok(());
        }

        let count = transactions.len() as u64;
        let target_height = self.chain.current_height() + 1;
        let block = self.constructor.construct_block(
            &self.signers,
            &self.chain,
            target_height,
            self.chain.tip(),
            transactions,
        )?;
        let hash = block.hash();
        self.chain.commit(block)?;

        self.packed += count;
        self.blocks_committed += 1;
        debug!(
            "[qc-txreplay] Committed block {} ({}) with {} txs from source block {}",
            target_height,
            hash_to_hex(&hash),
            count,
            source_height
        );
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        write_chain_archive(&self.chain, &self.archive_path, self.compression)?;
        Ok(())
    }

    fn stats(&self) -> DispatchStats {
        DispatchStats {
            delivered: self.packed,
            errors: self.duplicates,
            blocks_committed: self.blocks_committed,
            chain_height: Some(self.chain.current_height()),
        }
    }
}
