//! # Block Constructor
//!
//! Rebuilds one block from a batch of replayed transactions on top of the
//! current chain tip.
//!
//! ## Construction Steps
//!
//! 1. Consensus payload derived from the previous block
//! 2. Transactions root over the ordered transaction hashes
//! 3. Block root projected by the chain state
//! 4. Header: parent, roots, timestamp, height, random nonce, payload
//! 5. Block hash over the unsigned header
//! 6. One signature per signer over the block hash, in signer order

use shared_crypto::compute_merkle_root;
use shared_types::{Block, BlockHeader, Transaction, BLOCK_VERSION};
use tracing::debug;

use crate::domain::consensus::next_consensus_payload;
use crate::error::ConstructionError;
use crate::ports::{BlockSigner, ChainState, SystemTimeSource, TimeSource};

/// Builds signed blocks.
pub struct BlockConstructor<T: TimeSource = SystemTimeSource> {
    clock: T,
}

impl Default for BlockConstructor<SystemTimeSource> {
    fn default() -> Self {
        Self::new(SystemTimeSource)
    }
}

impl<T: TimeSource> BlockConstructor<T> {
    /// Constructor reading wall-clock time from `clock`.
    pub fn new(clock: T) -> Self {
        Self { clock }
    }

    /// Build and sign the block at `target_height` on top of `previous`.
    ///
    /// `target_height` must be the chain height plus one and `previous` must
    /// be the chain tip; anything else is a [`ConstructionError::StaleParent`].
    pub fn construct_block<C, S>(
        &self,
        signers: &[S],
        chain: &C,
        target_height: u32,
        previous: &Block,
        transactions: Vec<Transaction>,
    ) -> Result<Block, ConstructionError>
    where
        C: ChainState + ?Sized,
        S: AsRef<dyn BlockSigner>,
    {
        if signers.is_empty() {
            return Err(ConstructionError::NoSigners);
        }

        let chain_height = chain.current_height();
        if chain_height.checked_add(1) != Some(target_height) {
            return Err(ConstructionError::StaleParent {
                target_height,
                chain_height,
                reason: "target height is not the next height".to_string(),
            });
        }
        let previous_hash = previous.hash();
        if previous_hash != chain.tip().hash() {
            return Err(ConstructionError::StaleParent {
                target_height,
                chain_height,
                reason: "previous block is not the chain tip".to_string(),
            });
        }

        let consensus_payload = next_consensus_payload(previous)?.encode()?;

        let tx_hashes: Vec<_> = transactions.iter().map(Transaction::hash).collect();
        let transactions_root = compute_merkle_root(&tx_hashes);
        let block_root = chain.projected_state_root(transactions_root);

        let now = self.clock.now();
        let timestamp = if previous.header.timestamp >= now {
            previous.header.timestamp + 1
        } else {
            now
        };

        let mut header = BlockHeader {
            version: BLOCK_VERSION,
            prev_block_hash: previous_hash,
            transactions_root,
            block_root,
            timestamp,
            height: target_height,
            consensus_data: rand::random(),
            consensus_payload,
            bookkeepers: Vec::with_capacity(signers.len()),
            sig_data: Vec::with_capacity(signers.len()),
        };

        let block_hash = header.hash();
        for (index, signer) in signers.iter().enumerate() {
            let signer = signer.as_ref();
            let signature =
                signer
                    .sign(&block_hash)
                    .map_err(|e| ConstructionError::Signing {
                        index,
                        label: signer.label().to_string(),
                        reason: e.to_string(),
                    })?;
            header.bookkeepers.push(signer.public_key());
            header.sig_data.push(signature);
        }

        debug!(
            "[qc-txreplay] Built block {} with {} txs, {} signatures",
            target_height,
            transactions.len(),
            header.sig_data.len()
        );

        Ok(Block {
            header,
            transactions,
        })
    }
}
