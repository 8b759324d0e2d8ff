//! # Local Ledger
//!
//! Chain state for direct mode: an in-memory block index backed by an
//! append-only block log.
//!
//! ## Log Format
//!
//! ```text
//! [len:u32 LE][block bytes]  (repeated, one record per block)
//! ```
//!
//! Each commit appends one record and syncs the file before the block becomes
//! visible. On open the log is replayed through the same validation as a
//! commit. A record cut short by a crash (torn tail) is dropped with a
//! warning; a complete record that fails to decode is corruption.
//!
//! ## Commit Validation
//!
//! - Height is tip + 1 and the parent is the tip
//! - Transactions root matches the body
//! - Block root matches the accumulator over all transactions roots
//! - One valid signature per bookkeeper, over the block hash
//! - No transaction is committed twice

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use shared_crypto::{compute_merkle_root, verify_signature, MerkleAccumulator};
use shared_types::{hash_to_hex, Block, Hash, ZERO_HASH};
use tracing::{info, warn};

use crate::error::ChainStateError;
use crate::ports::ChainState;

/// Block log file name inside the data directory.
pub const BLOCK_LOG_FILE: &str = "blocks.log";

struct BlockLog {
    file: File,
    path: PathBuf,
}

impl BlockLog {
    fn append(&mut self, block: &Block) -> Result<(), ChainStateError> {
        let bytes = block.to_bytes()?;
        let mut record = Vec::with_capacity(4 + bytes.len());
        record.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        record.extend_from_slice(&bytes);
        self.file.write_all(&record)?;
        self.file.sync_data()?;
        Ok(())
    }
}

/// File-backed (or purely in-memory) chain.
pub struct LocalLedger {
    genesis: Block,
    blocks: Vec<Block>,
    tx_index: HashSet<Hash>,
    accumulator: MerkleAccumulator,
    log: Option<BlockLog>,
}

impl LocalLedger {
    fn empty(genesis: Block) -> Self {
        Self {
            genesis,
            blocks: Vec::new(),
            tx_index: HashSet::new(),
            accumulator: MerkleAccumulator::new(),
            log: None,
        }
    }

    /// Ledger without persistence, seeded with `genesis`.
    pub fn in_memory(genesis: Block) -> Result<Self, ChainStateError> {
        let mut ledger = Self::empty(genesis.clone());
        ledger.commit(genesis)?;
        Ok(ledger)
    }

    /// Open (or create) the ledger in `data_dir`.
    ///
    /// An empty ledger is seeded with `genesis`; an existing one must start
    /// with the same genesis block.
    pub fn open(data_dir: &Path, genesis: Block) -> Result<Self, ChainStateError> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(BLOCK_LOG_FILE);
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        let (records, valid_len) = split_records(&bytes)?;
        if valid_len < bytes.len() {
            warn!(
                "[qc-txreplay] ⚠️ Discarding torn tail of {} ({} bytes at offset {})",
                path.display(),
                bytes.len() - valid_len,
                valid_len
            );
            file.set_len(valid_len as u64)?;
            file.sync_all()?;
        }

        let mut ledger = Self::empty(genesis.clone());
        for (offset, record) in records {
            let block = Block::from_bytes(record).map_err(|e| ChainStateError::Corrupt {
                offset: offset as u64,
                reason: e.to_string(),
            })?;
            ledger.validate(&block)?;
            ledger.apply(block);
        }
        ledger.log = Some(BlockLog { file, path });

        match ledger.blocks.first().map(Block::hash) {
            None => {
                info!("[qc-txreplay] 📁 New ledger at {}", data_dir.display());
                ledger.commit(genesis)?;
            }
            Some(stored) if stored != genesis.hash() => {
                return Err(ChainStateError::GenesisMismatch {
                    stored: hash_to_hex(&stored),
                    configured: hash_to_hex(&genesis.hash()),
                });
            }
            Some(_) => {
                info!(
                    "[qc-txreplay] 💾 Loaded {} blocks from {} (height {})",
                    ledger.blocks.len(),
                    data_dir.display(),
                    ledger.current_height()
                );
            }
        }
        Ok(ledger)
    }

    /// Path of the block log, if persistent.
    pub fn log_path(&self) -> Option<&Path> {
        self.log.as_ref().map(|log| log.path.as_path())
    }

    /// Number of committed blocks, genesis included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether nothing is committed (never true once constructed).
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn validate(&self, block: &Block) -> Result<(), ChainStateError> {
        let height = block.height();
        let (expected, parent) = match self.blocks.last() {
            Some(tip) => (tip.height() + 1, tip.hash()),
            None => (0, ZERO_HASH),
        };
        if height != expected {
            return Err(ChainStateError::HeightMismatch {
                expected,
                actual: height,
            });
        }
        if block.header.prev_block_hash != parent {
            return Err(ChainStateError::PrevHashMismatch { height });
        }

        let tx_hashes = block.transaction_hashes();
        let transactions_root = compute_merkle_root(&tx_hashes);
        if block.header.transactions_root != transactions_root {
            return Err(ChainStateError::TransactionsRootMismatch { height });
        }
        if block.header.block_root != self.accumulator.root_with(transactions_root) {
            return Err(ChainStateError::BlockRootMismatch { height });
        }

        let header = &block.header;
        if header.bookkeepers.len() != header.sig_data.len() {
            return Err(ChainStateError::SignatureCount {
                height,
                bookkeepers: header.bookkeepers.len(),
                signatures: header.sig_data.len(),
            });
        }
        let block_hash = block.hash();
        for (index, (pk, sig)) in header.bookkeepers.iter().zip(&header.sig_data).enumerate() {
            verify_signature(pk, &block_hash, sig)
                .map_err(|_| ChainStateError::InvalidSignature { height, index })?;
        }

        let mut seen = HashSet::with_capacity(tx_hashes.len());
        for hash in &tx_hashes {
            if self.tx_index.contains(hash) || !seen.insert(*hash) {
                return Err(ChainStateError::DuplicateTransaction(hash_to_hex(hash)));
            }
        }
        Ok(())
    }

    fn apply(&mut self, block: Block) {
        self.accumulator.append(block.header.transactions_root);
        self.tx_index.extend(block.transaction_hashes());
        self.blocks.push(block);
    }
}

/// Split the log into `(offset, record)` pairs plus the length of the intact prefix.
fn split_records(bytes: &[u8]) -> Result<(Vec<(usize, &[u8])>, usize), ChainStateError> {
    let mut records = Vec::new();
    let mut cursor = 0;
    while cursor + 4 <= bytes.len() {
        let len = u32::from_le_bytes([
            bytes[cursor],
            bytes[cursor + 1],
            bytes[cursor + 2],
            bytes[cursor + 3],
        ]) as usize;
        if len == 0 {
            return Err(ChainStateError::Corrupt {
                offset: cursor as u64,
                reason: "zero-length record".to_string(),
            });
        }
        let start = cursor + 4;
        if start + len > bytes.len() {
            break;
        }
        records.push((cursor, &bytes[start..start + len]));
        cursor = start + len;
    }
    Ok((records, cursor))
}

impl ChainState for LocalLedger {
    fn current_height(&self) -> u32 {
        self.tip().height()
    }

    fn tip(&self) -> &Block {
        self.blocks.last().unwrap_or(&self.genesis)
    }

    fn block_at(&self, height: u32) -> Option<&Block> {
        self.blocks.get(height as usize)
    }

    fn projected_state_root(&self, transactions_root: Hash) -> Hash {
        self.accumulator.root_with(transactions_root)
    }

    fn has_transaction(&self, hash: &Hash) -> bool {
        self.tx_index.contains(hash)
    }

    fn commit(&mut self, block: Block) -> Result<(), ChainStateError> {
        self.validate(&block)?;
        if let Some(log) = self.log.as_mut() {
            log.append(&block)?;
        }
        self.apply(block);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::wallet::WalletSigner;
    use crate::domain::{build_genesis_block, BlockConstructor};
    use crate::ports::BlockSigner;
    use shared_crypto::Ed25519KeyPair;
    use shared_types::Transaction;
    use std::sync::Arc;

    fn signers() -> Vec<Arc<dyn BlockSigner>> {
        (1..=2u8)
            .map(|i| {
                let key = Ed25519KeyPair::from_seed(&[i; 32]).unwrap();
                Arc::new(WalletSigner::new(format!("bk-{i}"), key)) as Arc<dyn BlockSigner>
            })
            .collect()
    }

    fn genesis(signers: &[Arc<dyn BlockSigner>]) -> Block {
        let keys: Vec<_> = signers.iter().map(|s| s.public_key()).collect();
        build_genesis_block(&keys, 1_000)
    }

    fn tx(nonce: u64) -> Transaction {
        Transaction {
            version: 0,
            nonce,
            payer: [5; 20],
            payload: vec![],
            signature: vec![],
        }
    }

    fn next_block(
        ledger: &LocalLedger,
        signers: &[Arc<dyn BlockSigner>],
        txs: Vec<Transaction>,
    ) -> Block {
        BlockConstructor::default()
            .construct_block(signers, ledger, ledger.current_height() + 1, ledger.tip(), txs)
            .unwrap()
    }

    #[test]
    fn test_commit_chains_blocks() {
        let signers = signers();
        let mut ledger = LocalLedger::in_memory(genesis(&signers)).unwrap();

        for n in 0..3 {
            let block = next_block(&ledger, &signers, vec![tx(n)]);
            ledger.commit(block).unwrap();
        }

        assert_eq!(ledger.current_height(), 3);
        for h in 1..=3 {
            let block = ledger.block_at(h).unwrap();
            let parent = ledger.block_at(h - 1).unwrap();
            assert_eq!(block.header.prev_block_hash, parent.hash());
        }
        assert!(ledger.has_transaction(&tx(2).hash()));
        assert!(!ledger.has_transaction(&tx(9).hash()));
    }

    #[test]
    fn test_rejects_wrong_height_and_parent() {
        let signers = signers();
        let mut ledger = LocalLedger::in_memory(genesis(&signers)).unwrap();
        let block = next_block(&ledger, &signers, vec![]);

        let mut skipped = block.clone();
        skipped.header.height = 2;
        assert!(matches!(
            ledger.commit(skipped),
            Err(ChainStateError::HeightMismatch { expected: 1, actual: 2 })
        ));

        let mut orphan = block;
        orphan.header.prev_block_hash = [0xEE; 32];
        assert!(matches!(
            ledger.commit(orphan),
            Err(ChainStateError::PrevHashMismatch { height: 1 })
        ));
    }

    #[test]
    fn test_rejects_tampered_body() {
        let signers = signers();
        let mut ledger = LocalLedger::in_memory(genesis(&signers)).unwrap();
        let mut block = next_block(&ledger, &signers, vec![tx(1)]);
        block.transactions.push(tx(2));
        assert!(matches!(
            ledger.commit(block),
            Err(ChainStateError::TransactionsRootMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_signatures() {
        let signers = signers();
        let mut ledger = LocalLedger::in_memory(genesis(&signers)).unwrap();

        let mut missing = next_block(&ledger, &signers, vec![]);
        missing.header.sig_data.pop();
        assert!(matches!(
            ledger.commit(missing),
            Err(ChainStateError::SignatureCount { .. })
        ));

        let mut forged = next_block(&ledger, &signers, vec![]);
        forged.header.sig_data[1] = [0x11; 64];
        assert!(matches!(
            ledger.commit(forged),
            Err(ChainStateError::InvalidSignature { index: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_duplicates() {
        let signers = signers();
        let mut ledger = LocalLedger::in_memory(genesis(&signers)).unwrap();
        let block = next_block(&ledger, &signers, vec![tx(1)]);
        ledger.commit(block).unwrap();

        let again = next_block(&ledger, &signers, vec![tx(1)]);
        assert!(matches!(
            ledger.commit(again),
            Err(ChainStateError::DuplicateTransaction(_))
        ));

        let twice = next_block(&ledger, &signers, vec![tx(2), tx(2)]);
        assert!(matches!(
            ledger.commit(twice),
            Err(ChainStateError::DuplicateTransaction(_))
        ));
    }

    #[test]
    fn test_reopen_restores_chain() {
        let dir = tempfile::tempdir().unwrap();
        let signers = signers();

        let tip_hash = {
            let mut ledger = LocalLedger::open(dir.path(), genesis(&signers)).unwrap();
            for n in 0..4 {
                let block = next_block(&ledger, &signers, vec![tx(n)]);
                ledger.commit(block).unwrap();
            }
            ledger.tip().hash()
        };

        let ledger = LocalLedger::open(dir.path(), genesis(&signers)).unwrap();
        assert_eq!(ledger.current_height(), 4);
        assert_eq!(ledger.len(), 5);
        assert_eq!(ledger.log_path(), Some(dir.path().join(BLOCK_LOG_FILE).as_path()));
        assert_eq!(ledger.tip().hash(), tip_hash);
        assert!(ledger.has_transaction(&tx(3).hash()));
    }

    #[test]
    fn test_torn_tail_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let signers = signers();
        {
            let mut ledger = LocalLedger::open(dir.path(), genesis(&signers)).unwrap();
            let block = next_block(&ledger, &signers, vec![tx(1)]);
            ledger.commit(block).unwrap();
        }

        let path = dir.path().join(BLOCK_LOG_FILE);
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&500u32.to_le_bytes()).unwrap();
        file.write_all(&[1, 2, 3]).unwrap();
        drop(file);

        let mut ledger = LocalLedger::open(dir.path(), genesis(&signers)).unwrap();
        assert_eq!(ledger.current_height(), 1);

        // the log is writable again after truncation
        let block = next_block(&ledger, &signers, vec![tx(2)]);
        ledger.commit(block).unwrap();
        drop(ledger);
        let ledger = LocalLedger::open(dir.path(), genesis(&signers)).unwrap();
        assert_eq!(ledger.current_height(), 2);
    }

    #[test]
    fn test_genesis_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let signers = signers();
        LocalLedger::open(dir.path(), genesis(&signers)).unwrap();

        let other = build_genesis_block(&[[7u8; 32]], 1_000);
        assert!(matches!(
            LocalLedger::open(dir.path(), other),
            Err(ChainStateError::GenesisMismatch { .. })
        ));
    }
}
