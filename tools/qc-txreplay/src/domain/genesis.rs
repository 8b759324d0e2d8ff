//! Genesis Block Creation
//!
//! Seeds an empty ledger. The genesis block is a pure function of the
//! bookkeeper set and timestamp, so reopening a ledger with the same wallets
//! rebuilds the identical block.

use shared_crypto::{MerkleAccumulator, EMPTY_MERKLE_ROOT};
use shared_types::{
    hash_to_hex, Block, BlockHeader, ChainConfig, ConsensusPayload, PublicKey, BLOCK_VERSION,
    NO_PROPOSER, ZERO_HASH,
};

/// Genesis timestamp used by the CLI (2018-06-30T00:00:00Z).
pub const DEFAULT_GENESIS_TIMESTAMP: u64 = 1_530_316_800;

/// Build the genesis block declaring `bookkeepers` as the initial peers.
pub fn build_genesis_block(bookkeepers: &[PublicKey], timestamp: u64) -> Block {
    let payload = ConsensusPayload {
        proposer: NO_PROPOSER,
        last_config_block_num: 0,
        new_chain_config: Some(ChainConfig {
            version: 1,
            view: 1,
            peers: bookkeepers.iter().map(hash_to_hex).collect(),
        }),
    };

    let header = BlockHeader {
        version: BLOCK_VERSION,
        height: 0,
        prev_block_hash: ZERO_HASH, // No parent for genesis
        transactions_root: EMPTY_MERKLE_ROOT,
        block_root: MerkleAccumulator::new().root_with(EMPTY_MERKLE_ROOT),
        timestamp,
        consensus_data: 0,
        // ChainConfig is plain data; serde_json cannot fail on it
        consensus_payload: payload.encode().unwrap_or_default(),
        bookkeepers: vec![],
        sig_data: vec![],
    };

    Block {
        header,
        transactions: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_is_deterministic() {
        let keys = [[1u8; 32], [2u8; 32]];
        let a = build_genesis_block(&keys, DEFAULT_GENESIS_TIMESTAMP);
        let b = build_genesis_block(&keys, DEFAULT_GENESIS_TIMESTAMP);
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), build_genesis_block(&keys[..1], DEFAULT_GENESIS_TIMESTAMP).hash());
    }

    #[test]
    fn test_genesis_declares_peers() {
        let keys = [[9u8; 32]];
        let genesis = build_genesis_block(&keys, 0);
        assert_eq!(genesis.height(), 0);
        assert_eq!(genesis.header.prev_block_hash, ZERO_HASH);

        let payload = ConsensusPayload::decode(&genesis.header.consensus_payload).unwrap();
        let config = payload.new_chain_config.unwrap();
        assert_eq!(config.peers, vec![hash_to_hex(&[9u8; 32])]);
    }
}
