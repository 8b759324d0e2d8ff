//! Consensus payload for replayed blocks.
//!
//! Replayed blocks are not produced by a live consensus round, so the proposer
//! is the [`NO_PROPOSER`] sentinel and no new configuration is ever declared.
//! Only the configuration epoch is carried forward.

use shared_types::{Block, CodecError, ConsensusPayload, NO_PROPOSER};

/// Payload for the block following `previous`.
///
/// If `previous` opened a new configuration epoch, its height becomes the
/// epoch start; otherwise the epoch start is inherited.
pub fn next_consensus_payload(previous: &Block) -> Result<ConsensusPayload, CodecError> {
    let prev_payload = ConsensusPayload::decode(&previous.header.consensus_payload)?;
    let last_config_block_num = if prev_payload.declares_new_config() {
        previous.height()
    } else {
        prev_payload.last_config_block_num
    };

    Ok(ConsensusPayload {
        proposer: NO_PROPOSER,
        last_config_block_num,
        new_chain_config: None,
    })
}
