//! # Consensus Payload
//!
//! JSON document embedded in every block header describing the proposer and
//! the configuration epoch the block belongs to.

use serde::{Deserialize, Serialize};

use crate::errors::CodecError;

/// Proposer value meaning "no specific proposer".
pub const NO_PROPOSER: u32 = u32::MAX;

/// Validator-set configuration introduced at an epoch boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Configuration version.
    pub version: u32,
    /// Consensus view the configuration starts at.
    pub view: u32,
    /// Hex-encoded public keys of the peers in this configuration.
    pub peers: Vec<String>,
}

/// Per-block consensus metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusPayload {
    /// Index of the proposer, or [`NO_PROPOSER`].
    pub proposer: u32,
    /// Height of the block that introduced the active configuration.
    pub last_config_block_num: u32,
    /// Present only on blocks that start a new configuration epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_chain_config: Option<ChainConfig>,
}

impl ConsensusPayload {
    /// Whether this block opens a new configuration epoch.
    pub fn declares_new_config(&self) -> bool {
        self.new_chain_config.is_some()
    }

    /// Encode as JSON bytes.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Decode from JSON bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::Empty);
        }
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_roundtrip() {
        let payload = ConsensusPayload {
            proposer: 3,
            last_config_block_num: 10,
            new_chain_config: Some(ChainConfig {
                version: 1,
                view: 0,
                peers: vec!["ab".into()],
            }),
        };
        let decoded = ConsensusPayload::decode(&payload.encode().unwrap()).unwrap();
        assert_eq!(decoded, payload);
        assert!(decoded.declares_new_config());
    }

    #[test]
    fn test_missing_config_field_decodes_as_none() {
        let decoded =
            ConsensusPayload::decode(br#"{"proposer":1,"last_config_block_num":4}"#).unwrap();
        assert_eq!(decoded.new_chain_config, None);
        assert!(!decoded.declares_new_config());
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert_eq!(ConsensusPayload::decode(b""), Err(CodecError::Empty));
        assert!(ConsensusPayload::decode(b"not json").is_err());
    }
}
