//! # Merkle Commitments
//!
//! Two commitments over ordered hash lists:
//!
//! - [`compute_merkle_root`]: binary SHA-256 tree over one block's
//!   transaction hashes (odd node is paired with itself).
//! - [`MerkleAccumulator`]: append-only Merkle Mountain Range over every
//!   block's transactions root. Only peaks are kept, so appending is
//!   O(log n) and the accumulator is cheap to clone for "what if" roots.

use sha2::{Digest, Sha256};

use crate::Hash;

/// Root of an empty transaction list.
pub const EMPTY_MERKLE_ROOT: Hash = [0u8; 32];

fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Merkle root over ordered leaf hashes.
pub fn compute_merkle_root(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return EMPTY_MERKLE_ROOT;
    }

    let mut level: Vec<Hash> = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| hash_pair(&pair[0], pair.get(1).unwrap_or(&pair[0])))
            .collect();
    }
    level[0]
}

#[derive(Debug, Clone, Copy)]
struct Peak {
    hash: Hash,
    height: u32,
}

/// Append-only accumulator (Merkle Mountain Range, peaks only).
#[derive(Debug, Clone, Default)]
pub struct MerkleAccumulator {
    peaks: Vec<Peak>,
    leaf_count: u64,
}

impl MerkleAccumulator {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of appended leaves.
    pub fn leaf_count(&self) -> u64 {
        self.leaf_count
    }

    /// Append a leaf, merging equal-height peaks.
    pub fn append(&mut self, leaf: Hash) {
        let mut carry = Peak {
            hash: leaf,
            height: 0,
        };
        while let Some(last) = self.peaks.last().copied() {
            if last.height != carry.height {
                break;
            }
            self.peaks.pop();
            carry = Peak {
                hash: hash_pair(&last.hash, &carry.hash),
                height: last.height + 1,
            };
        }
        self.peaks.push(carry);
        self.leaf_count += 1;
    }

    /// Current root: peaks bagged right-to-left. Empty ⇒ all-zero hash.
    pub fn root(&self) -> Hash {
        let mut peaks = self.peaks.iter().rev();
        let Some(first) = peaks.next() else {
            return [0u8; 32];
        };
        peaks.fold(first.hash, |acc, peak| hash_pair(&peak.hash, &acc))
    }

    /// Root the accumulator would have after appending `leaf`, without
    /// mutating `self`.
    pub fn root_with(&self, leaf: Hash) -> Hash {
        let mut projected = self.clone();
        projected.append(leaf);
        projected.root()
    }
}
