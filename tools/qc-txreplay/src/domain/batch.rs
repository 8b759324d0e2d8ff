//! Transaction batches: the transactions of one export section.

use shared_types::{Hash, Transaction};

/// One transaction read from the export file.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    /// Transaction hash
    pub hash: Hash,
    /// Raw encoding, hex (what RPC mode resubmits)
    pub raw_hex: String,
    /// Decoded transaction (what direct mode packs)
    pub transaction: Transaction,
}

/// Upper bound on the entries reserved up front. Larger sections grow on demand.
pub const MAX_PREALLOCATED_ENTRIES: usize = 4096;

/// Transactions grouped by the block they originally came from.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    /// Height of the originating block (logging only)
    pub source_height: u32,
    /// Transactions in file order
    pub entries: Vec<BatchEntry>,
}

impl Batch {
    /// Empty batch for the section at `source_height`.
    ///
    /// `capacity` is a hint taken from an untrusted header, so at most
    /// [`MAX_PREALLOCATED_ENTRIES`] are reserved.
    pub fn new(source_height: u32, capacity: usize) -> Self {
        Self {
            source_height,
            entries: Vec::with_capacity(capacity.min(MAX_PREALLOCATED_ENTRIES)),
        }
    }

    /// Number of transactions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch holds no transactions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
