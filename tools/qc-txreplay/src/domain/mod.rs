//! Domain layer: pure replay logic.

pub mod batch;
pub mod block_builder;
pub mod consensus;
pub mod export_format;
pub mod genesis;

pub use batch::{Batch, BatchEntry};
pub use block_builder::BlockConstructor;
pub use consensus::next_consensus_payload;
pub use export_format::{ExportLine, ExportWriter, SectionHeader, TxRecord};
pub use genesis::{build_genesis_block, DEFAULT_GENESIS_TIMESTAMP};
