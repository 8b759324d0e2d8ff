//! # QC-TxReplay: Transaction Replay Engine
//!
//! Replays an exported transaction log against either a live node (JSON-RPC)
//! or a local ledger (direct block construction and commit).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  ReplayDriver (service.rs)                                       │
//! │  export file ──► batches ──► BatchDispatcher                     │
//! ├───────────────────────────────┬──────────────────────────────────┤
//! │  RemoteDispatcher (RPC mode)  │  LocalCommitDispatcher (direct)  │
//! │  WorkerPool ──► JsonRpcClient │  BlockConstructor ──► LocalLedger│
//! │  N workers, own queue + timer │  WalletSigner × N, archive dump  │
//! └───────────────────────────────┴──────────────────────────────────┘
//! ```
//!
//! ## Export Format
//!
//! ```text
//! Block 100 num 2
//! <tx-hash-hex> <raw-tx-hex>
//! <tx-hash-hex> <raw-tx-hex>
//! Block 101 num 0
//! ```
//!
//! ## Guarantees
//!
//! - Blocks are built and committed strictly in height order, each on top of
//!   the ledger tip.
//! - Every committed block carries one signature per bookkeeper, in order.
//! - In RPC mode each worker submits at most once per delay interval, and a
//!   full worker queue blocks the driver instead of dropping work.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod pool;
pub mod ports;
pub mod service;

pub use config::{LedgerConfig, PoolConfig, ReplayConfig, RpcConfig, WalletsConfig};
pub use error::{ReplayError, Result};
pub use pool::{PoolStats, WorkerPool};
pub use service::{ReplayDriver, ReplaySummary};

/// Capacity of each worker's submission queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Default node JSON-RPC port.
pub const DEFAULT_RPC_PORT: u16 = 20336;

/// Default number of submission workers.
pub const DEFAULT_WORKERS: usize = 1;

/// Default delay between submissions of one worker, in milliseconds.
pub const DEFAULT_DELAY_MS: u64 = 1;
