//! Adapters: concrete implementations of the outbound ports.

pub mod archive;
pub mod compression;
pub mod dispatch;
pub mod ledger;
pub mod rpc;
pub mod wallet;

pub use archive::{write_chain_archive, ArchiveMetadata, BlockArchiveReader, BlockArchiveWriter};
pub use compression::{BlockCompressor, CompressionScheme};
pub use dispatch::{LocalCommitDispatcher, RemoteDispatcher};
pub use ledger::LocalLedger;
pub use rpc::JsonRpcClient;
pub use wallet::{load_wallets, KdfParams, WalletFile, WalletSigner};
