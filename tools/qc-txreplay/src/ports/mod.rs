//! Ports: the seams between the replay engine and its environment.

pub mod outbound;

pub use outbound::{
    BatchDispatcher, BlockRef, BlockSigner, ChainState, DispatchStats, RemoteSubmitter,
    SystemTimeSource, TimeSource,
};
