//! # Shared Types Crate
//!
//! Chain entities used across the tx replay workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: blocks, headers and transactions are defined
//!   once here and encoded with one canonical codec.
//! - **Hash Stability**: every hash is computed over the canonical encoding, so
//!   a value decoded from disk or from an export file rehashes identically.

pub mod consensus;
pub mod entities;
pub mod errors;

pub use consensus::*;
pub use entities::*;
pub use errors::*;
