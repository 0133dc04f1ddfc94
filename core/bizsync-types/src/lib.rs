//! Core type definitions for BizSync replication.
//!
//! This crate defines the fundamental types every replica agrees on:
//! - Node and entity identifiers
//! - Hybrid Logical Clock timestamps and the clock that issues them
//! - Injectable wall-clock sources
//!
//! CRDTs and entity models live in `bizsync-crdt` and `bizsync-model`.

mod clock;
mod ids;
mod timestamp;

pub use clock::{HybridLogicalClock, ManualClock, SystemClock, WallClock};
pub use ids::{EntityId, NodeId};
pub use timestamp::HybridTimestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid node id: {0}")]
    InvalidNodeId(String),

    #[error("invalid entity id: {0}")]
    InvalidEntityId(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
