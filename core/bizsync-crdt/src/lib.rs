//! CRDT implementations for BizSync.
//!
//! This crate provides the Conflict-free Replicated Data Types that business
//! records are composed from:
//!
//! - [`LWWRegister<T>`]: Last-Writer-Wins Register for single values
//! - [`VectorClock`]: Causality tracking across nodes
//! - [`ORSet<T>`]: Observed-Remove Set for collections
//! - [`PNCounter`]: Positive-Negative Counter for distributed inc/dec
//!
//! All CRDTs in this crate satisfy the following properties:
//! - **Commutative**: merge(a, b) == merge(b, a)
//! - **Associative**: merge(merge(a, b), c) == merge(a, merge(b, c))
//! - **Idempotent**: merge(a, a) == a
//!
//! These properties ensure that replicas will converge to the same state
//! regardless of the order in which they exchange state.
//!
//! Internal maps are ordered, so two converged replicas also serialize to
//! identical bytes.

mod error;
mod lww_register;
mod orset;
mod pn_counter;
mod vector_clock;

pub use error::{CrdtError, Result};
pub use lww_register::LWWRegister;
pub use orset::{ORSet, Tag};
pub use pn_counter::PNCounter;
pub use vector_clock::{CausalOrder, VectorClock};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A state-based CRDT.
///
/// `merge_with` must be commutative, associative and idempotent.
pub trait Crdt: Clone {
    /// Merges another replica's state into this one.
    fn merge_with(&mut self, other: &Self);

    /// Creates a new replica that is the merge of this and another.
    #[must_use]
    fn merged(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.merge_with(other);
        result
    }

    /// Serializes the full replicated state as JSON.
    fn to_json(&self) -> Result<String>
    where
        Self: Serialize,
    {
        Ok(serde_json::to_string(self)?)
    }

    /// Restores a replica from [`to_json`](Self::to_json) output.
    ///
    /// Corrupt input is an error, never a default value.
    fn from_json(json: &str) -> Result<Self>
    where
        Self: DeserializeOwned,
    {
        Ok(serde_json::from_str(json)?)
    }
}
