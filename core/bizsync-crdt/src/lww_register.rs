//! Last-Writer-Wins Register (LWW-Register).
//!
//! A CRDT that stores a single value. Concurrent writes are resolved by
//! comparing hybrid timestamps: the write with the highest timestamp wins.
//!
//! Use cases:
//! - Single-value properties (employee name, department, payroll status)
//! - Any field where "last write wins" semantics are acceptable

use crate::Crdt;
use bizsync_types::HybridTimestamp;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A Last-Writer-Wins Register.
///
/// Stores a value of type `T` along with the timestamp of the write that
/// produced it. Timestamps carry their issuing node, so two writes from
/// different nodes never compare equal. An exact tie can only come from the
/// same origin event; it is broken by the serialized value so merge stays
/// order-independent byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LWWRegister<T> {
    /// The current value.
    value: T,
    /// Timestamp of the winning write.
    timestamp: HybridTimestamp,
}

impl<T> LWWRegister<T> {
    /// Creates a register holding `value` written at `timestamp`.
    #[must_use]
    pub fn new(value: T, timestamp: HybridTimestamp) -> Self {
        Self { value, timestamp }
    }

    /// Returns a reference to the current value.
    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Returns the timestamp of the winning write.
    #[must_use]
    pub fn timestamp(&self) -> &HybridTimestamp {
        &self.timestamp
    }

    /// Consumes the register, returning its value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Records a local write.
    ///
    /// Unconditional: a local write is the node's causally latest action.
    /// Callers obtain `timestamp` from the node's
    /// [`HybridLogicalClock`](bizsync_types::HybridLogicalClock) after it has
    /// observed this register, so it already exceeds the current timestamp.
    pub fn set_value(&mut self, value: T, timestamp: HybridTimestamp) {
        self.value = value;
        self.timestamp = timestamp;
    }
}

impl<T: Serialize> LWWRegister<T> {
    /// Determines if an incoming write should win over the current value.
    fn should_update(&self, other: &Self) -> bool {
        match other.timestamp.cmp(&self.timestamp) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => serialized(&other.value) > serialized(&self.value),
        }
    }
}

impl<T: Clone + Serialize> Crdt for LWWRegister<T> {
    /// The value with the higher timestamp wins.
    fn merge_with(&mut self, other: &Self) {
        if self.should_update(other) {
            self.value = other.value.clone();
            self.timestamp = other.timestamp.clone();
        }
    }
}

fn serialized<T: Serialize>(value: &T) -> Option<Vec<u8>> {
    serde_json::to_vec(value).ok()
}
