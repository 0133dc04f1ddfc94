//! Vector Clock for causality tracking.
//!
//! A vector clock tracks the logical time across multiple nodes, enabling
//! determination of causality (happens-before relationships) between two
//! versions of an entity.
//!
//! Use cases:
//! - Detecting and reporting concurrent edits
//! - Recording which nodes contributed to an entity's history
//!
//! Conflict resolution itself is delegated to the per-field CRDTs; the
//! vector clock never decides which value wins.

use crate::{Crdt, CrdtError, Result};
use bizsync_types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Causality relationship between two vector clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CausalOrder {
    /// First clock happened before second.
    Before,
    /// First clock happened after second.
    After,
    /// Clocks are concurrent (neither happened before the other).
    Concurrent,
    /// Clocks are identical.
    Equal,
}

/// A Vector Clock owned by one node.
///
/// The owner only ever increments its own counter ([`tick`](Self::tick));
/// other nodes' counters advance only through [`update`](Self::update).
/// Missing counters read as 0.
///
/// The owner is replica-local metadata: it is serialized, but two clocks
/// with the same counters are equal whoever owns them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorClock {
    node_id: NodeId,
    counters: BTreeMap<NodeId, u64>,
}

impl VectorClock {
    /// Creates an empty clock owned by `node_id`.
    #[must_use]
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            counters: BTreeMap::new(),
        }
    }

    /// The owning node.
    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Re-homes the clock on `node_id`. Counters are untouched.
    pub fn rebind(&mut self, node_id: NodeId) {
        self.node_id = node_id;
    }

    /// Returns the logical time for a node (0 if not present).
    #[must_use]
    pub fn get(&self, node_id: &NodeId) -> u64 {
        self.counters.get(node_id).copied().unwrap_or(0)
    }

    /// Returns all nodes and their times, ordered by node id.
    pub fn counters(&self) -> impl Iterator<Item = (&NodeId, u64)> {
        self.counters.iter().map(|(node, &time)| (node, time))
    }

    /// Returns the number of nodes in the clock.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Returns true if the clock has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Increments the owner's counter and returns the new value.
    ///
    /// Called on every local mutation.
    pub fn tick(&mut self) -> u64 {
        let entry = self.counters.entry(self.node_id.clone()).or_insert(0);
        *entry = entry.saturating_add(1);
        *entry
    }

    /// Merges another vector clock into this one.
    ///
    /// For each node, takes the maximum of the two times.
    /// This operation is commutative, associative, and idempotent.
    pub fn update(&mut self, other: &Self) {
        for (node_id, &time) in &other.counters {
            let entry = self.counters.entry(node_id.clone()).or_insert(0);
            if time > *entry {
                *entry = time;
            }
        }
    }

    /// Compares this clock with another to determine causal ordering.
    #[must_use]
    pub fn compare(&self, other: &Self) -> CausalOrder {
        let mut self_ge = true; // self >= other for all nodes
        let mut other_ge = true; // other >= self for all nodes

        for node_id in self.counters.keys().chain(other.counters.keys()) {
            let self_time = self.get(node_id);
            let other_time = other.get(node_id);

            if self_time < other_time {
                self_ge = false;
            }
            if other_time < self_time {
                other_ge = false;
            }
        }

        match (self_ge, other_ge) {
            (true, true) => CausalOrder::Equal,
            (true, false) => CausalOrder::After,
            (false, true) => CausalOrder::Before,
            (false, false) => CausalOrder::Concurrent,
        }
    }

    /// Returns true if this clock happened before the other.
    #[must_use]
    pub fn happens_before(&self, other: &Self) -> bool {
        self.compare(other) == CausalOrder::Before
    }

    /// Returns true if this clock is concurrent with the other.
    #[must_use]
    pub fn is_concurrent(&self, other: &Self) -> bool {
        self.compare(other) == CausalOrder::Concurrent
    }

    /// Returns true if this clock dominates the other (is >= for all nodes).
    #[must_use]
    pub fn dominates(&self, other: &Self) -> bool {
        matches!(self.compare(other), CausalOrder::After | CausalOrder::Equal)
    }
}

impl Crdt for VectorClock {
    fn merge_with(&mut self, other: &Self) {
        self.update(other);
    }
}

impl PartialEq for VectorClock {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == CausalOrder::Equal
    }
}

impl Eq for VectorClock {}

/// Text form: `owner|node=n,node=n`, nodes in ascending order.
impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|", self.node_id)?;
        for (i, (node, time)) in self.counters.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{node}={time}")?;
        }
        Ok(())
    }
}

impl FromStr for VectorClock {
    type Err = CrdtError;

    fn from_str(s: &str) -> Result<Self> {
        let (owner, body) = s
            .split_once('|')
            .ok_or_else(|| CrdtError::Malformed(format!("vector clock {s:?} has no owner")))?;

        let mut clock = Self::new(NodeId::parse(owner)?);
        for pair in body.split(',').filter(|p| !p.is_empty()) {
            let (node, time) = pair.split_once('=').ok_or_else(|| {
                CrdtError::Malformed(format!("vector clock entry {pair:?} is not node=time"))
            })?;
            let node = NodeId::parse(node)?;
            let time = time.parse::<u64>().map_err(|e| {
                CrdtError::Malformed(format!("vector clock entry {pair:?}: {e}"))
            })?;
            if clock.counters.insert(node, time).is_some() {
                return Err(CrdtError::Malformed(format!(
                    "vector clock {s:?} repeats an entry"
                )));
            }
        }
        Ok(clock)
    }
}
