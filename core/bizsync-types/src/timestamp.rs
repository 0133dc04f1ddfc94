//! Hybrid Logical Clock timestamps.
//!
//! A timestamp combines physical time with a logical counter and the id of
//! the node that issued it, ensuring:
//! - Monotonicity (a node's timestamps always increase)
//! - Causality (if A happens-before B, then ts(A) < ts(B))
//! - A strict total order across nodes (node id breaks exact ties)

use crate::{Error, NodeId, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Hybrid Logical Clock timestamp.
///
/// Consists of:
/// - `wall_time`: Milliseconds since Unix epoch (physical component)
/// - `logical`: Logical counter for events at the same wall time
/// - `node_id`: The node that issued the timestamp
///
/// Based on the HLC algorithm from "Logical Physical Clocks" (Kulkarni et al.).
/// Timestamps are produced by [`HybridLogicalClock`](crate::HybridLogicalClock);
/// this type only carries and orders them.
///
/// The text form `{wall_time:020}-{logical:010}-{node_id}` is stable and
/// sorts lexicographically in timestamp order for a given node id length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HybridTimestamp {
    /// Physical time component (milliseconds since Unix epoch).
    wall_time: u64,
    /// Logical counter for ordering events at the same wall time.
    logical: u32,
    /// Issuing node.
    node_id: NodeId,
}

impl HybridTimestamp {
    /// Reads the system clock once for `node_id`, with a zero logical counter.
    ///
    /// Two readings in the same millisecond are equal. Local events take
    /// their timestamp from
    /// [`HybridLogicalClock::now`](crate::HybridLogicalClock::now) instead.
    #[must_use]
    pub fn from_system_clock(node_id: NodeId) -> Self {
        let wall_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            wall_time,
            logical: 0,
            node_id,
        }
    }

    /// Creates a timestamp from components.
    #[must_use]
    pub const fn new(wall_time: u64, logical: u32, node_id: NodeId) -> Self {
        Self {
            wall_time,
            logical,
            node_id,
        }
    }

    /// Returns the wall time component.
    #[must_use]
    pub const fn wall_time(&self) -> u64 {
        self.wall_time
    }

    /// Returns the logical counter.
    #[must_use]
    pub const fn logical(&self) -> u32 {
        self.logical
    }

    /// Returns the node that issued this timestamp.
    #[must_use]
    pub const fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Returns true if this timestamp orders before the other.
    #[must_use]
    pub fn is_before(&self, other: &Self) -> bool {
        self < other
    }

    /// Returns true if this timestamp orders after the other.
    #[must_use]
    pub fn is_after(&self, other: &Self) -> bool {
        self > other
    }

    /// Returns the greater of two timestamps by reference.
    #[must_use]
    pub fn latest<'a>(&'a self, other: &'a Self) -> &'a Self {
        if other > self { other } else { self }
    }
}

impl PartialOrd for HybridTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HybridTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.wall_time
            .cmp(&other.wall_time)
            .then_with(|| self.logical.cmp(&other.logical))
            .then_with(|| self.node_id.cmp(&other.node_id))
    }
}

impl fmt::Display for HybridTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:020}-{:010}-{}",
            self.wall_time, self.logical, self.node_id
        )
    }
}

impl FromStr for HybridTimestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // Node ids may contain '-', so only the first two dashes delimit.
        let mut parts = s.splitn(3, '-');
        let (Some(wall), Some(logical), Some(node)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::InvalidTimestamp(format!(
                "expected <wall>-<logical>-<node>, got {s:?}"
            )));
        };

        let wall_time = wall
            .parse::<u64>()
            .map_err(|e| Error::InvalidTimestamp(format!("bad wall time in {s:?}: {e}")))?;
        let logical = logical
            .parse::<u32>()
            .map_err(|e| Error::InvalidTimestamp(format!("bad logical counter in {s:?}: {e}")))?;
        let node_id = NodeId::parse(node)
            .map_err(|e| Error::InvalidTimestamp(format!("bad node id in {s:?}: {e}")))?;

        Ok(Self {
            wall_time,
            logical,
            node_id,
        })
    }
}

impl TryFrom<String> for HybridTimestamp {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<HybridTimestamp> for String {
    fn from(ts: HybridTimestamp) -> Self {
        ts.to_string()
    }
}
