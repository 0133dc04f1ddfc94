//! Local timestamp generation.
//!
//! [`HybridLogicalClock`] issues strictly increasing [`HybridTimestamp`]s for
//! one node. The wall-clock source is injected so tests can freeze time or
//! make it jump backwards.

use crate::{HybridTimestamp, NodeId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of physical time in milliseconds since the Unix epoch.
pub trait WallClock: Send + Sync {
    /// Returns the current wall time. May go backwards; the HLC copes.
    fn now_millis(&self) -> u64;
}

/// The operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// A manually driven clock, for tests and deterministic replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Creates a clock frozen at `millis`.
    #[must_use]
    pub fn new(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    /// Moves the clock to `millis`, forwards or backwards.
    pub fn set(&self, millis: u64) {
        self.millis.store(millis, AtomicOrdering::SeqCst);
    }

    /// Advances the clock by `delta` milliseconds.
    pub fn advance(&self, delta: u64) {
        self.millis.fetch_add(delta, AtomicOrdering::SeqCst);
    }
}

impl WallClock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(AtomicOrdering::SeqCst)
    }
}

/// Hybrid Logical Clock for a single node.
///
/// Guarantees that successive timestamps strictly increase, even when the
/// wall clock stalls or jumps backwards, and that a timestamp produced after
/// [`observe`](Self::observe) exceeds the observed one. Shareable across
/// threads; generation is serialized by an internal mutex.
pub struct HybridLogicalClock {
    node_id: NodeId,
    wall_clock: Arc<dyn WallClock>,
    /// (wall_time, logical) of the last emitted timestamp.
    last: Mutex<(u64, u32)>,
}

impl HybridLogicalClock {
    /// Creates a clock for `node_id` reading physical time from `wall_clock`.
    #[must_use]
    pub fn new(node_id: NodeId, wall_clock: Arc<dyn WallClock>) -> Self {
        Self {
            node_id,
            wall_clock,
            last: Mutex::new((0, 0)),
        }
    }

    /// Creates a clock for `node_id` backed by the system clock.
    #[must_use]
    pub fn system(node_id: NodeId) -> Self {
        Self::new(node_id, Arc::new(SystemClock))
    }

    /// The node this clock issues timestamps for.
    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Generates the timestamp for a new local event.
    pub fn now(&self) -> HybridTimestamp {
        let wall = self.wall_clock.now_millis();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let (last_wall, last_logical) = *last;

        let next = if wall > last_wall {
            (wall, 0)
        } else {
            bump(last_wall, last_logical)
        };

        *last = next;
        HybridTimestamp::new(next.0, next.1, self.node_id.clone())
    }

    /// Advances past a timestamp received from another replica and returns
    /// a timestamp greater than both it and every earlier local emission.
    pub fn observe(&self, remote: &HybridTimestamp) -> HybridTimestamp {
        let wall = self.wall_clock.now_millis();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let (last_wall, last_logical) = *last;
        let (remote_wall, remote_logical) = (remote.wall_time(), remote.logical());

        let max_wall = wall.max(last_wall).max(remote_wall);

        let next = if max_wall == last_wall && max_wall == remote_wall {
            bump(max_wall, last_logical.max(remote_logical))
        } else if max_wall == last_wall {
            bump(last_wall, last_logical)
        } else if max_wall == remote_wall {
            bump(remote_wall, remote_logical)
        } else {
            (max_wall, 0)
        };

        *last = next;
        HybridTimestamp::new(next.0, next.1, self.node_id.clone())
    }

    /// Returns the last emitted timestamp without advancing the clock.
    #[must_use]
    pub fn last(&self) -> HybridTimestamp {
        let last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        HybridTimestamp::new(last.0, last.1, self.node_id.clone())
    }
}

impl fmt::Debug for HybridLogicalClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridLogicalClock")
            .field("node_id", &self.node_id)
            .field("last", &self.last())
            .finish()
    }
}

/// Next (wall, logical) after `(wall, logical)`. An exhausted logical
/// counter carries into the physical component.
fn bump(wall: u64, logical: u32) -> (u64, u32) {
    match logical.checked_add(1) {
        Some(next) => (wall, next),
        None => (wall.saturating_add(1), 0),
    }
}
