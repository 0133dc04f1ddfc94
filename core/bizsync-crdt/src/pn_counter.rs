//! Positive-Negative Counter CRDT.
//!
//! A PN-Counter supports both increment and decrement operations across
//! distributed nodes. It uses two internal ledgers (increments and
//! decrements) keyed by node id. The value is
//! `sum(increments) - sum(decrements)`.
//!
//! Satisfies commutativity, associativity, and idempotency for merge.

use crate::Crdt;
use bizsync_types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A Positive-Negative Counter CRDT.
///
/// Each node tracks its own increments and decrements independently and
/// only ever grows its own ledgers: [`increment`](Self::increment) and
/// [`decrement`](Self::decrement) write to the owner's entry, and there is
/// no way to write another node's entry except by merging that node's state.
///
/// # Single-writer recompute
///
/// [`reset`](Self::reset) and [`set_to`](Self::set_to) model a recomputed
/// total (e.g. a payroll gross recomputed from its inputs), not a CRDT
/// reset. They append a compensating delta to the owner's ledger, so they
/// never discard another node's increments and remain merge-safe. They are
/// only *meaningful* for fields written exclusively by one node's
/// recomputation pass: on a field that also receives concurrent adjustments
/// from other nodes (a shared leave balance, say), the merged value would be
/// the recomputed total plus those adjustments. The type cannot detect that
/// misuse; keep recompute-only fields single-writer by convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PNCounter {
    node_id: NodeId,
    increments: BTreeMap<NodeId, u64>,
    decrements: BTreeMap<NodeId, u64>,
}

impl PNCounter {
    /// Creates a counter with value 0, owned by `node_id`.
    #[must_use]
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            increments: BTreeMap::new(),
            decrements: BTreeMap::new(),
        }
    }

    /// The owning node.
    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Re-homes the counter on `node_id`. Ledgers are untouched.
    pub fn rebind(&mut self, node_id: NodeId) {
        self.node_id = node_id;
    }

    /// Increments the counter by `amount` on the owner's ledger.
    pub fn increment(&mut self, amount: u64) {
        add_to(&mut self.increments, &self.node_id, amount);
    }

    /// Decrements the counter by `amount` on the owner's ledger.
    pub fn decrement(&mut self, amount: u64) {
        add_to(&mut self.decrements, &self.node_id, amount);
    }

    /// Returns the current counter value (may be negative).
    #[must_use]
    pub fn value(&self) -> i64 {
        let pos: i128 = self.increments.values().map(|&v| i128::from(v)).sum();
        let neg: i128 = self.decrements.values().map(|&v| i128::from(v)).sum();
        (pos - neg).clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
    }

    /// Total increments recorded by `node_id`.
    #[must_use]
    pub fn increments_of(&self, node_id: &NodeId) -> u64 {
        self.increments.get(node_id).copied().unwrap_or(0)
    }

    /// Total decrements recorded by `node_id`.
    #[must_use]
    pub fn decrements_of(&self, node_id: &NodeId) -> u64 {
        self.decrements.get(node_id).copied().unwrap_or(0)
    }

    /// Brings the observed value back to 0. Single-writer only; see the type docs.
    pub fn reset(&mut self) {
        self.set_to(0);
    }

    /// Moves the observed value to `target`. Single-writer only; see the type docs.
    pub fn set_to(&mut self, target: i64) {
        let delta = i128::from(target) - i128::from(self.value());
        let magnitude = u64::try_from(delta.unsigned_abs()).unwrap_or(u64::MAX);
        if delta > 0 {
            self.increment(magnitude);
        } else if delta < 0 {
            self.decrement(magnitude);
        }
    }
}

fn add_to(ledger: &mut BTreeMap<NodeId, u64>, node_id: &NodeId, amount: u64) {
    if amount == 0 {
        return;
    }
    let entry = ledger.entry(node_id.clone()).or_insert(0);
    *entry = entry.saturating_add(amount);
}

fn merge_ledger(into: &mut BTreeMap<NodeId, u64>, from: &BTreeMap<NodeId, u64>) {
    for (node_id, &count) in from {
        let entry = into.entry(node_id.clone()).or_insert(0);
        *entry = (*entry).max(count);
    }
}

impl Crdt for PNCounter {
    /// Takes the per-node maximum of both ledgers.
    fn merge_with(&mut self, other: &Self) {
        merge_ledger(&mut self.increments, &other.increments);
        merge_ledger(&mut self.decrements, &other.decrements);
    }
}

impl PartialEq for PNCounter {
    fn eq(&self, other: &Self) -> bool {
        // Per-node ledgers must match; a missing entry equals an explicit 0.
        ledgers_eq(&self.increments, &other.increments)
            && ledgers_eq(&self.decrements, &other.decrements)
    }
}

impl Eq for PNCounter {}

fn ledgers_eq(a: &BTreeMap<NodeId, u64>, b: &BTreeMap<NodeId, u64>) -> bool {
    a.keys().chain(b.keys()).all(|node| {
        a.get(node).copied().unwrap_or(0) == b.get(node).copied().unwrap_or(0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(n: u8) -> NodeId {
        NodeId::parse(&format!("node-{n}")).unwrap()
    }

    fn counter(n: u8) -> PNCounter {
        PNCounter::new(node(n))
    }

    #[test]
    fn new_counter_is_zero() {
        assert_eq!(counter(1).value(), 0);
    }

    #[test]
    fn increment_increases_value() {
        let mut c = counter(1);
        c.increment(5);
        assert_eq!(c.value(), 5);
        c.increment(3);
        assert_eq!(c.value(), 8);
    }

    #[test]
    fn decrement_decreases_value() {
        let mut c = counter(1);
        c.increment(10);
        c.decrement(3);
        assert_eq!(c.value(), 7);
    }

    #[test]
    fn value_can_go_negative() {
        let mut c = counter(1);
        c.decrement(5);
        assert_eq!(c.value(), -5);
    }

    #[test]
    fn mutations_only_touch_owner_ledger() {
        let mut a = counter(1);
        a.increment(4);
        a.decrement(1);
        assert_eq!(a.increments_of(&node(1)), 4);
        assert_eq!(a.decrements_of(&node(1)), 1);
        assert_eq!(a.increments_of(&node(2)), 0);
    }

    #[test]
    fn zero_amounts_leave_no_entry() {
        let mut c = counter(1);
        c.increment(0);
        c.decrement(0);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, r#"{"node_id":"node-1","increments":{},"decrements":{}}"#);
    }

    #[test]
    fn merge_takes_max_per_node() {
        let mut a = counter(1);
        a.increment(5);
        let mut stale = counter(1);
        stale.increment(3);

        let merged = a.merged(&stale);
        assert_eq!(merged.value(), 5);
    }

    #[test]
    fn merge_takes_max_for_decrements_too() {
        let mut a = counter(1);
        a.decrement(10);
        let mut stale = counter(1);
        stale.decrement(3);

        assert_eq!(a.merged(&stale).value(), -10);
    }

    #[test]
    fn merge_keeps_owner() {
        let a = counter(1);
        let b = counter(2);
        assert_eq!(a.merged(&b).node_id(), &node(1));
    }

    #[test]
    fn equality_ignores_owner() {
        assert_eq!(counter(1), counter(2));
    }

    #[test]
    fn equality_checks_per_node_not_just_value() {
        let mut a = counter(1);
        a.increment(5);
        let mut b = counter(2);
        b.increment(5);
        assert_eq!(a.value(), b.value());
        assert_ne!(a, b);
    }

    #[test]
    fn reset_compensates_on_own_ledger() {
        let mut c = counter(1);
        c.increment(7);
        c.reset();
        assert_eq!(c.value(), 0);
        assert_eq!(c.increments_of(&node(1)), 7);
        assert_eq!(c.decrements_of(&node(1)), 7);
    }

    #[test]
    fn reset_of_negative_value() {
        let mut c = counter(1);
        c.decrement(4);
        c.reset();
        assert_eq!(c.value(), 0);
        assert_eq!(c.increments_of(&node(1)), 4);
    }

    #[test]
    fn set_to_moves_value_both_ways() {
        let mut c = counter(1);
        c.set_to(1_500);
        assert_eq!(c.value(), 1_500);
        c.set_to(1_200);
        assert_eq!(c.value(), 1_200);
        c.set_to(-20);
        assert_eq!(c.value(), -20);
    }

    #[test]
    fn reset_survives_merge_with_stale_copy() {
        let mut c = counter(1);
        c.increment(9);
        let stale = c.clone();
        c.reset();
        c.merge_with(&stale);
        assert_eq!(c.value(), 0);
    }

    #[test]
    fn reset_never_discards_foreign_increments() {
        let mut a = counter(1);
        a.increment(10);
        let mut b = a.clone();
        b.rebind(node(2));

        a.reset();
        b.increment(3);

        a.merge_with(&b);
        assert_eq!(a.value(), 3);
    }

    #[test]
    fn value_saturates_instead_of_overflowing() {
        let mut a = counter(1);
        a.increment(u64::MAX);
        let mut b = counter(2);
        b.increment(u64::MAX);
        a.merge_with(&b);
        assert_eq!(a.value(), i64::MAX);
    }
}
