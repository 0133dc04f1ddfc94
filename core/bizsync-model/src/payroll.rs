use crate::{CrdtModel, EntityMeta, ModelResult};
use bizsync_crdt::{Crdt, LWWRegister, ORSet, PNCounter};
use bizsync_types::{EntityId, HybridLogicalClock, NodeId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// Lifecycle of a payroll run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayrollStatus {
    Draft,
    Approved,
    Paid,
    Void,
}

impl fmt::Display for PayrollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Paid => "paid",
            Self::Void => "void",
        };
        f.write_str(s)
    }
}

/// One employee's pay for one period.
///
/// Amounts are PN-counters so that concurrent adjustments (a bonus on one
/// device, a correction on another) add up instead of overwriting each other.
/// [`recompute`](Self::recompute) replaces the totals outright and must only
/// be run by one node at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRecord {
    meta: EntityMeta,
    employee_id: LWWRegister<EntityId>,
    period: LWWRegister<String>,
    status: LWWRegister<PayrollStatus>,
    gross_pay_cents: PNCounter,
    deductions_cents: PNCounter,
    notes: ORSet<String>,
}

impl PayrollRecord {
    /// Creates a draft record for `employee_id` in `period` (e.g. "2026-03").
    pub fn create(
        id: EntityId,
        employee_id: EntityId,
        period: impl Into<String>,
        clock: &HybridLogicalClock,
    ) -> Self {
        let meta = EntityMeta::new(id, Self::ENTITY_TYPE, clock);
        let ts = meta.created_at().clone();
        let node = clock.node_id().clone();

        Self {
            meta,
            employee_id: LWWRegister::new(employee_id, ts.clone()),
            period: LWWRegister::new(period.into(), ts.clone()),
            status: LWWRegister::new(PayrollStatus::Draft, ts),
            gross_pay_cents: PNCounter::new(node.clone()),
            deductions_cents: PNCounter::new(node),
            notes: ORSet::new(),
        }
    }

    pub fn employee_id(&self) -> &EntityId {
        self.employee_id.value()
    }

    pub fn period(&self) -> &str {
        self.period.value()
    }

    pub fn status(&self) -> PayrollStatus {
        *self.status.value()
    }

    pub fn gross_pay_cents(&self) -> i64 {
        self.gross_pay_cents.value()
    }

    pub fn deductions_cents(&self) -> i64 {
        self.deductions_cents.value()
    }

    /// Gross pay minus deductions, saturating at the `i64` bounds.
    pub fn net_pay_cents(&self) -> i64 {
        self.gross_pay_cents().saturating_sub(self.deductions_cents())
    }

    pub fn notes(&self) -> impl Iterator<Item = &str> {
        self.notes.elements().map(String::as_str)
    }

    pub fn set_status(&mut self, status: PayrollStatus, clock: &HybridLogicalClock) {
        let ts = self.local_write(clock);
        self.status.set_value(status, ts);
    }

    pub fn set_period(&mut self, period: impl Into<String>, clock: &HybridLogicalClock) {
        let ts = self.local_write(clock);
        self.period.set_value(period.into(), ts);
    }

    pub fn reassign(&mut self, employee_id: EntityId, clock: &HybridLogicalClock) {
        let ts = self.local_write(clock);
        self.employee_id.set_value(employee_id, ts);
    }

    /// Adds to gross pay (negative to claw back).
    pub fn adjust_gross(&mut self, delta: i64, clock: &HybridLogicalClock) {
        if delta == 0 {
            return;
        }
        self.local_write(clock);
        apply_delta(&mut self.gross_pay_cents, delta);
    }

    /// Adds to deductions (negative to refund).
    pub fn adjust_deductions(&mut self, delta: i64, clock: &HybridLogicalClock) {
        if delta == 0 {
            return;
        }
        self.local_write(clock);
        apply_delta(&mut self.deductions_cents, delta);
    }

    /// Replaces both totals with freshly computed figures.
    ///
    /// Implemented as compensating deltas on this node, so running it on two
    /// nodes concurrently double-counts the difference.
    pub fn recompute(&mut self, gross_cents: i64, deductions_cents: i64, clock: &HybridLogicalClock) {
        self.local_write(clock);
        self.gross_pay_cents.set_to(gross_cents);
        self.deductions_cents.set_to(deductions_cents);
    }

    pub fn add_note(&mut self, note: impl Into<String>, clock: &HybridLogicalClock) {
        let ts = self.local_write(clock);
        self.notes.add(note.into(), ts);
    }

    pub fn remove_note(&mut self, note: &str, clock: &HybridLogicalClock) -> bool {
        let note = note.to_owned();
        if !self.notes.contains(&note) {
            return false;
        }
        self.local_write(clock);
        !self.notes.remove(&note).is_empty()
    }
}

fn apply_delta(counter: &mut PNCounter, delta: i64) {
    if delta > 0 {
        counter.increment(delta.unsigned_abs());
    } else {
        counter.decrement(delta.unsigned_abs());
    }
}

impl CrdtModel for PayrollRecord {
    const ENTITY_TYPE: &'static str = "payroll_record";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn merge_fields(&mut self, other: &Self) {
        self.employee_id.merge_with(&other.employee_id);
        self.period.merge_with(&other.period);
        self.status.merge_with(&other.status);
        self.gross_pay_cents.merge_with(&other.gross_pay_cents);
        self.deductions_cents.merge_with(&other.deductions_cents);
        self.notes.merge_with(&other.notes);
    }

    fn rebind_fields(&mut self, node_id: &NodeId) {
        self.gross_pay_cents.rebind(node_id.clone());
        self.deductions_cents.rebind(node_id.clone());
    }

    fn validate_fields(&self) -> ModelResult<()> {
        let meta = &self.meta;
        meta.ensure_not_after_update("employee_id", self.employee_id.timestamp())?;
        meta.ensure_not_after_update("period", self.period.timestamp())?;
        meta.ensure_not_after_update("status", self.status.timestamp())?;
        if let Some(tag) = self.notes.latest_tag() {
            meta.ensure_not_after_update("notes", tag.timestamp())?;
        }
        Ok(())
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "id": self.id(),
            "entity_type": Self::ENTITY_TYPE,
            "node_id": self.node_id(),
            "created_at": self.created_at(),
            "updated_at": self.updated_at(),
            "version": self.version().to_string(),
            "is_deleted": self.is_deleted(),
            "employee_id": self.employee_id(),
            "period": self.period(),
            "status": self.status(),
            "gross_pay_cents": self.gross_pay_cents(),
            "deductions_cents": self.deductions_cents(),
            "net_pay_cents": self.net_pay_cents(),
            "notes": self.notes().collect::<Vec<_>>(),
        })
    }
}
