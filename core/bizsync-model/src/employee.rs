use crate::{CrdtModel, EntityMeta, ModelResult};
use bizsync_crdt::{Crdt, LWWRegister, ORSet, PNCounter};
use bizsync_types::{EntityId, HybridLogicalClock, NodeId};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// An employee record.
///
/// Scalar profile fields are last-writer-wins. Skills are an add-wins set so
/// a skill added on one device is never dropped by a concurrent edit on
/// another. The leave balance is a PN-counter that every node may adjust.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    meta: EntityMeta,
    name: LWWRegister<String>,
    email: LWWRegister<Option<String>>,
    department: LWWRegister<Option<String>>,
    position: LWWRegister<Option<String>>,
    monthly_salary_cents: LWWRegister<i64>,
    skills: ORSet<String>,
    leave_balance_days: PNCounter,
}

impl Employee {
    /// Creates a new employee on `clock`'s node.
    pub fn create(id: EntityId, name: impl Into<String>, clock: &HybridLogicalClock) -> Self {
        let meta = EntityMeta::new(id, Self::ENTITY_TYPE, clock);
        let ts = meta.created_at().clone();
        let node = clock.node_id().clone();

        Self {
            meta,
            name: LWWRegister::new(name.into(), ts.clone()),
            email: LWWRegister::new(None, ts.clone()),
            department: LWWRegister::new(None, ts.clone()),
            position: LWWRegister::new(None, ts.clone()),
            monthly_salary_cents: LWWRegister::new(0, ts),
            skills: ORSet::new(),
            leave_balance_days: PNCounter::new(node),
        }
    }

    pub fn name(&self) -> &str {
        self.name.value()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.value().as_deref()
    }

    pub fn department(&self) -> Option<&str> {
        self.department.value().as_deref()
    }

    pub fn position(&self) -> Option<&str> {
        self.position.value().as_deref()
    }

    pub fn monthly_salary_cents(&self) -> i64 {
        *self.monthly_salary_cents.value()
    }

    pub fn skills(&self) -> impl Iterator<Item = &str> {
        self.skills.elements().map(String::as_str)
    }

    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.contains(&skill.to_owned())
    }

    pub fn leave_balance_days(&self) -> i64 {
        self.leave_balance_days.value()
    }

    /// The underlying skills set, for inspection.
    pub fn skills_set(&self) -> &ORSet<String> {
        &self.skills
    }

    /// The underlying name register, for inspection.
    pub fn name_register(&self) -> &LWWRegister<String> {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>, clock: &HybridLogicalClock) {
        let ts = self.local_write(clock);
        self.name.set_value(name.into(), ts);
    }

    pub fn set_email(&mut self, email: Option<String>, clock: &HybridLogicalClock) {
        let ts = self.local_write(clock);
        self.email.set_value(email, ts);
    }

    pub fn set_department(&mut self, department: Option<String>, clock: &HybridLogicalClock) {
        let ts = self.local_write(clock);
        self.department.set_value(department, ts);
    }

    pub fn set_position(&mut self, position: Option<String>, clock: &HybridLogicalClock) {
        let ts = self.local_write(clock);
        self.position.set_value(position, ts);
    }

    pub fn set_monthly_salary_cents(&mut self, cents: i64, clock: &HybridLogicalClock) {
        let ts = self.local_write(clock);
        self.monthly_salary_cents.set_value(cents, ts);
    }

    pub fn add_skill(&mut self, skill: impl Into<String>, clock: &HybridLogicalClock) {
        let ts = self.local_write(clock);
        self.skills.add(skill.into(), ts);
    }

    /// Removes a skill as currently observed. Returns false if it was absent.
    pub fn remove_skill(&mut self, skill: &str, clock: &HybridLogicalClock) -> bool {
        if !self.has_skill(skill) {
            return false;
        }
        self.local_write(clock);
        !self.skills.remove(&skill.to_owned()).is_empty()
    }

    /// Adds (positive) or deducts (negative) leave days. Safe for concurrent writers.
    pub fn adjust_leave_days(&mut self, delta: i64, clock: &HybridLogicalClock) {
        if delta == 0 {
            return;
        }
        self.local_write(clock);
        if delta > 0 {
            self.leave_balance_days.increment(delta.unsigned_abs());
        } else {
            self.leave_balance_days.decrement(delta.unsigned_abs());
        }
    }
}

impl CrdtModel for Employee {
    const ENTITY_TYPE: &'static str = "employee";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn merge_fields(&mut self, other: &Self) {
        self.name.merge_with(&other.name);
        self.email.merge_with(&other.email);
        self.department.merge_with(&other.department);
        self.position.merge_with(&other.position);
        self.monthly_salary_cents.merge_with(&other.monthly_salary_cents);
        self.skills.merge_with(&other.skills);
        self.leave_balance_days.merge_with(&other.leave_balance_days);
    }

    fn rebind_fields(&mut self, node_id: &NodeId) {
        self.leave_balance_days.rebind(node_id.clone());
    }

    fn validate_fields(&self) -> ModelResult<()> {
        let meta = &self.meta;
        meta.ensure_not_after_update("name", self.name.timestamp())?;
        meta.ensure_not_after_update("email", self.email.timestamp())?;
        meta.ensure_not_after_update("department", self.department.timestamp())?;
        meta.ensure_not_after_update("position", self.position.timestamp())?;
        meta.ensure_not_after_update("monthly_salary_cents", self.monthly_salary_cents.timestamp())?;
        if let Some(tag) = self.skills.latest_tag() {
            meta.ensure_not_after_update("skills", tag.timestamp())?;
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
            "name": self.name(),
            "email": self.email(),
            "department": self.department(),
            "position": self.position(),
            "monthly_salary_cents": self.monthly_salary_cents(),
            "skills": self.skills().collect::<Vec<_>>(),
            "leave_balance_days": self.leave_balance_days(),
        })
    }
}
