//! Replicated business entities for BizSync.
//!
//! An entity is [`EntityMeta`] plus fields wrapped in the primitives of
//! `bizsync-crdt`. The [`CrdtModel`] trait turns per-field merges into a
//! whole-entity merge that is safe to apply in any order, any number of
//! times. [`Employee`] and [`PayrollRecord`] are the concrete entities;
//! [`SharedEntity`] and [`merge_batch`] are the pieces a persistence layer
//! plugs into.

mod batch;
mod employee;
mod error;
mod meta;
mod model;
mod payroll;
mod shared;

pub use batch::{MergeFailure, MergeReport, merge_batch, merge_batch_json};
pub use employee::Employee;
pub use error::{ModelError, ModelResult};
pub use meta::EntityMeta;
pub use model::{CrdtModel, merge_crdt_json};
pub use payroll::{PayrollRecord, PayrollStatus};
pub use shared::SharedEntity;
