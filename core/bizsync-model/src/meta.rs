use crate::{ModelError, ModelResult};
use bizsync_crdt::VectorClock;
use bizsync_types::{EntityId, HybridLogicalClock, HybridTimestamp, NodeId};
use serde::{Deserialize, Serialize};

/// Replication metadata shared by every entity.
///
/// `id`, `entity_type`, `node_id` and `created_at` are fixed at creation.
/// `updated_at` and `version` advance with every local write and merge, and
/// `is_deleted` only ever goes from false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta {
    id: EntityId,
    entity_type: String,
    /// Node that created the entity.
    node_id: NodeId,
    created_at: HybridTimestamp,
    updated_at: HybridTimestamp,
    version: VectorClock,
    is_deleted: bool,
}

impl EntityMeta {
    /// Metadata for a new entity created on `clock`'s node.
    pub fn new(id: EntityId, entity_type: &str, clock: &HybridLogicalClock) -> Self {
        let created_at = clock.now();
        let mut version = VectorClock::new(clock.node_id().clone());
        version.tick();

        Self {
            id,
            entity_type: entity_type.to_owned(),
            node_id: clock.node_id().clone(),
            updated_at: created_at.clone(),
            created_at,
            version,
            is_deleted: false,
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn created_at(&self) -> &HybridTimestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &HybridTimestamp {
        &self.updated_at
    }

    pub fn version(&self) -> &VectorClock {
        &self.version
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    /// Fails unless `other` describes the same entity.
    pub fn ensure_same_entity(&self, other: &Self) -> ModelResult<()> {
        if self.id != other.id || self.entity_type != other.entity_type {
            return Err(ModelError::MismatchedEntity {
                expected: format!("{} {}", self.entity_type, self.id),
                found: format!("{} {}", other.entity_type, other.id),
            });
        }
        Ok(())
    }

    /// Advances the metadata for a local write and returns the write's timestamp.
    ///
    /// The timestamp is issued after observing `updated_at`, so it exceeds
    /// every field timestamp this entity holds.
    pub fn record_local_write(&mut self, clock: &HybridLogicalClock) -> HybridTimestamp {
        let ts = clock.observe(&self.updated_at);
        if self.version.node_id() != clock.node_id() {
            self.version.rebind(clock.node_id().clone());
        }
        self.version.tick();
        self.updated_at = ts.clone();
        ts
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.is_deleted = true;
    }

    pub(crate) fn rebind(&mut self, node_id: &NodeId) {
        self.version.rebind(node_id.clone());
    }

    /// Merges metadata of the same entity. Identity must already be checked.
    pub(crate) fn merge(&mut self, other: &Self) {
        self.version.update(&other.version);
        if other.updated_at > self.updated_at {
            self.updated_at = other.updated_at.clone();
        }
        if other.created_at < self.created_at {
            self.created_at = other.created_at.clone();
            self.node_id = other.node_id.clone();
        }
        self.is_deleted |= other.is_deleted;
    }

    /// Checks invariants a decoded blob must satisfy.
    pub(crate) fn validate(&self, expected_type: &str) -> ModelResult<()> {
        if self.entity_type != expected_type {
            return Err(ModelError::Malformed(format!(
                "entity {} has type {:?}, expected {:?}",
                self.id, self.entity_type, expected_type
            )));
        }
        if self.created_at.node_id() != &self.node_id {
            return Err(ModelError::Malformed(format!(
                "entity {} was created at {} but claims creator {}",
                self.id, self.created_at, self.node_id
            )));
        }
        if self.updated_at < self.created_at {
            return Err(ModelError::Malformed(format!(
                "entity {} was updated at {} before its creation at {}",
                self.id, self.updated_at, self.created_at
            )));
        }
        if self.version.is_empty() {
            return Err(ModelError::Malformed(format!(
                "entity {} has an empty version history",
                self.id
            )));
        }
        Ok(())
    }

    /// Rejects a field write stamped later than the entity's last update.
    ///
    /// Every local write advances `updated_at` to its own timestamp and merges
    /// keep the maximum, so no honest field can be newer.
    pub fn ensure_not_after_update(&self, field: &str, written_at: &HybridTimestamp) -> ModelResult<()> {
        if written_at > &self.updated_at {
            return Err(ModelError::Malformed(format!(
                "entity {} field {} was written at {} after the last update at {}",
                self.id, field, written_at, self.updated_at
            )));
        }
        Ok(())
    }
}
