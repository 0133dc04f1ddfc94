use crate::{EntityMeta, ModelResult};
use bizsync_crdt::CausalOrder;
use bizsync_types::{EntityId, HybridLogicalClock, HybridTimestamp, NodeId};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Contract for a replicated business entity.
///
/// An entity is [`EntityMeta`] plus a set of fields, each wrapped in a CRDT.
/// Implementors provide the per-field merge and rebind; the provided methods
/// build the whole-entity merge from them. Because every step is itself a
/// commutative, associative and idempotent merge, so is
/// [`merge_with`](Self::merge_with).
///
/// Local mutators on implementors take the node's [`HybridLogicalClock`] and
/// start with [`local_write`](Self::local_write).
pub trait CrdtModel: Clone + Serialize + DeserializeOwned {
    /// Type tag stored in [`EntityMeta`] and checked on every merge and load.
    const ENTITY_TYPE: &'static str;

    fn meta(&self) -> &EntityMeta;

    fn meta_mut(&mut self) -> &mut EntityMeta;

    /// Merges every replicated field pairwise. Identity is already verified.
    fn merge_fields(&mut self, other: &Self);

    /// Re-homes every owned field on `node_id`.
    fn rebind_fields(&mut self, node_id: &NodeId);

    /// Checks that every field write is covered by the entity's metadata,
    /// typically with [`EntityMeta::ensure_not_after_update`].
    fn validate_fields(&self) -> ModelResult<()>;

    /// Flattened plain-value view for reporting and UI.
    fn to_json(&self) -> serde_json::Value;

    fn id(&self) -> &EntityId {
        self.meta().id()
    }

    /// The node that created the entity.
    fn node_id(&self) -> &NodeId {
        self.meta().node_id()
    }

    fn created_at(&self) -> &HybridTimestamp {
        self.meta().created_at()
    }

    fn updated_at(&self) -> &HybridTimestamp {
        self.meta().updated_at()
    }

    fn version(&self) -> &bizsync_crdt::VectorClock {
        self.meta().version()
    }

    fn is_deleted(&self) -> bool {
        self.meta().is_deleted()
    }

    /// Merges another replica of the same entity into this one.
    ///
    /// Fails with [`ModelError::MismatchedEntity`](crate::ModelError::MismatchedEntity)
    /// before anything is modified if `other` is a different entity.
    fn merge_with(&mut self, other: &Self) -> ModelResult<()> {
        self.meta().ensure_same_entity(other.meta())?;

        let order = self.causal_order(other);
        self.merge_fields(other);
        self.meta_mut().merge(other.meta());

        debug!(
            "Merged {} {} ({:?}, version {})",
            Self::ENTITY_TYPE,
            self.id(),
            order,
            self.version()
        );
        Ok(())
    }

    /// Returns the merge of this replica and another.
    fn merged(&self, other: &Self) -> ModelResult<Self> {
        let mut result = self.clone();
        result.merge_with(other)?;
        Ok(result)
    }

    /// Causal relation of this replica's history to another's.
    fn causal_order(&self, other: &Self) -> CausalOrder {
        self.version().compare(other.version())
    }

    /// Prepares a local mutation and returns its timestamp.
    ///
    /// Rebinds the entity to the clock's node if it was last owned by
    /// another replica, then advances `updated_at` and the version.
    fn local_write(&mut self, clock: &HybridLogicalClock) -> HybridTimestamp {
        if self.version().node_id() != clock.node_id() {
            self.rebind(clock.node_id());
        }
        self.meta_mut().record_local_write(clock)
    }

    /// Marks the entity deleted. Deletion is permanent and wins every merge.
    fn delete(&mut self, clock: &HybridLogicalClock) {
        self.local_write(clock);
        self.meta_mut().mark_deleted();
    }

    /// Re-homes the entity on `node_id`. Replicated state is unchanged.
    fn rebind(&mut self, node_id: &NodeId) {
        self.meta_mut().rebind(node_id);
        self.rebind_fields(node_id);
    }

    /// Full-fidelity serialization for persistence and replication.
    fn to_crdt_json(&self) -> ModelResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restores an entity from [`to_crdt_json`](Self::to_crdt_json) output.
    ///
    /// Corrupt or foreign blobs are rejected, never defaulted.
    fn from_crdt_json(json: &str) -> ModelResult<Self> {
        let entity: Self = serde_json::from_str(json)?;
        entity.meta().validate(Self::ENTITY_TYPE)?;
        entity.validate_fields()?;
        Ok(entity)
    }
}

/// Decodes a persisted blob and merges it into `local`.
///
/// Nothing is modified unless the blob decodes and names the same entity.
pub fn merge_crdt_json<M: CrdtModel>(local: &mut M, json: &str) -> ModelResult<()> {
    let remote = M::from_crdt_json(json)?;
    local.merge_with(&remote)
}
