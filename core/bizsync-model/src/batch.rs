//! Batch merge of incoming replicas into a local collection.
//!
//! Each incoming entity is merged on its own. A failure is logged, recorded
//! in the [`MergeReport`] and the rest of the batch continues; the failed
//! entity's local state is left exactly as it was.

use crate::CrdtModel;
use bizsync_types::EntityId;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One incoming entity that could not be merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeFailure {
    /// Position of the entity in the incoming batch.
    pub index: usize,
    /// Id of the entity, when it could be decoded.
    pub entity_id: Option<EntityId>,
    pub reason: String,
}

/// Outcome of a batch merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Ids merged into an existing local entity.
    pub merged: Vec<EntityId>,
    /// Ids that were new locally and inserted as received.
    pub inserted: Vec<EntityId>,
    pub failed: Vec<MergeFailure>,
}

impl MergeReport {
    /// Number of entities applied, merged or inserted.
    pub fn applied(&self) -> usize {
        self.merged.len() + self.inserted.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record_failure(&mut self, index: usize, entity_id: Option<EntityId>, reason: String) {
        warn!(
            "Rejected incoming entity #{} ({}): {}",
            index,
            entity_id.as_ref().map_or("undecodable", EntityId::as_str),
            reason
        );
        self.failed.push(MergeFailure {
            index,
            entity_id,
            reason,
        });
    }
}

/// Merges every incoming replica into `local`, keyed by entity id.
///
/// Unknown ids are inserted as received. The local node's ownership of an
/// inserted entity is established by its next
/// [`local_write`](CrdtModel::local_write).
pub fn merge_batch<M, I>(local: &mut BTreeMap<EntityId, M>, incoming: I) -> MergeReport
where
    M: CrdtModel,
    I: IntoIterator<Item = M>,
{
    let mut report = MergeReport::default();

    for (index, remote) in incoming.into_iter().enumerate() {
        let id = remote.id().clone();
        match local.get_mut(&id) {
            Some(existing) => match existing.merge_with(&remote) {
                Ok(()) => report.merged.push(id),
                Err(e) => report.record_failure(index, Some(id), e.to_string()),
            },
            None => {
                debug!("Inserting new {} {}", M::ENTITY_TYPE, id);
                local.insert(id.clone(), remote);
                report.inserted.push(id);
            }
        }
    }

    debug!(
        "Batch merge of {}: {} merged, {} inserted, {} failed",
        M::ENTITY_TYPE,
        report.merged.len(),
        report.inserted.len(),
        report.failed.len()
    );
    report
}

/// Like [`merge_batch`], for persisted blobs. Blobs that fail to decode are
/// recorded as failures without an id.
pub fn merge_batch_json<M, I, S>(local: &mut BTreeMap<EntityId, M>, blobs: I) -> MergeReport
where
    M: CrdtModel,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut decoded = Vec::new();
    let mut positions = Vec::new();
    let mut report = MergeReport::default();

    for (index, blob) in blobs.into_iter().enumerate() {
        match M::from_crdt_json(blob.as_ref()) {
            Ok(entity) => {
                decoded.push(entity);
                positions.push(index);
            }
            Err(e) => report.record_failure(index, None, e.to_string()),
        }
    }

    let merged = merge_batch(local, decoded);
    report.merged.extend(merged.merged);
    report.inserted.extend(merged.inserted);
    report
        .failed
        .extend(merged.failed.into_iter().map(|mut failure| {
            failure.index = positions[failure.index];
            failure
        }));
    report.failed.sort_by_key(|failure| failure.index);
    report
}
