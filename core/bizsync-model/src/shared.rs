use crate::{CrdtModel, ModelResult};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// An entity shared between threads of one process.
///
/// Every operation holds the lock for its whole duration, so a local edit and
/// an incoming merge never interleave field by field. Clones share the same
/// entity.
#[derive(Debug)]
pub struct SharedEntity<M> {
    inner: Arc<Mutex<M>>,
}

impl<M> Clone for SharedEntity<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: CrdtModel> SharedEntity<M> {
    pub fn new(entity: M) -> Self {
        Self {
            inner: Arc::new(Mutex::new(entity)),
        }
    }

    // Poisoning is ignored; primitives are never left half-updated.
    fn lock(&self) -> MutexGuard<'_, M> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with shared access to the entity.
    pub fn read<R>(&self, f: impl FnOnce(&M) -> R) -> R {
        f(&self.lock())
    }

    /// Runs a local mutation under the lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut M) -> R) -> R {
        f(&mut self.lock())
    }

    /// Merges a remote replica into the shared entity.
    pub fn merge_with(&self, other: &M) -> ModelResult<()> {
        self.lock().merge_with(other)
    }

    /// Decodes and merges a persisted blob.
    pub fn merge_crdt_json(&self, json: &str) -> ModelResult<()> {
        // Decode outside the lock; only the merge itself needs exclusion.
        let remote = M::from_crdt_json(json)?;
        self.merge_with(&remote)
    }

    /// A point-in-time copy of the entity.
    pub fn snapshot(&self) -> M {
        self.lock().clone()
    }

    /// Serializes the current state.
    pub fn to_crdt_json(&self) -> ModelResult<String> {
        self.lock().to_crdt_json()
    }
}

impl<M: CrdtModel> From<M> for SharedEntity<M> {
    fn from(entity: M) -> Self {
        Self::new(entity)
    }
}
