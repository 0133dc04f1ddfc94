//! Observed-Remove Set (OR-Set / Add-Wins Set).
//!
//! A CRDT set that supports both add and remove operations. Unlike naive
//! two-phase sets, concurrent add and remove of the same element results in
//! the element being present (add-wins semantics).
//!
//! Each add operation is tagged with the hybrid timestamp of the write. A
//! remove tombstones only the tags the removing replica has observed. An
//! element is in the set if it has at least one tag that hasn't been
//! tombstoned.
//!
//! Use cases:
//! - Skill and certification lists on an employee
//! - Free-form labels and notes attached to a payroll run

use crate::Crdt;
use bizsync_types::{HybridTimestamp, NodeId};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A unique tag identifying a specific add operation.
///
/// The tag is the hybrid timestamp of the write that performed the add.
/// A node's clock never issues the same timestamp twice, so every copy of a
/// set held by that node mints distinct tags.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(HybridTimestamp);

impl Tag {
    #[must_use]
    pub fn new(timestamp: HybridTimestamp) -> Self {
        Self(timestamp)
    }

    /// The node that performed the add.
    #[must_use]
    pub fn node(&self) -> &NodeId {
        self.0.node_id()
    }

    /// When the add happened.
    #[must_use]
    pub fn timestamp(&self) -> &HybridTimestamp {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// An Observed-Remove Set (OR-Set).
///
/// Provides set semantics with add and remove operations that commute
/// properly. Add-wins: if an element is concurrently added and removed, it
/// remains in the set.
///
/// Tombstoned tags are pruned from the live entries, so `entries` only ever
/// holds live tags and elements without live tags are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ORSet<T>
where
    T: Ord + Clone,
{
    /// Map from element to its live tags.
    entries: BTreeMap<T, BTreeSet<Tag>>,
    /// Set of all removed tags (tombstones).
    tombstones: BTreeSet<Tag>,
}

impl<T> Default for ORSet<T>
where
    T: Ord + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ORSet<T>
where
    T: Ord + Clone,
{
    /// Creates a new empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            tombstones: BTreeSet::new(),
        }
    }

    /// Returns true if the set contains the element.
    #[must_use]
    pub fn contains(&self, element: &T) -> bool {
        self.entries.contains_key(element)
    }

    /// Returns the number of elements in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over the visible elements, in order.
    pub fn elements(&self) -> impl Iterator<Item = &T> {
        self.entries.keys()
    }

    /// Adds an element to the set, tagged with `timestamp`.
    ///
    /// `timestamp` must be freshly issued by the adding node's clock and not
    /// reused for another add. Adding an element that is already present
    /// adds another tag.
    pub fn add(&mut self, element: T, timestamp: HybridTimestamp) -> Tag {
        let tag = Tag::new(timestamp);
        self.entries.entry(element).or_default().insert(tag.clone());
        tag
    }

    /// Removes an element from the set.
    ///
    /// Tombstones every tag for the element this replica has observed.
    /// Concurrent adds with tags not yet seen here survive the merge.
    ///
    /// Returns the tags that were removed.
    pub fn remove(&mut self, element: &T) -> Vec<Tag> {
        let removed: Vec<Tag> = self
            .entries
            .remove(element)
            .map(|tags| tags.into_iter().collect())
            .unwrap_or_default();

        self.tombstones.extend(removed.iter().cloned());
        removed
    }

    /// Returns the live tags for an element.
    #[must_use]
    pub fn tags_for(&self, element: &T) -> Option<&BTreeSet<Tag>> {
        self.entries.get(element)
    }

    /// Returns all tombstones.
    #[must_use]
    pub fn tombstones(&self) -> &BTreeSet<Tag> {
        &self.tombstones
    }

    /// Returns the newest tag this replica has seen, live or tombstoned.
    #[must_use]
    pub fn latest_tag(&self) -> Option<&Tag> {
        self.entries
            .values()
            .filter_map(BTreeSet::last)
            .chain(self.tombstones.last())
            .max()
    }
}

impl<T> Crdt for ORSet<T>
where
    T: Ord + Clone,
{
    /// Unions tags and tombstones, then drops tombstoned tags.
    fn merge_with(&mut self, other: &Self) {
        self.tombstones.extend(other.tombstones.iter().cloned());

        for (element, other_tags) in &other.entries {
            self.entries
                .entry(element.clone())
                .or_default()
                .extend(other_tags.iter().cloned());
        }

        let tombstones = &self.tombstones;
        self.entries.retain(|_, tags| {
            tags.retain(|tag| !tombstones.contains(tag));
            !tags.is_empty()
        });
    }
}

// Elements are arbitrary values, so entries are encoded as a list rather
// than a JSON object keyed by element.
impl<T> Serialize for ORSet<T>
where
    T: Ord + Clone + Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Entry<'a, T> {
            element: &'a T,
            tags: &'a BTreeSet<Tag>,
        }

        #[derive(Serialize)]
        struct Repr<'a, T> {
            entries: Vec<Entry<'a, T>>,
            tombstones: &'a BTreeSet<Tag>,
        }

        Repr {
            entries: self
                .entries
                .iter()
                .map(|(element, tags)| Entry { element, tags })
                .collect(),
            tombstones: &self.tombstones,
        }
        .serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for ORSet<T>
where
    T: Ord + Clone + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Entry<T> {
            element: T,
            tags: BTreeSet<Tag>,
        }

        #[derive(Deserialize)]
        struct Repr<T> {
            entries: Vec<Entry<T>>,
            tombstones: BTreeSet<Tag>,
        }

        let repr = Repr::<T>::deserialize(deserializer)?;
        let mut entries = BTreeMap::new();
        let mut seen = BTreeSet::new();

        for entry in repr.entries {
            if entry.tags.is_empty() {
                return Err(de::Error::custom("or-set entry has no live tags"));
            }
            for tag in &entry.tags {
                if repr.tombstones.contains(tag) {
                    return Err(de::Error::custom(format!(
                        "or-set tag {tag} is both live and tombstoned"
                    )));
                }
                if !seen.insert(tag.clone()) {
                    return Err(de::Error::custom(format!(
                        "or-set tag {tag} is attached to two elements"
                    )));
                }
            }
            if entries.insert(entry.element, entry.tags).is_some() {
                return Err(de::Error::custom("or-set lists an element twice"));
            }
        }

        Ok(Self {
            entries,
            tombstones: repr.tombstones,
        })
    }
}
