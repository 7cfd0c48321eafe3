//! Item representations and the per-run set that owns them.
//!
//! Each item is compiled into one or more representations (reps). A rep
//! accumulates named snapshots of its content as its program runs; the
//! reserved snapshot name `last` is the working slot that always tracks the
//! most recent filter output, while every other name freezes the content
//! present at capture time.

use crate::content::Content;
use crate::document::Document;
use crate::ids::{DocumentId, RepId};
use crate::{Arena, ArenaId};
use serde::{Deserialize, Serialize};
use stanza_common::{Identifier, RepName, RepRef};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

/// The name of a content snapshot within a representation.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotName(String);

impl SnapshotName {
    /// Creates a snapshot name.
    pub fn new(value: impl Into<String>) -> Self {
        SnapshotName(value.into())
    }

    /// The reserved working-slot name, `last`.
    pub fn last() -> Self {
        SnapshotName::new("last")
    }

    /// The conventional pre-layout snapshot name, `pre`.
    pub fn pre() -> Self {
        SnapshotName::new("pre")
    }

    /// Returns `true` if this is the reserved `last` name.
    pub fn is_last(&self) -> bool {
        self.0 == "last"
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One representation of one item.
#[derive(Clone, Debug)]
pub struct ItemRep {
    id: RepId,
    item: DocumentId,
    item_identifier: Identifier,
    name: RepName,
    snapshots: BTreeMap<SnapshotName, Content>,
    raw_paths: BTreeMap<SnapshotName, PathBuf>,
    compiled: bool,
    orphan: bool,
}

impl ItemRep {
    fn new(
        id: RepId,
        item: DocumentId,
        item_identifier: Identifier,
        name: RepName,
        orphan: bool,
    ) -> Self {
        ItemRep {
            id,
            item,
            item_identifier,
            name,
            snapshots: BTreeMap::new(),
            raw_paths: BTreeMap::new(),
            compiled: false,
            orphan,
        }
    }

    /// The rep's ID within its set.
    pub fn id(&self) -> RepId {
        self.id
    }

    /// The owning item's document ID.
    pub fn item(&self) -> DocumentId {
        self.item
    }

    /// The owning item's identifier.
    pub fn item_identifier(&self) -> &Identifier {
        &self.item_identifier
    }

    /// The representation name.
    pub fn name(&self) -> &RepName {
        &self.name
    }

    /// The persisted reference form of this rep.
    pub fn rep_ref(&self) -> RepRef {
        RepRef::new(self.item_identifier.clone(), self.name.clone())
    }

    /// Whether this rep came from a stale store entry rather than the
    /// current run's rules. Orphans are never compiled or written; they
    /// exist so their store entries can be pruned.
    pub fn is_orphan(&self) -> bool {
        self.orphan
    }

    /// Whether this rep has finished compiling (or was restored from
    /// cache) this run.
    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    /// Marks the rep as compiled.
    pub fn mark_compiled(&mut self) {
        self.compiled = true;
    }

    /// Resets the rep to the start of its program: the `last` slot holds
    /// `initial` and every captured snapshot is discarded. Used both for a
    /// first compilation attempt and for a retry after a deferral.
    pub fn begin_compilation(&mut self, initial: Content) {
        self.snapshots.clear();
        self.snapshots.insert(SnapshotName::last(), initial);
    }

    /// The current working content.
    ///
    /// # Panics
    ///
    /// Panics if compilation has not begun and the rep was not restored
    /// from cache.
    pub fn last(&self) -> &Content {
        &self.snapshots[&SnapshotName::last()]
    }

    /// Replaces the working content.
    pub fn set_last(&mut self, content: Content) {
        self.snapshots.insert(SnapshotName::last(), content);
    }

    /// Returns `true` if a snapshot with this name has been captured.
    pub fn has_snapshot(&self, name: &SnapshotName) -> bool {
        self.snapshots.contains_key(name)
    }

    /// Captures the working content under `name`.
    ///
    /// Callers are responsible for rejecting duplicate captures first;
    /// capturing over an existing name replaces it silently.
    ///
    /// # Panics
    ///
    /// Panics if compilation has not begun.
    pub fn capture_snapshot(&mut self, name: SnapshotName) {
        let current = self.last().clone();
        self.snapshots.insert(name, current);
    }

    /// Looks up a captured snapshot (or the working slot) by name.
    pub fn snapshot(&self, name: &SnapshotName) -> Option<&Content> {
        self.snapshots.get(name)
    }

    /// All snapshots, including the working slot.
    pub fn snapshots(&self) -> &BTreeMap<SnapshotName, Content> {
        &self.snapshots
    }

    /// Replaces all snapshots with cached ones and marks the rep compiled.
    pub fn restore(&mut self, snapshots: BTreeMap<SnapshotName, Content>) {
        self.snapshots = snapshots;
        self.compiled = true;
    }

    /// Output paths declared for this rep, keyed by snapshot name.
    pub fn raw_paths(&self) -> &BTreeMap<SnapshotName, PathBuf> {
        &self.raw_paths
    }

    /// Sets the declared output paths.
    pub fn set_raw_paths(&mut self, raw_paths: BTreeMap<SnapshotName, PathBuf>) {
        self.raw_paths = raw_paths;
    }

    /// The rep's primary output path: the `last` snapshot's path when
    /// declared, otherwise the first declared path.
    pub fn output_path(&self) -> Option<&Path> {
        self.raw_paths
            .get(&SnapshotName::last())
            .or_else(|| self.raw_paths.values().next())
            .map(PathBuf::as_path)
    }
}

/// The set of all representations for one run.
#[derive(Debug, Default)]
pub struct RepSet {
    reps: Arena<RepId, ItemRep>,
    by_item: HashMap<DocumentId, Vec<RepId>>,
    by_name: HashMap<(DocumentId, RepName), RepId>,
}

impl RepSet {
    /// Creates an empty rep set.
    pub fn new() -> Self {
        RepSet::default()
    }

    /// Adds a representation for an item.
    ///
    /// # Panics
    ///
    /// Panics if the item already has a rep with this name.
    pub fn add(&mut self, item: &Document, name: RepName) -> RepId {
        self.insert(item, name, false)
    }

    /// Adds an orphan representation, known only from stale store entries.
    ///
    /// # Panics
    ///
    /// Panics if the item already has a rep with this name.
    pub fn add_orphan(&mut self, item: &Document, name: RepName) -> RepId {
        self.insert(item, name, true)
    }

    fn insert(&mut self, item: &Document, name: RepName, orphan: bool) -> RepId {
        let key = (item.id(), name.clone());
        assert!(
            !self.by_name.contains_key(&key),
            "duplicate rep '{}' for item {}",
            name,
            item.identifier()
        );
        let id = RepId::from_raw(self.reps.len() as u32);
        let rep = ItemRep::new(id, item.id(), item.identifier().clone(), name, orphan);
        self.reps.alloc(rep);
        self.by_item.entry(item.id()).or_default().push(id);
        self.by_name.insert(key, id);
        id
    }

    /// Returns the rep with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    pub fn rep(&self, id: RepId) -> &ItemRep {
        self.reps.get(id)
    }

    /// Returns the rep with the given ID, mutably.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    pub fn rep_mut(&mut self, id: RepId) -> &mut ItemRep {
        self.reps.get_mut(id)
    }

    /// All rep IDs belonging to an item, in insertion order.
    pub fn for_item(&self, item: DocumentId) -> &[RepId] {
        self.by_item.get(&item).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Looks up a rep by owning item and name.
    pub fn find(&self, item: DocumentId, name: &RepName) -> Option<RepId> {
        self.by_name.get(&(item, name.clone())).copied()
    }

    /// Iterates over all reps in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (RepId, &ItemRep)> {
        self.reps.iter()
    }

    /// IDs of all non-orphan reps, in insertion order.
    pub fn live_ids(&self) -> Vec<RepId> {
        self.reps
            .iter()
            .filter(|(_, rep)| !rep.is_orphan())
            .map(|(id, _)| id)
            .collect()
    }

    /// The number of reps, orphans included.
    pub fn len(&self) -> usize {
        self.reps.len()
    }

    /// Returns `true` if the set contains no reps.
    pub fn is_empty(&self) -> bool {
        self.reps.is_empty()
    }
}
