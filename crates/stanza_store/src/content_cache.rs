//! Compiled content cached between runs.
//!
//! A representation that is found up to date can skip compilation only if
//! its snapshots from the previous run are still available. Textual
//! snapshots are stored inline; binary snapshots are stored as paths and
//! the cache entry is only served while every referenced file still
//! exists.

use crate::error::StoreError;
use crate::persist;
use serde::{Deserialize, Serialize};
use stanza_common::RepRef;
use stanza_entities::{Content, SnapshotName};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

const CONTENT_CACHE_FORMAT_VERSION: u32 = 1;

/// All snapshots captured for one representation, keyed by name.
pub type SnapshotMap = BTreeMap<SnapshotName, Content>;

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    rep: RepRef,
    snapshots: SnapshotMap,
}

/// The compiled-content cache, persisted as a framed binary artifact.
#[derive(Debug)]
pub struct ContentCache {
    entries: BTreeMap<RepRef, SnapshotMap>,
    path: PathBuf,
}

impl ContentCache {
    /// Loads the cache from `path`, or creates an empty one if the file
    /// is missing or unusable.
    pub fn load_or_create(path: &Path) -> Self {
        let entries = persist::load_framed::<Vec<CacheEntry>>(path, CONTENT_CACHE_FORMAT_VERSION)
            .map(|entries| {
                entries
                    .into_iter()
                    .map(|entry| (entry.rep, entry.snapshots))
                    .collect()
            })
            .unwrap_or_default();
        ContentCache {
            entries,
            path: path.to_path_buf(),
        }
    }

    /// Returns the cached snapshots for `rep` if the entry is usable.
    ///
    /// An entry with a binary snapshot whose file has disappeared is
    /// treated as a miss.
    pub fn get(&self, rep: &RepRef) -> Option<&SnapshotMap> {
        let snapshots = self.entries.get(rep)?;
        let usable = snapshots.values().all(|content| match content {
            Content::Textual(_) => true,
            Content::Binary(path) => path.is_file(),
        });
        usable.then_some(snapshots)
    }

    /// Stores the snapshots for `rep`, replacing any previous entry.
    pub fn insert(&mut self, rep: RepRef, snapshots: SnapshotMap) {
        self.entries.insert(rep, snapshots);
    }

    /// Drops entries for representations no longer in `live`.
    pub fn retain(&mut self, live: &HashSet<RepRef>) {
        self.entries.retain(|rep, _| live.contains(rep));
    }

    /// The number of cached representations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the cache to disk.
    pub fn save(&self) -> Result<(), StoreError> {
        let entries: Vec<CacheEntry> = self
            .entries
            .iter()
            .map(|(rep, snapshots)| CacheEntry {
                rep: rep.clone(),
                snapshots: snapshots.clone(),
            })
            .collect();
        persist::save_framed(&self.path, CONTENT_CACHE_FORMAT_VERSION, &entries)
    }
}
