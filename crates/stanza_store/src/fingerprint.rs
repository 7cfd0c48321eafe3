//! The persisted map from entities to their last-known fingerprints.

use crate::error::StoreError;
use crate::persist;
use serde::{Deserialize, Serialize};
use stanza_common::{EntityRef, Fingerprint};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

const FINGERPRINTS_FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct FingerprintEntry {
    entity: EntityRef,
    fingerprint: Fingerprint,
}

/// Fingerprints recorded at the end of the previous successful run.
///
/// An entity with no entry here has never been seen complete, and is
/// treated as changed.
#[derive(Debug)]
pub struct FingerprintStore {
    entries: BTreeMap<EntityRef, Fingerprint>,
    path: PathBuf,
}

impl FingerprintStore {
    /// Loads the store from `path`, or creates an empty one if the file
    /// is missing or unusable.
    pub fn load_or_create(path: &Path) -> Self {
        let entries = persist::load_json::<Vec<FingerprintEntry>>(path, FINGERPRINTS_FORMAT_VERSION)
            .map(|entries| {
                entries
                    .into_iter()
                    .map(|entry| (entry.entity, entry.fingerprint))
                    .collect()
            })
            .unwrap_or_default();
        FingerprintStore {
            entries,
            path: path.to_path_buf(),
        }
    }

    /// The stored fingerprint for an entity, if any.
    pub fn get(&self, entity: &EntityRef) -> Option<Fingerprint> {
        self.entries.get(entity).copied()
    }

    /// Records an entity's fingerprint, replacing any previous one.
    pub fn insert(&mut self, entity: EntityRef, fingerprint: Fingerprint) {
        self.entries.insert(entity, fingerprint);
    }

    /// Drops every entry whose entity is not in `keep`.
    pub fn retain(&mut self, keep: &HashSet<EntityRef>) {
        self.entries.retain(|entity, _| keep.contains(entity));
    }

    /// The number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the store to disk.
    pub fn save(&self) -> Result<(), StoreError> {
        let entries: Vec<FingerprintEntry> = self
            .entries
            .iter()
            .map(|(entity, fingerprint)| FingerprintEntry {
                entity: entity.clone(),
                fingerprint: *fingerprint,
            })
            .collect();
        persist::save_json(&self.path, FINGERPRINTS_FORMAT_VERSION, &entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stanza_common::{Checksum, Identifier};

    fn fp(attrs: &[u8], content: &[u8]) -> Fingerprint {
        Fingerprint {
            attributes: Checksum::from_bytes(attrs),
            content: Checksum::from_bytes(content),
        }
    }

    #[test]
    fn round_trip_preserves_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fingerprints.json");

        let mut store = FingerprintStore::load_or_create(&path);
        store.insert(EntityRef::Item(Identifier::new("/a.md")), fp(b"a", b"1"));
        store.insert(EntityRef::Config, fp(b"c", b"2"));
        store.save().unwrap();

        let reloaded = FingerprintStore::load_or_create(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.get(&EntityRef::Item(Identifier::new("/a.md"))),
            Some(fp(b"a", b"1"))
        );
        assert_eq!(reloaded.get(&EntityRef::Config), Some(fp(b"c", b"2")));
    }

    #[test]
    fn unknown_entity_has_no_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let store = FingerprintStore::load_or_create(&dir.path().join("fp.json"));
        assert_eq!(store.get(&EntityRef::Item(Identifier::new("/new.md"))), None);
    }

    #[test]
    fn retain_drops_vanished_entities() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FingerprintStore::load_or_create(&dir.path().join("fp.json"));
        store.insert(EntityRef::Item(Identifier::new("/keep.md")), fp(b"a", b"1"));
        store.insert(EntityRef::Item(Identifier::new("/gone.md")), fp(b"b", b"2"));

        let mut keep = HashSet::new();
        keep.insert(EntityRef::Item(Identifier::new("/keep.md")));
        store.retain(&keep);

        assert_eq!(store.len(), 1);
        assert!(store.get(&EntityRef::Item(Identifier::new("/gone.md"))).is_none());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fp.json");
        std::fs::write(&path, "{ definitely not an envelope").unwrap();
        let store = FingerprintStore::load_or_create(&path);
        assert!(store.is_empty());
    }
}
