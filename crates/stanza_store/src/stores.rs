//! The collected stores of one site, loaded and saved as a unit.

use crate::actions::ActionStore;
use crate::content_cache::ContentCache;
use crate::dependency::DependencyStore;
use crate::error::StoreError;
use crate::fingerprint::FingerprintStore;
use stanza_common::EntityRef;
use std::collections::HashSet;
use std::path::Path;

/// File name of the fingerprint store inside the state directory.
pub const FINGERPRINTS_FILE: &str = "fingerprints.json";
/// File name of the action store inside the state directory.
pub const ACTIONS_FILE: &str = "actions.json";
/// File name of the dependency store inside the state directory.
pub const DEPENDENCIES_FILE: &str = "dependencies.json";
/// File name of the compiled-content cache inside the state directory.
pub const CONTENT_CACHE_FILE: &str = "content.cache";

/// Every persisted store of one site.
#[derive(Debug)]
pub struct Stores {
    /// Document and configuration fingerprints from the previous run.
    pub fingerprints: FingerprintStore,
    /// Action memories from the previous run.
    pub actions: ActionStore,
    /// The typed dependency graph.
    pub dependencies: DependencyStore,
    /// Compiled content from the previous run.
    pub cache: ContentCache,
}

impl Stores {
    /// Loads every store from `state_dir` against the given entity
    /// universe. Missing or unusable files load as empty stores.
    pub fn load_or_create(state_dir: &Path, universe: &HashSet<EntityRef>) -> Self {
        Stores {
            fingerprints: FingerprintStore::load_or_create(&state_dir.join(FINGERPRINTS_FILE)),
            actions: ActionStore::load_or_create(&state_dir.join(ACTIONS_FILE)),
            dependencies: DependencyStore::load_or_create(
                &state_dir.join(DEPENDENCIES_FILE),
                universe,
            ),
            cache: ContentCache::load_or_create(&state_dir.join(CONTENT_CACHE_FILE)),
        }
    }

    /// Writes every store back to disk.
    pub fn save_all(&self) -> Result<(), StoreError> {
        self.fingerprints.save()?;
        self.actions.save()?;
        self.dependencies.save()?;
        self.cache.save()
    }
}
