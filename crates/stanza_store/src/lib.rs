//! Persisted build state: what the previous run knew.
//!
//! Four stores survive between runs, all under the configured state
//! directory: document fingerprints, recorded action memories, the typed
//! dependency graph, and cached compiled content. Every store loads
//! fail-safe (a missing, corrupt, or incompatible file is an empty store,
//! never an error) and is written back in one piece at the end of a
//! successful run.

#![warn(missing_docs)]

pub mod actions;
pub mod content_cache;
pub mod dependency;
pub mod error;
pub mod fingerprint;
pub mod persist;
pub mod props;
pub mod stores;

pub use actions::{Action, ActionKey, ActionSequence, ActionStore};
pub use content_cache::{ContentCache, SnapshotMap};
pub use dependency::DependencyStore;
pub use error::StoreError;
pub use fingerprint::FingerprintStore;
pub use props::DepProps;
pub use stores::Stores;
