//! Recorded compilation programs and the store that persists them.
//!
//! Every representation compiles by replaying an [`ActionSequence`]: an
//! ordered list of filter, layout, and snapshot steps produced by the
//! rule layer. The sequence recorded for the previous run is compared
//! structurally against the freshly computed one; any difference means
//! the rep's rules changed and it must recompile.

use crate::error::StoreError;
use crate::persist;
use serde::{Deserialize, Serialize};
use stanza_common::{Attributes, Identifier, RepRef};
use stanza_entities::SnapshotName;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

const ACTIONS_FORMAT_VERSION: u32 = 1;

/// One step of a compilation program.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Run a named filter over the working content.
    Filter {
        /// Registered filter name.
        name: String,
        /// Arguments passed to the filter.
        params: Attributes,
    },
    /// Wrap the working content in the layout matching a pattern.
    Layout {
        /// Layout resolution pattern.
        pattern: String,
        /// Extra arguments merged over the layout's assigned filter
        /// arguments.
        params: Attributes,
    },
    /// Capture the working content under a name, optionally declaring an
    /// output path for it.
    Snapshot {
        /// Snapshot name.
        name: SnapshotName,
        /// Output path relative to the output directory, if this snapshot
        /// is written to disk.
        path: Option<PathBuf>,
    },
}

/// An ordered compilation program.
///
/// Sequences compare structurally: same steps, same order, same
/// parameters. Where they came from does not matter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionSequence {
    actions: Vec<Action>,
}

impl ActionSequence {
    /// Creates an empty sequence.
    pub fn new() -> Self {
        ActionSequence::default()
    }

    /// Appends a filter step.
    pub fn add_filter(&mut self, name: impl Into<String>, params: Attributes) {
        self.actions.push(Action::Filter {
            name: name.into(),
            params,
        });
    }

    /// Appends a layout step.
    pub fn add_layout(&mut self, pattern: impl Into<String>, params: Attributes) {
        self.actions.push(Action::Layout {
            pattern: pattern.into(),
            params,
        });
    }

    /// Appends a snapshot step.
    pub fn add_snapshot(&mut self, name: SnapshotName, path: Option<PathBuf>) {
        self.actions.push(Action::Snapshot { name, path });
    }

    /// The steps in order.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// The number of steps.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns `true` if the sequence has no steps.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// All output paths declared by snapshot steps, with the snapshot
    /// name each belongs to, in program order.
    pub fn declared_paths(&self) -> Vec<(SnapshotName, PathBuf)> {
        self.actions
            .iter()
            .filter_map(|action| match action {
                Action::Snapshot {
                    name,
                    path: Some(path),
                } => Some((name.clone(), path.clone())),
                _ => None,
            })
            .collect()
    }

    /// The first filter step, if any. Layout programs are expected to
    /// consist of a single filter step; this is how the executor finds it.
    pub fn first_filter(&self) -> Option<(&str, &Attributes)> {
        self.actions.iter().find_map(|action| match action {
            Action::Filter { name, params } => Some((name.as_str(), params)),
            _ => None,
        })
    }
}

/// What a stored action memory belongs to.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKey {
    /// The program of one item representation.
    Rep(RepRef),
    /// The filter assignment of one layout.
    Layout(Identifier),
}

#[derive(Serialize, Deserialize)]
struct ActionEntry {
    key: ActionKey,
    memory: ActionSequence,
}

/// The persisted map from reps and layouts to their recorded programs.
#[derive(Debug)]
pub struct ActionStore {
    entries: BTreeMap<ActionKey, ActionSequence>,
    path: PathBuf,
}

impl ActionStore {
    /// Loads the store from `path`, or creates an empty one if the file
    /// is missing or unusable.
    pub fn load_or_create(path: &Path) -> Self {
        let entries = persist::load_json::<Vec<ActionEntry>>(path, ACTIONS_FORMAT_VERSION)
            .map(|entries| {
                entries
                    .into_iter()
                    .map(|entry| (entry.key, entry.memory))
                    .collect()
            })
            .unwrap_or_default();
        ActionStore {
            entries,
            path: path.to_path_buf(),
        }
    }

    /// The recorded program for a key, if any.
    pub fn memory_for(&self, key: &ActionKey) -> Option<&ActionSequence> {
        self.entries.get(key)
    }

    /// Records the program for a key, replacing any previous one.
    pub fn set(&mut self, key: ActionKey, memory: ActionSequence) {
        self.entries.insert(key, memory);
    }

    /// Iterates over all stored keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &ActionKey> {
        self.entries.keys()
    }

    /// Drops every entry whose key is not in `keep`.
    pub fn retain(&mut self, keep: &HashSet<ActionKey>) {
        self.entries.retain(|key, _| keep.contains(key));
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
        let entries: Vec<ActionEntry> = self
            .entries
            .iter()
            .map(|(key, memory)| ActionEntry {
                key: key.clone(),
                memory: memory.clone(),
            })
            .collect();
        persist::save_json(&self.path, ACTIONS_FORMAT_VERSION, &entries)
    }
}
