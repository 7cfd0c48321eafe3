//! Build progress notifications.
//!
//! The compiler posts an event at each observable stage boundary. Events
//! accumulate in a [`NotificationHub`] that callers can drain after (or
//! observe during) a run; nothing in the core consumes them.

use stanza_common::RepRef;
use std::path::PathBuf;
use std::sync::Mutex;

/// One observable event during a build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// A rep's program started executing. Posted again on a retry after
    /// a deferral.
    CompilationStarted {
        /// The rep being compiled.
        rep: RepRef,
    },
    /// A rep's program finished successfully.
    CompilationEnded {
        /// The rep that finished.
        rep: RepRef,
    },
    /// A filter is about to run.
    FilteringStarted {
        /// The rep being filtered.
        rep: RepRef,
        /// The filter name.
        filter: String,
    },
    /// A filter returned, successfully or not.
    FilteringEnded {
        /// The rep being filtered.
        rep: RepRef,
        /// The filter name.
        filter: String,
    },
    /// An up-to-date rep was restored from the content cache instead of
    /// being recompiled.
    CachedContentUsed {
        /// The restored rep.
        rep: RepRef,
    },
    /// A compiled snapshot was written to its output path.
    RepWritten {
        /// The rep that was written.
        rep: RepRef,
        /// The absolute output path.
        path: PathBuf,
    },
}

/// A thread-safe accumulator for build notifications.
pub struct NotificationHub {
    events: Mutex<Vec<Notification>>,
}

impl NotificationHub {
    /// Creates a new empty hub.
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Posts an event into the hub.
    pub fn post(&self, event: Notification) {
        let mut events = self.events.lock().unwrap();
        events.push(event);
    }

    /// Returns a snapshot of all accumulated events without draining.
    pub fn events(&self) -> Vec<Notification> {
        let events = self.events.lock().unwrap();
        events.clone()
    }

    /// Takes all accumulated events, leaving the hub empty.
    pub fn take_all(&self) -> Vec<Notification> {
        let mut events = self.events.lock().unwrap();
        std::mem::take(&mut *events)
    }

    /// The number of accumulated events.
    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Returns `true` if no events have been posted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}
