//! Dependency tracking during program execution.
//!
//! The executor pushes the item being compiled onto a stack; every
//! tracked accessor then records an edge from the stack top to the
//! entity it read. Records are buffered here and flushed into the
//! dependency store only when the whole program succeeds, so a deferred
//! or failed attempt leaves no trace.

use stanza_common::EntityRef;
use stanza_store::DepProps;

/// One buffered dependency edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepRecord {
    /// The depending entity.
    pub from: EntityRef,
    /// The entity depended on, or `None` for an explicit tombstone.
    pub to: Option<EntityRef>,
    /// The aspects of `to` that were used.
    pub props: DepProps,
}

/// The per-executor stack and record buffer.
#[derive(Debug, Default)]
pub struct DependencyTracker {
    stack: Vec<EntityRef>,
    records: Vec<DepRecord>,
}

impl DependencyTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        DependencyTracker::default()
    }

    /// Enters `entity`: records an edge from the current stack top onto
    /// it (if there is one), then makes it the new top.
    pub fn enter(&mut self, entity: EntityRef, props: DepProps) {
        if let Some(top) = self.stack.last() {
            self.records.push(DepRecord {
                from: top.clone(),
                to: Some(entity.clone()),
                props,
            });
        }
        self.stack.push(entity);
    }

    /// Leaves the current stack top.
    pub fn exit(&mut self) {
        self.stack.pop();
    }

    /// Records an edge from the current stack top onto `entity` without
    /// entering it. Used when an entity is consulted rather than
    /// compiled, such as a layout being applied.
    pub fn bounce(&mut self, entity: EntityRef, props: DepProps) {
        if let Some(top) = self.stack.last() {
            self.records.push(DepRecord {
                from: top.clone(),
                to: Some(entity.clone()),
                props,
            });
        }
    }

    /// Takes the buffered records, leaving the tracker empty.
    pub fn take_records(&mut self) -> Vec<DepRecord> {
        std::mem::take(&mut self.records)
    }
}
