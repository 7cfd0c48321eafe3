//! Scheduling of representations with deferral.
//!
//! Reps are drained in insertion order. A rep whose program needs
//! another rep's compiled content is parked with the blocker's identity
//! and re-queued when that blocker completes, so compilation order ends
//! up respecting compiled-content dependencies without computing them up
//! front. Reps still parked when the queue drains are stuck in a cycle.

use stanza_common::RepRef;
use stanza_entities::RepId;
use std::collections::VecDeque;

/// The work queue of one build.
#[derive(Debug, Default)]
pub struct RepQueue {
    pending: VecDeque<RepId>,
    parked: Vec<(RepId, RepRef)>,
}

impl RepQueue {
    /// Creates a queue holding `reps` in order.
    pub fn new(reps: impl IntoIterator<Item = RepId>) -> Self {
        RepQueue {
            pending: reps.into_iter().collect(),
            parked: Vec::new(),
        }
    }

    /// Takes the next rep to work on.
    pub fn next(&mut self) -> Option<RepId> {
        self.pending.pop_front()
    }

    /// Parks `rep` until `blocker` completes.
    pub fn park(&mut self, rep: RepId, blocker: RepRef) {
        self.parked.push((rep, blocker));
    }

    /// Re-queues every rep that was parked on `completed`.
    pub fn unpark(&mut self, completed: &RepRef) {
        let mut index = 0;
        while index < self.parked.len() {
            if self.parked[index].1 == *completed {
                let (rep, _) = self.parked.remove(index);
                self.pending.push_back(rep);
            } else {
                index += 1;
            }
        }
    }

    /// The reps still parked, with what each is waiting for. Non-empty
    /// after the queue drains means a dependency cycle.
    pub fn stuck(&self) -> &[(RepId, RepRef)] {
        &self.parked
    }
}
