//! Where compilation programs come from.
//!
//! The core does not know about rules files. A caller hands it an
//! [`ActionProvider`], which is asked once per run for every item's rep
//! names and programs and every layout's filter assignment; the answers
//! are frozen into an [`ActionPlan`] that the rest of the run reads.

use stanza_common::{Identifier, RepName, RepRef};
use stanza_entities::{Document, Site};
use stanza_store::ActionSequence;
use std::collections::HashMap;

/// Supplies the compilation rules of the current run.
pub trait ActionProvider {
    /// The names of the representations to create for `item`.
    fn rep_names_for(&self, item: &Document) -> Vec<RepName>;

    /// The program for one representation of `item`.
    fn memory_for(&self, item: &Document, rep: &RepName) -> ActionSequence;

    /// The filter assignment for `layout`, or `None` if the rules do not
    /// cover it. An uncovered layout fails compilation only when an item
    /// actually tries to use it.
    fn layout_memory_for(&self, layout: &Document) -> Option<ActionSequence>;
}

/// Every program of one run, resolved up front.
///
/// Freezing the provider's answers means outdatedness checks and
/// execution see the same programs, and the provider is queried exactly
/// once per rep.
#[derive(Debug, Default)]
pub struct ActionPlan {
    rep_memories: HashMap<RepRef, ActionSequence>,
    layout_memories: HashMap<Identifier, ActionSequence>,
    rep_names: HashMap<Identifier, Vec<RepName>>,
}

impl ActionPlan {
    /// Queries `provider` for every item and layout in `site`.
    pub fn build(site: &Site, provider: &dyn ActionProvider) -> Self {
        let mut plan = ActionPlan::default();
        for item in site.items() {
            let names = provider.rep_names_for(item);
            for name in &names {
                let rep = RepRef::new(item.identifier().clone(), name.clone());
                plan.rep_memories.insert(rep, provider.memory_for(item, name));
            }
            plan.rep_names.insert(item.identifier().clone(), names);
        }
        for layout in site.layouts() {
            if let Some(memory) = provider.layout_memory_for(layout) {
                plan.layout_memories.insert(layout.identifier().clone(), memory);
            }
        }
        plan
    }

    /// The rep names planned for an item.
    pub fn rep_names(&self, item: &Identifier) -> &[RepName] {
        self.rep_names
            .get(item)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The program planned for a rep, if the item is part of this run.
    pub fn rep_memory(&self, rep: &RepRef) -> Option<&ActionSequence> {
        self.rep_memories.get(rep)
    }

    /// The filter assignment for a layout, if the rules cover it.
    pub fn layout_memory(&self, layout: &Identifier) -> Option<&ActionSequence> {
        self.layout_memories.get(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stanza_common::Attributes;
    use stanza_entities::Content;

    struct FixedProvider;

    impl ActionProvider for FixedProvider {
        fn rep_names_for(&self, _item: &Document) -> Vec<RepName> {
            vec![RepName::default_rep(), RepName::new("feed")]
        }

        fn memory_for(&self, item: &Document, rep: &RepName) -> ActionSequence {
            let mut memory = ActionSequence::new();
            memory.add_snapshot(
                stanza_entities::SnapshotName::last(),
                Some(format!("{}-{}.html", item.identifier(), rep).into()),
            );
            memory
        }

        fn layout_memory_for(&self, layout: &Document) -> Option<ActionSequence> {
            if layout.identifier().as_str().ends_with(".erb") {
                let mut memory = ActionSequence::new();
                memory.add_filter("erb", Attributes::new());
                Some(memory)
            } else {
                None
            }
        }
    }

    #[test]
    fn plan_freezes_every_rep_and_layout() {
        let mut site = Site::new();
        site.add_item(
            Identifier::new("/a.md"),
            Attributes::new(),
            Content::textual("a"),
        );
        site.add_layout(
            Identifier::new("/default.erb"),
            Attributes::new(),
            Content::textual("<%= yield %>"),
        );
        site.add_layout(
            Identifier::new("/raw.txt"),
            Attributes::new(),
            Content::textual(""),
        );

        let plan = ActionPlan::build(&site, &FixedProvider);

        assert_eq!(plan.rep_names(&Identifier::new("/a.md")).len(), 2);
        assert!(plan
            .rep_memory(&RepRef::new(Identifier::new("/a.md"), RepName::new("feed")))
            .is_some());
        assert!(plan.layout_memory(&Identifier::new("/default.erb")).is_some());
        assert!(plan.layout_memory(&Identifier::new("/raw.txt")).is_none());
        assert!(plan.rep_names(&Identifier::new("/unknown.md")).is_empty());
    }
}
