//! The outdatedness decision procedure.
//!
//! Deciding whether something must recompile happens in two phases. The
//! basic phase compares an entity's own state against the stores:
//! fingerprint halves, recorded programs, and declared output files. The
//! dependency phase walks the dependency graph backwards and applies each
//! edge's aspect mask, so a change propagates only to dependents that
//! used the changed aspect. Compiled-content edges propagate
//! transitively; every other aspect stops after one hop.

use crate::provider::ActionPlan;
use stanza_common::{Checksum, EntityRef, Fingerprint, RepRef};
use stanza_config::SiteConfig;
use stanza_entities::{RepId, RepSet, Site};
use stanza_store::{ActionKey, Stores};
use std::collections::HashMap;
use std::fmt;

/// Why an entity or representation must recompile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutdatednessReason {
    /// No previous-run state exists to compare against.
    NotEnoughData,
    /// The raw content changed since the last run.
    ContentModified,
    /// The attribute table changed since the last run.
    AttributesModified,
    /// The recorded compilation program differs from the current one.
    RulesModified,
    /// A declared output file is missing from disk.
    NotWritten,
    /// Something this entity depends on changed.
    DependenciesOutdated,
}

impl fmt::Display for OutdatednessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutdatednessReason::NotEnoughData => "not enough data to determine freshness",
            OutdatednessReason::ContentModified => "content changed",
            OutdatednessReason::AttributesModified => "attributes changed",
            OutdatednessReason::RulesModified => "compilation rules changed",
            OutdatednessReason::NotWritten => "output file is missing",
            OutdatednessReason::DependenciesOutdated => "a dependency changed",
        })
    }
}

/// This run's checksums of one entity. The content half is `None` when
/// it cannot be computed (a binary file that is unreadable); comparisons
/// must then report a change.
#[derive(Clone, Copy)]
struct CurrentDigest {
    attributes: Checksum,
    content: Option<Checksum>,
}

/// Decides, with caching, whether entities and reps are outdated.
///
/// A checker is built once per run, after the action plan is frozen and
/// the stores are loaded, and is discarded before compilation mutates
/// anything it read.
pub struct OutdatednessChecker<'a> {
    site: &'a Site,
    reps: &'a RepSet,
    plan: &'a ActionPlan,
    stores: &'a Stores,
    config_fingerprint: Fingerprint,
    entity_basic: HashMap<EntityRef, Option<OutdatednessReason>>,
    rep_basic: HashMap<RepId, Option<OutdatednessReason>>,
    digests: HashMap<EntityRef, Option<CurrentDigest>>,
}

impl<'a> OutdatednessChecker<'a> {
    /// Creates a checker over this run's site, reps, plan, and stores.
    pub fn new(
        site: &'a Site,
        reps: &'a RepSet,
        plan: &'a ActionPlan,
        stores: &'a Stores,
        config: &SiteConfig,
    ) -> Self {
        OutdatednessChecker {
            site,
            reps,
            plan,
            stores,
            config_fingerprint: config.fingerprint(),
            entity_basic: HashMap::new(),
            rep_basic: HashMap::new(),
            digests: HashMap::new(),
        }
    }

    /// Why `entity` is outdated, or `None` if it is fresh.
    pub fn reason_for(&mut self, entity: &EntityRef) -> Option<OutdatednessReason> {
        if let Some(reason) = self.entity_basic(entity) {
            return Some(reason);
        }
        let mut stack = vec![entity.clone()];
        self.outdated_due_to_dependencies(entity, &mut stack)
            .then_some(OutdatednessReason::DependenciesOutdated)
    }

    /// Why the rep is outdated, or `None` if it is fresh. Dependency
    /// edges live on items, so the transitive phase starts from the
    /// rep's owning item.
    pub fn reason_for_rep(&mut self, rep: RepId) -> Option<OutdatednessReason> {
        if let Some(reason) = self.rep_basic(rep) {
            return Some(reason);
        }
        let item_ref = EntityRef::Item(self.reps.rep(rep).item_identifier().clone());
        let mut stack = vec![item_ref.clone()];
        self.outdated_due_to_dependencies(&item_ref, &mut stack)
            .then_some(OutdatednessReason::DependenciesOutdated)
    }

    fn entity_basic(&mut self, entity: &EntityRef) -> Option<OutdatednessReason> {
        if let Some(&cached) = self.entity_basic.get(entity) {
            return cached;
        }
        let reason = self.entity_basic_uncached(entity);
        self.entity_basic.insert(entity.clone(), reason);
        reason
    }

    fn entity_basic_uncached(&mut self, entity: &EntityRef) -> Option<OutdatednessReason> {
        match entity {
            EntityRef::Config => self.document_basic(entity),
            EntityRef::Item(identifier) => {
                let Some(item_id) = self.site.item_id(identifier) else {
                    return Some(OutdatednessReason::NotEnoughData);
                };
                let live: Vec<RepId> = self
                    .reps
                    .for_item(item_id)
                    .iter()
                    .copied()
                    .filter(|&id| !self.reps.rep(id).is_orphan())
                    .collect();
                if live.is_empty() {
                    return self.document_basic(entity);
                }
                live.into_iter().find_map(|id| self.rep_basic(id))
            }
            EntityRef::Layout(identifier) => {
                if let Some(reason) = self.document_basic(entity) {
                    return Some(reason);
                }
                let stored = self
                    .stores
                    .actions
                    .memory_for(&ActionKey::Layout(identifier.clone()));
                if stored != self.plan.layout_memory(identifier) {
                    return Some(OutdatednessReason::RulesModified);
                }
                None
            }
        }
    }

    fn rep_basic(&mut self, rep: RepId) -> Option<OutdatednessReason> {
        if let Some(&cached) = self.rep_basic.get(&rep) {
            return cached;
        }
        let reason = self.rep_basic_uncached(rep);
        self.rep_basic.insert(rep, reason);
        reason
    }

    fn rep_basic_uncached(&mut self, rep: RepId) -> Option<OutdatednessReason> {
        let rep = self.reps.rep(rep);
        let item_ref = EntityRef::Item(rep.item_identifier().clone());
        if let Some(reason) = self.document_basic(&item_ref) {
            return Some(reason);
        }

        let rep_ref = rep.rep_ref();
        let stored = self.stores.actions.memory_for(&ActionKey::Rep(rep_ref.clone()));
        match (stored, self.plan.rep_memory(&rep_ref)) {
            (Some(stored), Some(planned)) if stored == planned => {}
            _ => return Some(OutdatednessReason::RulesModified),
        }

        if rep.raw_paths().values().any(|path| !path.exists()) {
            return Some(OutdatednessReason::NotWritten);
        }
        None
    }

    /// Fingerprint comparison shared by items, layouts, and the
    /// configuration. The attribute half is checked before the content
    /// half; when both changed, the attribute reason wins.
    fn document_basic(&mut self, entity: &EntityRef) -> Option<OutdatednessReason> {
        if self.stores.fingerprints.get(entity).is_none() {
            return Some(OutdatednessReason::NotEnoughData);
        }
        if self.attributes_differ(entity) {
            return Some(OutdatednessReason::AttributesModified);
        }
        if self.content_differs(entity) {
            return Some(OutdatednessReason::ContentModified);
        }
        None
    }

    fn outdated_due_to_dependencies(
        &mut self,
        entity: &EntityRef,
        stack: &mut Vec<EntityRef>,
    ) -> bool {
        let dependencies = self.stores.dependencies.predecessors_with_props(entity);
        for (dependency, props) in dependencies {
            let Some(dependency) = dependency else {
                // The dependency no longer exists; whatever was read from
                // it cannot be re-verified.
                return true;
            };
            if props.raw_content && self.content_differs(&dependency) {
                return true;
            }
            if props.attributes && self.attributes_differ(&dependency) {
                return true;
            }
            if props.path && self.paths_differ(&dependency) {
                return true;
            }
            if props.compiled_content && self.transitively_outdated(&dependency, stack) {
                return true;
            }
        }
        false
    }

    /// Compiled content changes whenever its producer recompiles, so a
    /// compiled-content edge recurses into the full check of its target.
    fn transitively_outdated(&mut self, entity: &EntityRef, stack: &mut Vec<EntityRef>) -> bool {
        if stack.contains(entity) {
            // A cycle proves nothing changed along it.
            return false;
        }
        if self.entity_basic(entity).is_some() {
            return true;
        }
        stack.push(entity.clone());
        let outdated = self.outdated_due_to_dependencies(entity, stack);
        stack.pop();
        outdated
    }

    /// A path aspect changes only when the declared output paths of the
    /// target's current reps differ from the recorded ones. A program
    /// edit that keeps the same paths recompiles the target without
    /// touching path-dependents.
    fn paths_differ(&mut self, entity: &EntityRef) -> bool {
        let EntityRef::Item(identifier) = entity else {
            return false;
        };
        let plan = self.plan;
        let stores = self.stores;
        for name in plan.rep_names(identifier) {
            let rep_ref = RepRef::new(identifier.clone(), name.clone());
            let stored = stores.actions.memory_for(&ActionKey::Rep(rep_ref.clone()));
            match (stored, plan.rep_memory(&rep_ref)) {
                (Some(stored), Some(planned)) => {
                    if stored.declared_paths() != planned.declared_paths() {
                        return true;
                    }
                }
                _ => return true,
            }
        }
        false
    }

    fn attributes_differ(&mut self, entity: &EntityRef) -> bool {
        let Some(stored) = self.stores.fingerprints.get(entity) else {
            return true;
        };
        let Some(current) = self.current_digest(entity) else {
            return true;
        };
        current.attributes != stored.attributes
    }

    fn content_differs(&mut self, entity: &EntityRef) -> bool {
        let Some(stored) = self.stores.fingerprints.get(entity) else {
            return true;
        };
        let Some(current) = self.current_digest(entity) else {
            return true;
        };
        match current.content {
            Some(checksum) => checksum != stored.content,
            None => true,
        }
    }

    fn current_digest(&mut self, entity: &EntityRef) -> Option<CurrentDigest> {
        if let Some(cached) = self.digests.get(entity) {
            return *cached;
        }
        let digest = match entity {
            EntityRef::Config => Some(CurrentDigest {
                attributes: self.config_fingerprint.attributes,
                content: Some(self.config_fingerprint.content),
            }),
            _ => self.site.resolve(entity).map(|doc| CurrentDigest {
                attributes: Checksum::of_attributes(doc.attributes()),
                content: doc.content().checksum(),
            }),
        };
        self.digests.insert(entity.clone(), digest);
        digest
    }
}
