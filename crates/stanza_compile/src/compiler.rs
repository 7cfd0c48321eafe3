//! The compilation driver.
//!
//! One run builds the action plan, loads the persisted stores, decides
//! which representations are outdated, then drains the rep queue:
//! outdated reps and cache misses replay their programs, fresh reps are
//! restored from the content cache. Declared outputs are written as
//! reps finish, and the stores are saved at the end so the next run can
//! compare against this one.

use crate::errors::CompileError;
use crate::executor::Executor;
use crate::filter::FilterRegistry;
use crate::notify::{Notification, NotificationHub};
use crate::outdatedness::OutdatednessChecker;
use crate::provider::{ActionPlan, ActionProvider};
use crate::selector::RepQueue;
use stanza_common::{EntityRef, InternalError, RepRef};
use stanza_config::SiteConfig;
use stanza_entities::{Content, RepId, RepSet, Site};
use stanza_store::{ActionKey, Stores};
use std::collections::{BTreeMap, HashMap, HashSet};

/// What one run did, per representation.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Reps whose programs were replayed this run.
    pub compiled: Vec<RepRef>,
    /// Reps restored from the compiled-content cache.
    pub restored: Vec<RepRef>,
}

/// Drives one full compilation of a site.
pub struct Compiler<'a> {
    site: &'a Site,
    config: &'a SiteConfig,
    provider: &'a dyn ActionProvider,
    filters: &'a FilterRegistry,
    notifications: &'a NotificationHub,
}

impl<'a> Compiler<'a> {
    /// Creates a compiler over borrowed run inputs.
    pub fn new(
        site: &'a Site,
        config: &'a SiteConfig,
        provider: &'a dyn ActionProvider,
        filters: &'a FilterRegistry,
        notifications: &'a NotificationHub,
    ) -> Self {
        Compiler {
            site,
            config,
            provider,
            filters,
            notifications,
        }
    }

    /// Compiles the site once.
    ///
    /// Returns an error on the first failing rep; stores are only
    /// persisted after every live rep has finished.
    pub fn run(&self) -> Result<RunSummary, CompileError> {
        let plan = ActionPlan::build(self.site, self.provider);
        let universe = self.site.entity_refs();
        let mut stores = Stores::load_or_create(&self.config.state_dir, &universe);

        let mut reps = self.build_reps(&plan, &stores);

        let outdated: HashMap<RepId, bool> = {
            let mut checker =
                OutdatednessChecker::new(self.site, &reps, &plan, &stores, self.config);
            reps.live_ids()
                .into_iter()
                .map(|id| (id, checker.reason_for_rep(id).is_some()))
                .collect()
        };

        // An outdated item re-records its dependencies from scratch, so
        // edges from a previous program do not linger.
        for (&id, &is_outdated) in &outdated {
            if is_outdated {
                let entity = EntityRef::Item(reps.rep(id).item_identifier().clone());
                stores.dependencies.forget_dependencies_for(&entity);
            }
        }

        let scratch_dir = self.config.state_dir.join("scratch");
        let mut queue = RepQueue::new(reps.live_ids());
        let mut summary = RunSummary::default();

        while let Some(id) = queue.next() {
            let rep_ref = reps.rep(id).rep_ref();
            let is_outdated = *outdated.get(&id).unwrap_or(&true);

            if !is_outdated {
                if let Some(snapshots) = stores.cache.get(&rep_ref) {
                    let snapshots = snapshots.clone();
                    reps.rep_mut(id).restore(snapshots);
                    self.notifications.post(Notification::CachedContentUsed {
                        rep: rep_ref.clone(),
                    });
                    queue.unpark(&rep_ref);
                    summary.restored.push(rep_ref);
                    continue;
                }
                // Fresh but unservable from cache: replay the program
                // without forgetting recorded dependencies.
            }

            self.notifications.post(Notification::CompilationStarted {
                rep: rep_ref.clone(),
            });
            let Some(memory) = plan.rep_memory(&rep_ref) else {
                return Err(InternalError::new(format!("no program for rep {rep_ref}")).into());
            };
            let executor = Executor::new(
                id,
                &mut reps,
                self.site,
                &plan,
                self.filters,
                self.config,
                self.notifications,
                &scratch_dir,
            );
            match executor.run_program(memory) {
                Ok(records) => {
                    for record in records {
                        stores.dependencies.record_dependency(
                            &record.from,
                            record.to.as_ref(),
                            record.props,
                        );
                    }
                    self.write_outputs(&reps, id)?;
                    stores
                        .cache
                        .insert(rep_ref.clone(), reps.rep(id).snapshots().clone());
                    self.notifications.post(Notification::CompilationEnded {
                        rep: rep_ref.clone(),
                    });
                    queue.unpark(&rep_ref);
                    summary.compiled.push(rep_ref);
                }
                Err(CompileError::UnmetDependency { blocker, .. }) => {
                    queue.park(id, blocker);
                }
                Err(other) => return Err(other),
            }
        }

        let stuck = queue.stuck();
        if !stuck.is_empty() {
            let description = stuck
                .iter()
                .map(|(id, blocker)| {
                    format!("{} waits for {}", reps.rep(*id).rep_ref(), blocker)
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CompileError::DependencyCycle { description });
        }

        self.persist(&plan, &reps, &mut stores, &universe)?;
        Ok(summary)
    }

    /// Builds the rep set for this run: one rep per planned name, with
    /// declared output paths anchored under the output directory, plus
    /// orphans for stale store entries whose item still exists.
    fn build_reps(&self, plan: &ActionPlan, stores: &Stores) -> RepSet {
        let mut reps = RepSet::new();
        for item in self.site.items() {
            for name in plan.rep_names(item.identifier()) {
                let id = reps.add(item, name.clone());
                let rep_ref = reps.rep(id).rep_ref();
                if let Some(memory) = plan.rep_memory(&rep_ref) {
                    let mut raw_paths = BTreeMap::new();
                    for (snapshot, path) in memory.declared_paths() {
                        let relative = path.strip_prefix("/").unwrap_or(&path);
                        raw_paths.insert(snapshot, self.config.output_dir.join(relative));
                    }
                    reps.rep_mut(id).set_raw_paths(raw_paths);
                }
            }
        }
        for key in stores.actions.keys() {
            if let ActionKey::Rep(rep_ref) = key {
                if let Some(item_id) = self.site.item_id(&rep_ref.item) {
                    if reps.find(item_id, &rep_ref.name).is_none() {
                        reps.add_orphan(self.site.document(item_id), rep_ref.name.clone());
                    }
                }
            }
        }
        reps
    }

    /// Writes every declared output path of a finished rep.
    fn write_outputs(&self, reps: &RepSet, id: RepId) -> Result<(), CompileError> {
        let rep = reps.rep(id);
        let rep_ref = rep.rep_ref();
        for (snapshot, path) in rep.raw_paths() {
            let Some(content) = rep.snapshot(snapshot) else {
                continue;
            };
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|source| CompileError::OutputWrite {
                    path: path.clone(),
                    source,
                })?;
            }
            match content {
                Content::Textual(text) => {
                    std::fs::write(path, text.as_bytes()).map_err(|source| {
                        CompileError::OutputWrite {
                            path: path.clone(),
                            source,
                        }
                    })?;
                }
                Content::Binary(src) => {
                    std::fs::copy(src, path)
                        .map(|_| ())
                        .map_err(|source| CompileError::OutputWrite {
                            path: path.clone(),
                            source,
                        })?;
                }
            }
            self.notifications.post(Notification::RepWritten {
                rep: rep_ref.clone(),
                path: path.clone(),
            });
        }
        Ok(())
    }

    /// Refreshes the stores against the current run and saves them.
    ///
    /// Fingerprints without a computable value (an unreadable binary)
    /// keep their previous entry; the content half then reads as changed
    /// on the next run.
    fn persist(
        &self,
        plan: &ActionPlan,
        reps: &RepSet,
        stores: &mut Stores,
        universe: &HashSet<EntityRef>,
    ) -> Result<(), CompileError> {
        for item in self.site.items() {
            if let Some(fingerprint) = item.fingerprint() {
                stores.fingerprints.insert(item.entity_ref(), fingerprint);
            }
        }
        for layout in self.site.layouts() {
            if let Some(fingerprint) = layout.fingerprint() {
                stores.fingerprints.insert(layout.entity_ref(), fingerprint);
            }
        }
        stores
            .fingerprints
            .insert(EntityRef::Config, self.config.fingerprint());

        let mut live_keys = HashSet::new();
        let mut live_reps = HashSet::new();
        for id in reps.live_ids() {
            let rep_ref = reps.rep(id).rep_ref();
            if let Some(memory) = plan.rep_memory(&rep_ref) {
                stores
                    .actions
                    .set(ActionKey::Rep(rep_ref.clone()), memory.clone());
            }
            live_keys.insert(ActionKey::Rep(rep_ref.clone()));
            live_reps.insert(rep_ref);
        }
        for layout in self.site.layouts() {
            if let Some(memory) = plan.layout_memory(layout.identifier()) {
                let key = ActionKey::Layout(layout.identifier().clone());
                stores.actions.set(key.clone(), memory.clone());
                live_keys.insert(key);
            }
        }

        stores.actions.retain(&live_keys);
        stores.fingerprints.retain(universe);
        stores.cache.retain(&live_reps);
        stores.save_all()?;
        Ok(())
    }
}
