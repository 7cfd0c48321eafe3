//! Replays one representation's compilation program.
//!
//! An executor owns the mutable view of a single rep while its program
//! runs: it seeds the working slot from the item's raw content, applies
//! filter, snapshot, and layout steps in order, and collects the
//! dependency edges that tracked accessors recorded along the way. The
//! caller decides what a result means; in particular an unmet dependency
//! error is a scheduling signal, not a failure.

use crate::errors::CompileError;
use crate::filter::{Filter, FilterContext, FilterError, FilterInput, FilterOutput, FilterRegistry};
use crate::notify::{Notification, NotificationHub};
use crate::provider::ActionPlan;
use crate::tracker::{DepRecord, DependencyTracker};
use stanza_common::{Attributes, Identifier, InternalError, Pattern, RepName};
use stanza_config::{PatternType, SiteConfig};
use stanza_entities::{Content, Document, RepId, RepSet, Site, SnapshotName};
use stanza_store::{Action, ActionSequence, DepProps};
use std::path::{Path, PathBuf};

/// Resolves a layout pattern against the site's layouts.
///
/// An exact match on cleaned identifiers always wins. When the site is
/// configured for glob patterns, the first glob match in insertion order
/// is used as a fallback; under legacy matching there is no fallback.
pub fn find_layout<'s>(site: &'s Site, config: &SiteConfig, pattern: &str) -> Option<&'s Document> {
    let exact = Pattern::Exact(Identifier::new(pattern));
    for layout in site.layouts() {
        if exact.matches(layout.identifier()) {
            return Some(layout);
        }
    }
    if config.pattern_type == PatternType::Glob {
        let glob = Pattern::Glob(pattern.to_owned());
        for layout in site.layouts() {
            if glob.matches(layout.identifier()) {
                return Some(layout);
            }
        }
    }
    None
}

/// Runs one rep's program to completion.
pub struct Executor<'a> {
    rep_id: RepId,
    reps: &'a mut RepSet,
    site: &'a Site,
    plan: &'a ActionPlan,
    filters: &'a FilterRegistry,
    config: &'a SiteConfig,
    notifications: &'a NotificationHub,
    scratch_dir: &'a Path,
    tracker: DependencyTracker,
    step: usize,
}

impl<'a> Executor<'a> {
    /// Creates an executor for the given rep.
    ///
    /// `scratch_dir` receives the intermediate files of binary-producing
    /// filters; it is created lazily on first use.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rep_id: RepId,
        reps: &'a mut RepSet,
        site: &'a Site,
        plan: &'a ActionPlan,
        filters: &'a FilterRegistry,
        config: &'a SiteConfig,
        notifications: &'a NotificationHub,
        scratch_dir: &'a Path,
    ) -> Self {
        Executor {
            rep_id,
            reps,
            site,
            plan,
            filters,
            config,
            notifications,
            scratch_dir,
            tracker: DependencyTracker::new(),
            step: 0,
        }
    }

    /// Replays `memory` against the rep and returns the dependency edges
    /// recorded while it ran.
    ///
    /// Any previous snapshots are discarded first, so retrying a rep
    /// after a deferral replays the whole program from the raw content.
    pub fn run_program(mut self, memory: &ActionSequence) -> Result<Vec<DepRecord>, CompileError> {
        let rep = self.reps.rep(self.rep_id);
        if rep.is_compiled() {
            return Err(InternalError::new(format!(
                "rep {} compiled twice in one run",
                rep.rep_ref()
            ))
            .into());
        }
        let item = self.site.document(rep.item());
        let initial = item.content().clone();
        let item_ref = item.entity_ref();

        self.reps.rep_mut(self.rep_id).begin_compilation(initial);
        self.tracker.enter(item_ref, DepProps::NONE);

        for action in memory.actions() {
            match action {
                Action::Filter { name, params } => self.filter_step(name, params)?,
                Action::Snapshot { name, .. } => self.snapshot_step(name)?,
                Action::Layout { pattern, params } => self.layout_step(pattern, params)?,
            }
        }

        self.tracker.exit();
        self.reps.rep_mut(self.rep_id).mark_compiled();
        Ok(self.tracker.take_records())
    }

    fn filter_step(&mut self, name: &str, params: &Attributes) -> Result<(), CompileError> {
        let Some(filter) = self.filters.get(name) else {
            let (item, rep) = self.item_and_rep();
            return Err(CompileError::UnknownFilter {
                item,
                rep,
                name: name.to_owned(),
            });
        };
        let kind = filter.kind();

        let current = self.reps.rep(self.rep_id).last().clone();
        if kind.input_is_binary() && !current.is_binary() {
            let (item, rep) = self.item_and_rep();
            return Err(CompileError::CannotUseBinaryFilter {
                item,
                rep,
                name: name.to_owned(),
            });
        }
        if !kind.input_is_binary() && current.is_binary() {
            let (item, rep) = self.item_and_rep();
            return Err(CompileError::CannotUseTextualFilter {
                item,
                rep,
                name: name.to_owned(),
            });
        }

        let scratch = if kind.output_is_binary() {
            Some(self.next_scratch_path()?)
        } else {
            None
        };

        let output = self.run_filter(filter, name, params, &current, None, scratch.as_deref())?;

        let produced = match (output, scratch) {
            (FilterOutput::Textual(text), None) => Content::textual(text),
            (FilterOutput::Binary, Some(path)) => {
                if !path.is_file() {
                    let (item, rep) = self.item_and_rep();
                    return Err(CompileError::OutputNotWritten {
                        item,
                        rep,
                        name: name.to_owned(),
                    });
                }
                Content::binary(path)
            }
            (FilterOutput::Textual(_), Some(_)) => {
                let (item, rep) = self.item_and_rep();
                return Err(CompileError::FilterFailed {
                    item,
                    rep,
                    name: name.to_owned(),
                    reason: "filter declared binary output but returned text".to_owned(),
                });
            }
            (FilterOutput::Binary, None) => {
                let (item, rep) = self.item_and_rep();
                return Err(CompileError::FilterFailed {
                    item,
                    rep,
                    name: name.to_owned(),
                    reason: "filter declared textual output but returned binary".to_owned(),
                });
            }
        };
        self.reps.rep_mut(self.rep_id).set_last(produced);
        Ok(())
    }

    fn snapshot_step(&mut self, name: &SnapshotName) -> Result<(), CompileError> {
        if name.is_last() {
            // `last` always tracks the working slot; capturing it does
            // nothing.
            return Ok(());
        }
        if self.reps.rep(self.rep_id).has_snapshot(name) {
            let (item, rep) = self.item_and_rep();
            return Err(CompileError::DuplicateSnapshot {
                item,
                rep,
                snapshot: name.clone(),
            });
        }
        self.reps.rep_mut(self.rep_id).capture_snapshot(name.clone());
        Ok(())
    }

    fn layout_step(&mut self, pattern: &str, step_params: &Attributes) -> Result<(), CompileError> {
        // Binary content cannot be laid out, no matter what the pattern
        // would resolve to.
        if self.reps.rep(self.rep_id).last().is_binary() {
            let (item, rep) = self.item_and_rep();
            return Err(CompileError::CannotLayoutBinaryItem { item, rep });
        }

        let Some(layout) = find_layout(self.site, self.config, pattern) else {
            let (item, rep) = self.item_and_rep();
            return Err(CompileError::UnknownLayout {
                item,
                rep,
                pattern: pattern.to_owned(),
            });
        };

        let Some((filter_name, base_params)) = self
            .plan
            .layout_memory(layout.identifier())
            .and_then(ActionSequence::first_filter)
        else {
            let (item, rep) = self.item_and_rep();
            return Err(CompileError::UndefinedFilterForLayout {
                item,
                rep,
                layout: layout.identifier().clone(),
            });
        };

        let Some(filter) = self.filters.get(filter_name) else {
            let (item, rep) = self.item_and_rep();
            return Err(CompileError::UnknownFilter {
                item,
                rep,
                name: filter_name.to_owned(),
            });
        };
        let kind = filter.kind();
        if kind.input_is_binary() {
            let (item, rep) = self.item_and_rep();
            return Err(CompileError::CannotUseBinaryFilter {
                item,
                rep,
                name: filter_name.to_owned(),
            });
        }
        if kind.output_is_binary() {
            let (item, rep) = self.item_and_rep();
            return Err(CompileError::FilterFailed {
                item,
                rep,
                name: filter_name.to_owned(),
                reason: "layout filters must produce textual content".to_owned(),
            });
        }
        if layout.content().is_binary() {
            let (item, rep) = self.item_and_rep();
            return Err(CompileError::CannotUseTextualFilter {
                item,
                rep,
                name: filter_name.to_owned(),
            });
        }

        // Step params override the layout's assigned filter params.
        let mut params = base_params.clone();
        params.extend(step_params.clone());

        // Rendering reads the layout's source, whether or not the filter
        // uses the tracked accessor for it.
        self.tracker.bounce(layout.entity_ref(), DepProps::RAW_CONTENT);

        let template = layout.content().clone();
        let output = self.run_filter(filter, filter_name, &params, &template, Some(layout), None)?;
        match output {
            FilterOutput::Textual(text) => {
                self.reps.rep_mut(self.rep_id).set_last(Content::textual(text));
                Ok(())
            }
            FilterOutput::Binary => {
                let (item, rep) = self.item_and_rep();
                Err(CompileError::FilterFailed {
                    item,
                    rep,
                    name: filter_name.to_owned(),
                    reason: "layout filters must produce textual content".to_owned(),
                })
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_filter(
        &mut self,
        filter: &dyn Filter,
        name: &str,
        params: &Attributes,
        input_content: &Content,
        layout: Option<&Document>,
        output_path: Option<&Path>,
    ) -> Result<FilterOutput, CompileError> {
        let rep_ref = self.reps.rep(self.rep_id).rep_ref();
        self.notifications.post(Notification::FilteringStarted {
            rep: rep_ref.clone(),
            filter: name.to_owned(),
        });

        let input = match input_content {
            Content::Textual(text) => FilterInput::Textual(text),
            Content::Binary(path) => FilterInput::Binary(path),
        };

        let result = {
            let reps = &*self.reps;
            let tracker = &mut self.tracker;
            let rep = reps.rep(self.rep_id);
            let item = self.site.document(rep.item());
            let mut ctx = FilterContext::new(
                item,
                rep,
                reps,
                self.site,
                self.config,
                layout,
                output_path,
                tracker,
            );
            filter.run(input, params, &mut ctx)
        };

        self.notifications.post(Notification::FilteringEnded {
            rep: rep_ref,
            filter: name.to_owned(),
        });

        match result {
            Ok(output) => Ok(output),
            Err(FilterError::UnmetDependency(blocker)) => {
                let (item, rep) = self.item_and_rep();
                Err(CompileError::UnmetDependency { item, rep, blocker })
            }
            Err(FilterError::Message(reason)) => {
                let (item, rep) = self.item_and_rep();
                Err(CompileError::FilterFailed {
                    item,
                    rep,
                    name: name.to_owned(),
                    reason,
                })
            }
        }
    }

    /// A fresh file path under the scratch directory for the next
    /// binary-producing step of this rep.
    fn next_scratch_path(&mut self) -> Result<PathBuf, CompileError> {
        self.step += 1;
        let rep = self.reps.rep(self.rep_id);
        let slug: String = rep
            .item_identifier()
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let file = format!("{}-{}-{}.bin", slug, rep.name(), self.step);
        std::fs::create_dir_all(self.scratch_dir).map_err(|source| CompileError::OutputWrite {
            path: self.scratch_dir.to_path_buf(),
            source,
        })?;
        Ok(self.scratch_dir.join(file))
    }

    fn item_and_rep(&self) -> (Identifier, RepName) {
        let rep = self.reps.rep(self.rep_id);
        (rep.item_identifier().clone(), rep.name().clone())
    }
}
