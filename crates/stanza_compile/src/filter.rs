//! Filters, the filter registry, and the context filters run in.
//!
//! The core never knows concrete filter implementations. Callers register
//! boxed [`Filter`]s by name; the executor resolves names at invocation
//! time and hands each filter a read-only input plus a [`FilterContext`].
//! Immutability of content and params is the type system's job: filters
//! receive shared references and return new values.
//!
//! Every document access made through the context records a dependency
//! edge from the entity on top of the tracker stack, with the aspect that
//! was actually read. This is where the dependency graph's edges come
//! from.

use crate::tracker::DependencyTracker;
use stanza_common::{AttributeValue, EntityRef, Identifier, RepName, RepRef};
use stanza_config::SiteConfig;
use stanza_entities::{Content, Document, ItemRep, RepSet, Site, SnapshotName};
use stanza_store::DepProps;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The content direction of a filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    /// Text in, text out.
    Textual,
    /// Binary in, binary out.
    Binary,
    /// Text in, binary out.
    TextToBinary,
    /// Binary in, text out.
    BinaryToText,
}

impl FilterKind {
    /// Returns `true` if the filter consumes binary content.
    pub fn input_is_binary(self) -> bool {
        matches!(self, FilterKind::Binary | FilterKind::BinaryToText)
    }

    /// Returns `true` if the filter produces binary content.
    pub fn output_is_binary(self) -> bool {
        matches!(self, FilterKind::Binary | FilterKind::TextToBinary)
    }
}

/// Read-only input handed to a filter.
#[derive(Clone, Copy, Debug)]
pub enum FilterInput<'a> {
    /// The current textual content.
    Textual(&'a str),
    /// Path of the current binary content.
    Binary(&'a Path),
}

impl<'a> FilterInput<'a> {
    /// The text, for filters that declared a textual input.
    pub fn text(self) -> Option<&'a str> {
        match self {
            FilterInput::Textual(text) => Some(text),
            FilterInput::Binary(_) => None,
        }
    }

    /// The file path, for filters that declared a binary input.
    pub fn path(self) -> Option<&'a Path> {
        match self {
            FilterInput::Textual(_) => None,
            FilterInput::Binary(path) => Some(path),
        }
    }
}

/// What a filter produced.
#[derive(Debug)]
pub enum FilterOutput {
    /// New textual content.
    Textual(String),
    /// The filter wrote the file named by
    /// [`FilterContext::output_path`].
    Binary,
}

/// An error raised by a filter itself.
#[derive(Debug, PartialEq, Eq)]
pub enum FilterError {
    /// The filter needs another rep's compiled content, which is not
    /// available yet. The scheduler defers the current rep and retries
    /// it after the blocker completes.
    UnmetDependency(RepRef),
    /// Any other filter failure, described for the build report.
    Message(String),
}

/// A content transformation registered under a name.
pub trait Filter: Send + Sync {
    /// The filter's content direction, checked against the current
    /// content before every invocation.
    fn kind(&self) -> FilterKind;

    /// Runs the transformation.
    fn run(
        &self,
        input: FilterInput<'_>,
        params: &stanza_common::Attributes,
        ctx: &mut FilterContext<'_>,
    ) -> Result<FilterOutput, FilterError>;
}

/// The injectable name-to-filter mapping.
#[derive(Default)]
pub struct FilterRegistry {
    filters: HashMap<String, Box<dyn Filter>>,
}

impl FilterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        FilterRegistry::default()
    }

    /// Registers a filter under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, filter: Box<dyn Filter>) {
        self.filters.insert(name.into(), filter);
    }

    /// Looks up a filter by name.
    pub fn get(&self, name: &str) -> Option<&dyn Filter> {
        self.filters.get(name).map(Box::as_ref)
    }

    /// Returns `true` if a filter is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }
}

/// What a running filter can see of the build.
///
/// All document access goes through tracked methods so the dependency
/// graph learns what was read. Lookups that find nothing record no edge
/// and return `None`; the absence is already covered by fingerprints.
pub struct FilterContext<'a> {
    item: &'a Document,
    rep: &'a ItemRep,
    reps: &'a RepSet,
    site: &'a Site,
    config: &'a SiteConfig,
    layout: Option<&'a Document>,
    output_path: Option<&'a Path>,
    tracker: &'a mut DependencyTracker,
}

impl<'a> FilterContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        item: &'a Document,
        rep: &'a ItemRep,
        reps: &'a RepSet,
        site: &'a Site,
        config: &'a SiteConfig,
        layout: Option<&'a Document>,
        output_path: Option<&'a Path>,
        tracker: &'a mut DependencyTracker,
    ) -> Self {
        FilterContext {
            item,
            rep,
            reps,
            site,
            config,
            layout,
            output_path,
            tracker,
        }
    }

    /// Identifier of the item being compiled.
    pub fn item_identifier(&self) -> &Identifier {
        self.item.identifier()
    }

    /// Name of the representation being compiled.
    pub fn rep_name(&self) -> &RepName {
        self.rep.name()
    }

    /// Identifier of the active layout, during a layout step.
    pub fn layout_identifier(&self) -> Option<&Identifier> {
        self.layout.map(Document::identifier)
    }

    /// The file a binary-producing filter must write its result to.
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path
    }

    /// Reads an attribute of the named item. Records an attributes
    /// dependency on it.
    pub fn item_attribute(&mut self, identifier: &Identifier, key: &str) -> Option<AttributeValue> {
        let item = self.site.item(identifier)?;
        self.tracker.bounce(item.entity_ref(), DepProps::ATTRIBUTES);
        item.attributes().get(key).cloned()
    }

    /// Reads an attribute of the active layout. Records an attributes
    /// dependency on it.
    pub fn layout_attribute(&mut self, key: &str) -> Option<AttributeValue> {
        let layout = self.layout?;
        self.tracker.bounce(layout.entity_ref(), DepProps::ATTRIBUTES);
        layout.attributes().get(key).cloned()
    }

    /// Reads a site configuration attribute. Records an attributes
    /// dependency on the configuration.
    pub fn config_attribute(&mut self, key: &str) -> Option<AttributeValue> {
        self.tracker.bounce(EntityRef::Config, DepProps::ATTRIBUTES);
        self.config.attributes.get(key).cloned()
    }

    /// Reads the raw (uncompiled) content of the named item. Records a
    /// raw-content dependency on it.
    pub fn item_raw_content(&mut self, identifier: &Identifier) -> Option<Content> {
        let item = self.site.item(identifier)?;
        self.tracker.bounce(item.entity_ref(), DepProps::RAW_CONTENT);
        Some(item.content().clone())
    }

    /// Reads the raw content of the active layout. Records a raw-content
    /// dependency on it.
    pub fn layout_raw_content(&mut self) -> Option<Content> {
        let layout = self.layout?;
        self.tracker.bounce(layout.entity_ref(), DepProps::RAW_CONTENT);
        Some(layout.content().clone())
    }

    /// The output path of the named item's default rep. Records a path
    /// dependency on the item.
    pub fn path_of(&mut self, identifier: &Identifier) -> Option<PathBuf> {
        let item = self.site.item(identifier)?;
        self.tracker.bounce(item.entity_ref(), DepProps::PATH);
        let rep_id = self.reps.find(item.id(), &RepName::default_rep())?;
        self.reps.rep(rep_id).output_path().map(Path::to_path_buf)
    }

    /// Reads the compiled content of the named item's default rep.
    /// Records a compiled-content dependency on the item.
    ///
    /// `snapshot` selects a named snapshot; `None` means `pre` when the
    /// rep captured one, otherwise `last`. Reading the rep currently
    /// being compiled yields its in-progress snapshots; reading any
    /// other rep that has not completed this run yields
    /// [`FilterError::UnmetDependency`].
    pub fn compiled_content_of(
        &mut self,
        identifier: &Identifier,
        snapshot: Option<&SnapshotName>,
    ) -> Result<Arc<str>, FilterError> {
        let item = self
            .site
            .item(identifier)
            .ok_or_else(|| FilterError::Message(format!("no item matches {identifier}")))?;
        self.tracker.bounce(item.entity_ref(), DepProps::COMPILED_CONTENT);

        let rep = self
            .reps
            .find(item.id(), &RepName::default_rep())
            .map(|id| self.reps.rep(id))
            .filter(|rep| !rep.is_orphan())
            .ok_or_else(|| {
                FilterError::Message(format!("item {identifier} has no default representation"))
            })?;

        if rep.id() != self.rep.id() && !rep.is_compiled() {
            return Err(FilterError::UnmetDependency(rep.rep_ref()));
        }

        let content = match snapshot {
            Some(name) => rep.snapshot(name).ok_or_else(|| {
                FilterError::Message(format!("item {identifier} has no snapshot '{name}'"))
            })?,
            None => rep
                .snapshot(&SnapshotName::pre())
                .or_else(|| rep.snapshot(&SnapshotName::last()))
                .ok_or_else(|| {
                    FilterError::Message(format!("item {identifier} has no compiled content"))
                })?,
        };
        match content {
            Content::Textual(text) => Ok(Arc::clone(text)),
            Content::Binary(_) => Err(FilterError::Message(format!(
                "compiled content of {identifier} is binary"
            ))),
        }
    }
}
