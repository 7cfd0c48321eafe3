//! Shared fixtures for end-to-end build tests.
//!
//! Provides a rule provider built from explicit per-item programs, a
//! registry of small deterministic filters, and a runner that drives the
//! compiler the way an embedding tool would: construct a site, run once,
//! and hand back the summary plus every posted notification.

#![warn(missing_docs)]

use stanza_common::{AttributeValue, Attributes, Identifier, RepName};
use stanza_compile::{
    ActionProvider, CompileError, Compiler, Filter, FilterContext, FilterError, FilterInput,
    FilterKind, FilterOutput, FilterRegistry, Notification, NotificationHub, RunSummary,
};
use stanza_config::{load_config_from_str, SiteConfig};
use stanza_entities::{Document, Site, SnapshotName};
use stanza_store::ActionSequence;
use std::collections::HashMap;
use std::path::Path;

/// An action provider with explicitly listed programs.
///
/// Rep programs are kept in route order, so the first `route_rep` call
/// for an item decides its first representation.
#[derive(Default)]
pub struct ProgramProvider {
    programs: HashMap<Identifier, Vec<(RepName, ActionSequence)>>,
    layouts: HashMap<Identifier, ActionSequence>,
}

impl ProgramProvider {
    /// Creates a provider with no routes.
    pub fn new() -> Self {
        ProgramProvider::default()
    }

    /// Routes the default representation of an item.
    pub fn route(&mut self, identifier: &str, program: ActionSequence) {
        self.route_rep(identifier, "default", program);
    }

    /// Routes a named representation of an item, replacing any earlier
    /// program for the same name.
    pub fn route_rep(&mut self, identifier: &str, rep: &str, program: ActionSequence) {
        let entry = self.programs.entry(Identifier::new(identifier)).or_default();
        let name = RepName::new(rep);
        if let Some(slot) = entry.iter_mut().find(|(existing, _)| *existing == name) {
            slot.1 = program;
        } else {
            entry.push((name, program));
        }
    }

    /// Assigns a rendering filter to a layout.
    pub fn assign_layout(&mut self, identifier: &str, filter: &str, params: Attributes) {
        let mut memory = ActionSequence::new();
        memory.add_filter(filter, params);
        self.layouts.insert(Identifier::new(identifier), memory);
    }
}

impl ActionProvider for ProgramProvider {
    fn rep_names_for(&self, item: &Document) -> Vec<RepName> {
        self.programs
            .get(item.identifier())
            .map(|entries| entries.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_else(|| vec![RepName::default_rep()])
    }

    fn memory_for(&self, item: &Document, rep: &RepName) -> ActionSequence {
        self.programs
            .get(item.identifier())
            .and_then(|entries| entries.iter().find(|(name, _)| name == rep))
            .map(|(_, program)| program.clone())
            .unwrap_or_default()
    }

    fn layout_memory_for(&self, layout: &Document) -> Option<ActionSequence> {
        self.layouts.get(layout.identifier()).cloned()
    }
}

/// Everything a finished run produced, for assertions.
#[derive(Debug)]
pub struct BuildOutcome {
    /// Which reps compiled and which were restored.
    pub summary: RunSummary,
    /// Every notification posted during the run, in order.
    pub notifications: Vec<Notification>,
}

/// Compiles `site` once with the standard filter registry.
pub fn run_build(
    site: &Site,
    config: &SiteConfig,
    provider: &ProgramProvider,
) -> Result<BuildOutcome, CompileError> {
    let filters = standard_filters();
    let hub = NotificationHub::new();
    let compiler = Compiler::new(site, config, provider, &filters, &hub);
    let summary = compiler.run()?;
    Ok(BuildOutcome {
        summary,
        notifications: hub.take_all(),
    })
}

/// A site configuration whose output and state directories live under
/// `dir`.
pub fn site_config(dir: &Path) -> SiteConfig {
    let mut config = load_config_from_str(
        r#"
[site]
name = "conformance"

[site.attributes]
base_url = "https://example.test"
"#,
    )
    .unwrap();
    config.output_dir = dir.join("out");
    config.state_dir = dir.join("state");
    config
}

/// Builds an attribute table from literal key/value pairs.
pub fn attrs(pairs: &[(&str, AttributeValue)]) -> Attributes {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), value.clone()))
        .collect()
}

/// A program that runs one parameterless filter and writes the result
/// to `path`.
pub fn filter_then_write(filter: &str, path: &str) -> ActionSequence {
    let mut program = ActionSequence::new();
    program.add_filter(filter, Attributes::new());
    program.add_snapshot(SnapshotName::last(), Some(path.into()));
    program
}

/// A program that writes the content to `path` unchanged.
pub fn write_only(path: &str) -> ActionSequence {
    filter_then_write("identity", path)
}

/// The filter registry every conformance build runs with.
pub fn standard_filters() -> FilterRegistry {
    let mut filters = FilterRegistry::new();
    filters.register("identity", Box::new(IdentityFilter));
    filters.register("upcase", Box::new(UpcaseFilter));
    filters.register("append", Box::new(AppendFilter));
    filters.register("template", Box::new(TemplateFilter));
    filters.register("copy_binary", Box::new(CopyBinaryFilter));
    filters.register("text_to_binary", Box::new(TextToBinaryFilter));
    filters.register("binary_to_text", Box::new(BinaryToTextFilter));
    filters
}

/// Passes textual content through unchanged.
struct IdentityFilter;

impl Filter for IdentityFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Textual
    }

    fn run(
        &self,
        input: FilterInput<'_>,
        _params: &Attributes,
        _ctx: &mut FilterContext<'_>,
    ) -> Result<FilterOutput, FilterError> {
        Ok(FilterOutput::Textual(
            input.text().unwrap_or_default().to_owned(),
        ))
    }
}

/// Uppercases textual content.
struct UpcaseFilter;

impl Filter for UpcaseFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Textual
    }

    fn run(
        &self,
        input: FilterInput<'_>,
        _params: &Attributes,
        _ctx: &mut FilterContext<'_>,
    ) -> Result<FilterOutput, FilterError> {
        Ok(FilterOutput::Textual(
            input.text().unwrap_or_default().to_uppercase(),
        ))
    }
}

/// Appends the `text` param to textual content.
struct AppendFilter;

impl Filter for AppendFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Textual
    }

    fn run(
        &self,
        input: FilterInput<'_>,
        params: &Attributes,
        _ctx: &mut FilterContext<'_>,
    ) -> Result<FilterOutput, FilterError> {
        let suffix = params.get("text").and_then(AttributeValue::as_str).unwrap_or("");
        Ok(FilterOutput::Textual(format!(
            "{}{suffix}",
            input.text().unwrap_or_default()
        )))
    }
}

/// Expands `{{...}}` tokens in the current content.
///
/// As an item filter the item's own content is the template; as a layout
/// filter the layout's source is. Supported tokens:
///
/// - `{{yield}}`: the compiled content of the item being built
/// - `{{content IDENT [SNAPSHOT]}}`: another item's compiled content
/// - `{{raw IDENT}}`: another item's raw content
/// - `{{attr IDENT KEY}}`: another item's attribute, empty if absent
/// - `{{path IDENT}}`: another item's output path
/// - `{{config KEY}}`: a site configuration attribute
/// - `{{layout KEY}}`: an attribute of the active layout
/// - `{{param KEY}}`: a filter param
struct TemplateFilter;

impl Filter for TemplateFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Textual
    }

    fn run(
        &self,
        input: FilterInput<'_>,
        params: &Attributes,
        ctx: &mut FilterContext<'_>,
    ) -> Result<FilterOutput, FilterError> {
        let template = input.text().unwrap_or_default();
        let expanded = expand_template(template, params, ctx)?;
        Ok(FilterOutput::Textual(expanded))
    }
}

fn expand_template(
    template: &str,
    params: &Attributes,
    ctx: &mut FilterContext<'_>,
) -> Result<String, FilterError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            return Err(FilterError::Message(
                "unterminated template token".to_owned(),
            ));
        };
        out.push_str(&expand_token(after[..end].trim(), params, ctx)?);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn expand_token(
    token: &str,
    params: &Attributes,
    ctx: &mut FilterContext<'_>,
) -> Result<String, FilterError> {
    let mut parts = token.split_whitespace();
    let head = parts.next().unwrap_or("");
    match head {
        "yield" => {
            let own = ctx.item_identifier().clone();
            Ok(ctx.compiled_content_of(&own, None)?.to_string())
        }
        "content" => {
            let target = required(parts.next(), "content")?;
            let snapshot = parts.next().map(SnapshotName::new);
            Ok(ctx
                .compiled_content_of(&Identifier::new(target), snapshot.as_ref())?
                .to_string())
        }
        "raw" => {
            let target = required(parts.next(), "raw")?;
            let content = ctx
                .item_raw_content(&Identifier::new(target))
                .ok_or_else(|| FilterError::Message(format!("no item matches {target}")))?;
            content
                .text()
                .map(str::to_owned)
                .ok_or_else(|| FilterError::Message(format!("raw content of {target} is binary")))
        }
        "attr" => {
            let target = required(parts.next(), "attr")?;
            let key = required(parts.next(), "attr")?;
            Ok(render_value(
                ctx.item_attribute(&Identifier::new(target), key),
            ))
        }
        "path" => {
            let target = required(parts.next(), "path")?;
            Ok(ctx
                .path_of(&Identifier::new(target))
                .map(|path| path.display().to_string())
                .unwrap_or_default())
        }
        "config" => {
            let key = required(parts.next(), "config")?;
            Ok(render_value(ctx.config_attribute(key)))
        }
        "layout" => {
            let key = required(parts.next(), "layout")?;
            Ok(render_value(ctx.layout_attribute(key)))
        }
        "param" => {
            let key = required(parts.next(), "param")?;
            Ok(render_value(params.get(key).cloned()))
        }
        other => Err(FilterError::Message(format!(
            "unknown template token '{other}'"
        ))),
    }
}

fn required<'t>(part: Option<&'t str>, token: &str) -> Result<&'t str, FilterError> {
    part.ok_or_else(|| {
        FilterError::Message(format!("template token '{token}' needs an argument"))
    })
}

fn render_value(value: Option<AttributeValue>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

/// Copies binary content to the designated output file.
struct CopyBinaryFilter;

impl Filter for CopyBinaryFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Binary
    }

    fn run(
        &self,
        input: FilterInput<'_>,
        _params: &Attributes,
        ctx: &mut FilterContext<'_>,
    ) -> Result<FilterOutput, FilterError> {
        let src = input
            .path()
            .ok_or_else(|| FilterError::Message("binary input expected".to_owned()))?;
        let dst = ctx
            .output_path()
            .ok_or_else(|| FilterError::Message("no output path".to_owned()))?;
        std::fs::copy(src, dst).map_err(|e| FilterError::Message(e.to_string()))?;
        Ok(FilterOutput::Binary)
    }
}

/// Writes textual content into a binary artifact.
struct TextToBinaryFilter;

impl Filter for TextToBinaryFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::TextToBinary
    }

    fn run(
        &self,
        input: FilterInput<'_>,
        _params: &Attributes,
        ctx: &mut FilterContext<'_>,
    ) -> Result<FilterOutput, FilterError> {
        let dst = ctx
            .output_path()
            .ok_or_else(|| FilterError::Message("no output path".to_owned()))?;
        std::fs::write(dst, input.text().unwrap_or_default().as_bytes())
            .map_err(|e| FilterError::Message(e.to_string()))?;
        Ok(FilterOutput::Binary)
    }
}

/// Reads a binary artifact back as UTF-8 text.
struct BinaryToTextFilter;

impl Filter for BinaryToTextFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::BinaryToText
    }

    fn run(
        &self,
        input: FilterInput<'_>,
        _params: &Attributes,
        _ctx: &mut FilterContext<'_>,
    ) -> Result<FilterOutput, FilterError> {
        let src = input
            .path()
            .ok_or_else(|| FilterError::Message("binary input expected".to_owned()))?;
        let bytes = std::fs::read(src).map_err(|e| FilterError::Message(e.to_string()))?;
        Ok(FilterOutput::Textual(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    }
}
