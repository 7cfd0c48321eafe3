//! End-to-end incremental rebuild behavior.
//!
//! Every test drives complete runs through the compiler: build once,
//! change something (or nothing), build again from the persisted state,
//! and check which reps replayed and which were restored from cache.

use stanza_common::{AttributeValue, Identifier, RepName, RepRef};
use stanza_compile::Notification;
use stanza_conformance::{
    attrs, filter_then_write, run_build, site_config, write_only, BuildOutcome, ProgramProvider,
};
use stanza_entities::{Content, Site, SnapshotName};
use stanza_store::{ActionKey, ActionSequence, ActionStore};
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helper: summaries and outputs
// ---------------------------------------------------------------------------

fn compiled_items(outcome: &BuildOutcome) -> Vec<String> {
    let mut items: Vec<String> = outcome
        .summary
        .compiled
        .iter()
        .map(|rep| rep.item.to_string())
        .collect();
    items.sort();
    items
}

fn restored_items(outcome: &BuildOutcome) -> Vec<String> {
    let mut items: Vec<String> = outcome
        .summary
        .restored
        .iter()
        .map(|rep| rep.item.to_string())
        .collect();
    items.sort();
    items
}

fn read_output(dir: &Path, relative: &str) -> String {
    std::fs::read_to_string(dir.join("out").join(relative)).unwrap()
}

/// Builds a site of textual items with no attributes.
fn site_of(items: &[(&str, &str)]) -> Site {
    let mut site = Site::new();
    for (identifier, body) in items {
        site.add_item(
            Identifier::new(identifier),
            attrs(&[]),
            Content::textual(*body),
        );
    }
    site
}

/// A program that appends `text` and writes the result to `path`.
fn append_then_write(text: &str, path: &str) -> ActionSequence {
    let mut program = ActionSequence::new();
    program.add_filter("append", attrs(&[("text", AttributeValue::from(text))]));
    program.add_snapshot(SnapshotName::last(), Some(path.into()));
    program
}

// ===========================================================================
// Category A: Freshness and restoration
// ===========================================================================

#[test]
fn fresh_site_compiles_every_rep() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let mut provider = ProgramProvider::new();
    provider.route("/a.md", filter_then_write("upcase", "/a.html"));
    provider.route("/b.md", filter_then_write("upcase", "/b.html"));

    let outcome = run_build(
        &site_of(&[("/a.md", "alpha"), ("/b.md", "beta")]),
        &config,
        &provider,
    )
    .unwrap();

    assert_eq!(compiled_items(&outcome), vec!["/a.md", "/b.md"]);
    assert!(restored_items(&outcome).is_empty());
    assert_eq!(read_output(dir.path(), "a.html"), "ALPHA");
    assert_eq!(read_output(dir.path(), "b.html"), "BETA");
}

#[test]
fn unchanged_site_restores_every_rep() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let mut provider = ProgramProvider::new();
    provider.route("/a.md", filter_then_write("upcase", "/a.html"));

    run_build(&site_of(&[("/a.md", "alpha")]), &config, &provider).unwrap();
    let second = run_build(&site_of(&[("/a.md", "alpha")]), &config, &provider).unwrap();

    assert!(compiled_items(&second).is_empty());
    assert_eq!(restored_items(&second), vec!["/a.md"]);
    assert_eq!(read_output(dir.path(), "a.html"), "ALPHA");
}

#[test]
fn missing_content_cache_forces_recompilation() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let mut provider = ProgramProvider::new();
    provider.route("/a.md", filter_then_write("upcase", "/a.html"));

    run_build(&site_of(&[("/a.md", "alpha")]), &config, &provider).unwrap();
    std::fs::remove_file(dir.path().join("state/content.cache")).unwrap();
    let second = run_build(&site_of(&[("/a.md", "alpha")]), &config, &provider).unwrap();

    // Fresh, but unservable from cache.
    assert_eq!(compiled_items(&second), vec!["/a.md"]);
    assert!(restored_items(&second).is_empty());
    assert!(!second
        .notifications
        .iter()
        .any(|event| matches!(event, Notification::CachedContentUsed { .. })));
    assert_eq!(read_output(dir.path(), "a.html"), "ALPHA");
}

// ===========================================================================
// Category B: Document edits and aspect masks
// ===========================================================================

#[test]
fn content_edit_recompiles_only_the_edited_item() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let mut provider = ProgramProvider::new();
    provider.route("/a.md", filter_then_write("upcase", "/a.html"));
    provider.route("/b.md", filter_then_write("upcase", "/b.html"));

    run_build(
        &site_of(&[("/a.md", "alpha"), ("/b.md", "beta")]),
        &config,
        &provider,
    )
    .unwrap();
    let second = run_build(
        &site_of(&[("/a.md", "alpha two"), ("/b.md", "beta")]),
        &config,
        &provider,
    )
    .unwrap();

    assert_eq!(compiled_items(&second), vec!["/a.md"]);
    assert_eq!(restored_items(&second), vec!["/b.md"]);
    assert_eq!(read_output(dir.path(), "a.html"), "ALPHA TWO");
}

#[test]
fn content_edit_reaches_compiled_content_readers() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let mut provider = ProgramProvider::new();
    provider.route("/a.md", filter_then_write("upcase", "/a.html"));
    provider.route("/b.md", filter_then_write("template", "/b.html"));
    provider.route("/c.md", filter_then_write("upcase", "/c.html"));

    let items = |a: &'static str| {
        site_of(&[
            ("/a.md", a),
            ("/b.md", "<{{content /a.md}}>"),
            ("/c.md", "gamma"),
        ])
    };

    run_build(&items("alpha"), &config, &provider).unwrap();
    assert_eq!(read_output(dir.path(), "b.html"), "<ALPHA>");

    let second = run_build(&items("omega"), &config, &provider).unwrap();

    assert_eq!(compiled_items(&second), vec!["/a.md", "/b.md"]);
    assert_eq!(restored_items(&second), vec!["/c.md"]);
    assert_eq!(read_output(dir.path(), "b.html"), "<OMEGA>");
}

#[test]
fn attribute_edit_spares_raw_content_readers() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let mut provider = ProgramProvider::new();
    provider.route("/a.md", filter_then_write("upcase", "/a.html"));
    provider.route("/b.md", filter_then_write("template", "/b.html"));

    let site_with_title = |title: &'static str| {
        let mut site = Site::new();
        site.add_item(
            Identifier::new("/a.md"),
            attrs(&[("title", AttributeValue::from(title))]),
            Content::textual("alpha"),
        );
        site.add_item(
            Identifier::new("/b.md"),
            attrs(&[]),
            Content::textual("({{raw /a.md}})"),
        );
        site
    };

    run_build(&site_with_title("One"), &config, &provider).unwrap();
    assert_eq!(read_output(dir.path(), "b.html"), "(alpha)");

    let second = run_build(&site_with_title("Two"), &config, &provider).unwrap();

    // Only the attribute half changed; a raw-content edge does not care.
    assert_eq!(compiled_items(&second), vec!["/a.md"]);
    assert_eq!(restored_items(&second), vec!["/b.md"]);
}

#[test]
fn attribute_edit_rebuilds_attribute_readers() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let mut provider = ProgramProvider::new();
    provider.route("/a.md", filter_then_write("upcase", "/a.html"));
    provider.route("/b.md", filter_then_write("template", "/b.html"));

    let site_with_title = |title: &'static str| {
        let mut site = Site::new();
        site.add_item(
            Identifier::new("/a.md"),
            attrs(&[("title", AttributeValue::from(title))]),
            Content::textual("alpha"),
        );
        site.add_item(
            Identifier::new("/b.md"),
            attrs(&[]),
            Content::textual("{{attr /a.md title}}"),
        );
        site
    };

    run_build(&site_with_title("One"), &config, &provider).unwrap();
    assert_eq!(read_output(dir.path(), "b.html"), "One");

    let second = run_build(&site_with_title("Two"), &config, &provider).unwrap();

    assert_eq!(compiled_items(&second), vec!["/a.md", "/b.md"]);
    assert_eq!(read_output(dir.path(), "b.html"), "Two");
}

#[test]
fn raw_content_readers_ignore_upstream_changes() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let mut provider = ProgramProvider::new();
    provider.route("/a.md", filter_then_write("upcase", "/a.html"));
    provider.route("/b.md", filter_then_write("template", "/b.html"));
    provider.route("/d.md", filter_then_write("template", "/d.html"));

    // b reads a's compiled content; d reads only b's raw source.
    let items = |a: &'static str| {
        site_of(&[
            ("/a.md", a),
            ("/b.md", "<{{content /a.md}}>"),
            ("/d.md", "({{raw /b.md}})"),
        ])
    };

    run_build(&items("alpha"), &config, &provider).unwrap();
    let second = run_build(&items("omega"), &config, &provider).unwrap();

    // b is outdated through its compiled-content edge, but b's raw source
    // is byte-identical, so d stays fresh: propagation stops after one
    // hop for non-compiled aspects.
    assert_eq!(compiled_items(&second), vec!["/a.md", "/b.md"]);
    assert_eq!(restored_items(&second), vec!["/d.md"]);
}

// ===========================================================================
// Category C: Configuration and rule edits
// ===========================================================================

#[test]
fn config_attribute_edit_rebuilds_config_readers() {
    let dir = TempDir::new().unwrap();
    let mut provider = ProgramProvider::new();
    provider.route("/a.md", filter_then_write("template", "/a.html"));
    provider.route("/b.md", filter_then_write("upcase", "/b.html"));

    let site = site_of(&[("/a.md", "{{config base_url}}"), ("/b.md", "beta")]);

    let config = site_config(dir.path());
    run_build(&site, &config, &provider).unwrap();
    assert_eq!(read_output(dir.path(), "a.html"), "https://example.test");

    let mut changed = site_config(dir.path());
    changed
        .attributes
        .insert("base_url".to_owned(), AttributeValue::from("https://moved.test"));
    let second = run_build(&site, &changed, &provider).unwrap();

    assert_eq!(compiled_items(&second), vec!["/a.md"]);
    assert_eq!(restored_items(&second), vec!["/b.md"]);
    assert_eq!(read_output(dir.path(), "a.html"), "https://moved.test");
}

#[test]
fn rule_edit_recompiles_the_rerouted_rep() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let site = site_of(&[("/a.md", "alpha"), ("/b.md", "beta")]);

    let mut before = ProgramProvider::new();
    before.route("/a.md", filter_then_write("upcase", "/a.html"));
    before.route("/b.md", filter_then_write("upcase", "/b.html"));
    run_build(&site, &config, &before).unwrap();
    assert_eq!(read_output(dir.path(), "a.html"), "ALPHA");

    let mut after = ProgramProvider::new();
    after.route("/a.md", write_only("/a.html"));
    after.route("/b.md", filter_then_write("upcase", "/b.html"));
    let second = run_build(&site, &config, &after).unwrap();

    assert_eq!(compiled_items(&second), vec!["/a.md"]);
    assert_eq!(restored_items(&second), vec!["/b.md"]);
    assert_eq!(read_output(dir.path(), "a.html"), "alpha");
}

#[test]
fn path_reroute_rebuilds_path_readers() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let site = site_of(&[("/a.md", "alpha"), ("/b.md", "{{path /a.md}}")]);

    let mut before = ProgramProvider::new();
    before.route("/a.md", filter_then_write("upcase", "/a.html"));
    before.route("/b.md", filter_then_write("template", "/b.html"));
    run_build(&site, &config, &before).unwrap();
    assert!(read_output(dir.path(), "b.html").contains("a.html"));

    let mut after = ProgramProvider::new();
    after.route("/a.md", filter_then_write("upcase", "/moved/a.html"));
    after.route("/b.md", filter_then_write("template", "/b.html"));
    let second = run_build(&site, &config, &after).unwrap();

    assert_eq!(compiled_items(&second), vec!["/a.md", "/b.md"]);
    assert!(read_output(dir.path(), "b.html").contains("moved"));
    assert_eq!(read_output(dir.path(), "moved/a.html"), "ALPHA");
}

#[test]
fn param_only_rule_edit_spares_path_readers() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let site = site_of(&[("/a.md", "alpha"), ("/b.md", "{{path /a.md}}")]);

    let mut before = ProgramProvider::new();
    before.route("/a.md", append_then_write("!", "/a.html"));
    before.route("/b.md", filter_then_write("template", "/b.html"));
    run_build(&site, &config, &before).unwrap();
    assert_eq!(read_output(dir.path(), "a.html"), "alpha!");

    let mut after = ProgramProvider::new();
    after.route("/a.md", append_then_write("?", "/a.html"));
    after.route("/b.md", filter_then_write("template", "/b.html"));
    let second = run_build(&site, &config, &after).unwrap();

    // The program changed, but every declared path stayed put.
    assert_eq!(compiled_items(&second), vec!["/a.md"]);
    assert_eq!(restored_items(&second), vec!["/b.md"]);
    assert_eq!(read_output(dir.path(), "a.html"), "alpha?");
}

// ===========================================================================
// Category D: Structural changes
// ===========================================================================

#[test]
fn vanished_item_rebuilds_its_dependents() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let mut provider = ProgramProvider::new();
    provider.route("/a.md", filter_then_write("upcase", "/a.html"));
    provider.route("/b.md", filter_then_write("template", "/b.html"));

    let both = {
        let mut site = Site::new();
        site.add_item(
            Identifier::new("/a.md"),
            attrs(&[("note", AttributeValue::from("here"))]),
            Content::textual("alpha"),
        );
        site.add_item(
            Identifier::new("/b.md"),
            attrs(&[]),
            Content::textual("{{attr /a.md note}}"),
        );
        site
    };

    run_build(&both, &config, &provider).unwrap();
    assert_eq!(read_output(dir.path(), "b.html"), "here");

    let only_b = site_of(&[("/b.md", "{{attr /a.md note}}")]);
    let second = run_build(&only_b, &config, &provider).unwrap();

    assert_eq!(compiled_items(&second), vec!["/b.md"]);
    assert_eq!(read_output(dir.path(), "b.html"), "");
}

#[test]
fn new_item_compiles_alongside_restored_ones() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let mut provider = ProgramProvider::new();
    provider.route("/a.md", filter_then_write("upcase", "/a.html"));
    provider.route("/c.md", filter_then_write("upcase", "/c.html"));

    run_build(&site_of(&[("/a.md", "alpha")]), &config, &provider).unwrap();
    let second = run_build(
        &site_of(&[("/a.md", "alpha"), ("/c.md", "gamma")]),
        &config,
        &provider,
    )
    .unwrap();

    assert_eq!(compiled_items(&second), vec!["/c.md"]);
    assert_eq!(restored_items(&second), vec!["/a.md"]);
    assert_eq!(read_output(dir.path(), "c.html"), "GAMMA");
}

#[test]
fn deleted_output_file_is_rewritten() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let mut provider = ProgramProvider::new();
    provider.route("/a.md", filter_then_write("upcase", "/a.html"));
    provider.route("/b.md", filter_then_write("upcase", "/b.html"));

    let site = site_of(&[("/a.md", "alpha"), ("/b.md", "beta")]);
    run_build(&site, &config, &provider).unwrap();
    std::fs::remove_file(dir.path().join("out/a.html")).unwrap();

    let second = run_build(&site, &config, &provider).unwrap();

    assert_eq!(compiled_items(&second), vec!["/a.md"]);
    assert_eq!(restored_items(&second), vec!["/b.md"]);
    assert_eq!(read_output(dir.path(), "a.html"), "ALPHA");
}

#[test]
fn dropped_rep_name_is_pruned_from_the_stores() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let site = site_of(&[("/a.md", "alpha")]);

    let mut before = ProgramProvider::new();
    before.route("/a.md", filter_then_write("upcase", "/a.html"));
    before.route_rep("/a.md", "feed", write_only("/a.xml"));
    let first = run_build(&site, &config, &before).unwrap();
    assert_eq!(first.summary.compiled.len(), 2);
    assert_eq!(read_output(dir.path(), "a.xml"), "alpha");

    let mut after = ProgramProvider::new();
    after.route("/a.md", filter_then_write("upcase", "/a.html"));
    let second = run_build(&site, &config, &after).unwrap();

    assert!(compiled_items(&second).is_empty());
    assert_eq!(restored_items(&second), vec!["/a.md"]);

    let store = ActionStore::load_or_create(&dir.path().join("state/actions.json"));
    let feed = ActionKey::Rep(RepRef::new(Identifier::new("/a.md"), RepName::new("feed")));
    let default = ActionKey::Rep(RepRef::new(
        Identifier::new("/a.md"),
        RepName::default_rep(),
    ));
    assert!(store.memory_for(&feed).is_none());
    assert!(store.memory_for(&default).is_some());
}
