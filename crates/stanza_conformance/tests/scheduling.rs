//! Deferral and retry ordering when reps read each other's compiled
//! content.
//!
//! Reps are queued in site insertion order, so putting a reader before
//! its source forces the park/retry path instead of a lucky ordering.

use stanza_common::Identifier;
use stanza_compile::{CompileError, Notification};
use stanza_conformance::{attrs, filter_then_write, run_build, site_config, BuildOutcome, ProgramProvider};
use stanza_entities::{Content, Site};
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helper: event inspection
// ---------------------------------------------------------------------------

fn started_count(outcome: &BuildOutcome, item: &str) -> usize {
    outcome
        .notifications
        .iter()
        .filter(|event| {
            matches!(event, Notification::CompilationStarted { rep } if rep.item.as_str() == item)
        })
        .count()
}

fn ended_item_order(outcome: &BuildOutcome) -> Vec<String> {
    outcome
        .notifications
        .iter()
        .filter_map(|event| match event {
            Notification::CompilationEnded { rep } => Some(rep.item.to_string()),
            _ => None,
        })
        .collect()
}

fn read_output(dir: &Path, relative: &str) -> String {
    std::fs::read_to_string(dir.join("out").join(relative)).unwrap()
}

/// Builds a site of textual items, queued in the given order.
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

/// Routes every item to the template filter writing `<name>.html`.
fn route_all(provider: &mut ProgramProvider, identifiers: &[&str]) {
    for identifier in identifiers {
        let output = format!("/{}.html", identifier.trim_matches('/').trim_end_matches(".md"));
        provider.route(identifier, filter_then_write("template", &output));
    }
}

// ===========================================================================
// Category A: Deferral and retry
// ===========================================================================

#[test]
fn blocked_rep_waits_for_its_source() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let mut provider = ProgramProvider::new();
    route_all(&mut provider, &["/b.md", "/a.md"]);

    // The reader is queued first, so its first attempt must defer.
    let site = site_of(&[("/b.md", "<{{content /a.md}}>"), ("/a.md", "alpha")]);
    let outcome = run_build(&site, &config, &provider).unwrap();

    assert_eq!(started_count(&outcome, "/b.md"), 2);
    assert_eq!(started_count(&outcome, "/a.md"), 1);
    assert_eq!(read_output(dir.path(), "b.html"), "<alpha>");
}

#[test]
fn chains_resolve_in_reverse_insertion_order() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let mut provider = ProgramProvider::new();
    route_all(&mut provider, &["/c.md", "/b.md", "/a.md"]);

    let site = site_of(&[
        ("/c.md", "c({{content /b.md}})"),
        ("/b.md", "b({{content /a.md}})"),
        ("/a.md", "alpha"),
    ]);
    let outcome = run_build(&site, &config, &provider).unwrap();

    assert_eq!(ended_item_order(&outcome), vec!["/a.md", "/b.md", "/c.md"]);
    assert_eq!(read_output(dir.path(), "c.html"), "c(b(alpha))");
}

#[test]
fn diamonds_compile_each_rep_once() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let mut provider = ProgramProvider::new();
    route_all(&mut provider, &["/d.md", "/b.md", "/c.md", "/a.md"]);

    let site = site_of(&[
        ("/d.md", "{{content /b.md}}+{{content /c.md}}"),
        ("/b.md", "b({{content /a.md}})"),
        ("/c.md", "c({{content /a.md}})"),
        ("/a.md", "x"),
    ]);
    let outcome = run_build(&site, &config, &provider).unwrap();

    assert_eq!(
        ended_item_order(&outcome),
        vec!["/a.md", "/b.md", "/c.md", "/d.md"]
    );
    assert_eq!(read_output(dir.path(), "d.html"), "b(x)+c(x)");
}

#[test]
fn independent_reps_proceed_while_one_waits() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let mut provider = ProgramProvider::new();
    route_all(&mut provider, &["/b.md", "/x.md", "/a.md"]);

    let site = site_of(&[
        ("/b.md", "<{{content /a.md}}>"),
        ("/x.md", "independent"),
        ("/a.md", "alpha"),
    ]);
    let outcome = run_build(&site, &config, &provider).unwrap();

    assert_eq!(ended_item_order(&outcome), vec!["/x.md", "/a.md", "/b.md"]);
}

// ===========================================================================
// Category B: Cycles
// ===========================================================================

#[test]
fn mutual_reads_fail_with_cycle_error() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let mut provider = ProgramProvider::new();
    route_all(&mut provider, &["/a.md", "/b.md"]);

    let site = site_of(&[
        ("/a.md", "{{content /b.md}}"),
        ("/b.md", "{{content /a.md}}"),
    ]);
    let err = run_build(&site, &config, &provider).unwrap_err();

    match err {
        CompileError::DependencyCycle { description } => {
            assert!(description.contains("waits for"));
            assert!(description.contains("/a.md"));
            assert!(description.contains("/b.md"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ===========================================================================
// Category C: Cached sources
// ===========================================================================

#[test]
fn cached_sources_still_unblock_their_readers() {
    let dir = TempDir::new().unwrap();
    let config = site_config(dir.path());
    let mut provider = ProgramProvider::new();
    route_all(&mut provider, &["/b.md", "/a.md"]);

    run_build(
        &site_of(&[("/b.md", "<{{content /a.md}}>"), ("/a.md", "alpha")]),
        &config,
        &provider,
    )
    .unwrap();

    // Only the reader changes; its source is served from cache, and that
    // restoration must still release the parked reader.
    let second = run_build(
        &site_of(&[("/b.md", "<{{content /a.md}}> v2"), ("/a.md", "alpha")]),
        &config,
        &provider,
    )
    .unwrap();

    let compiled: Vec<String> = second
        .summary
        .compiled
        .iter()
        .map(|rep| rep.item.to_string())
        .collect();
    let restored: Vec<String> = second
        .summary
        .restored
        .iter()
        .map(|rep| rep.item.to_string())
        .collect();
    assert_eq!(compiled, vec!["/b.md"]);
    assert_eq!(restored, vec!["/a.md"]);
    assert_eq!(started_count(&second, "/b.md"), 2);
    assert_eq!(read_output(dir.path(), "b.html"), "<alpha> v2");
}
