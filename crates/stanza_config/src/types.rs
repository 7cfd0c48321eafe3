//! Configuration types deserialized from `stanza.toml`.

use serde::Deserialize;
use stanza_common::{Attributes, Checksum, Fingerprint};
use std::path::PathBuf;

/// The site configuration parsed from the `[site]` table of `stanza.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// The site name.
    pub name: String,
    /// Directory that compiled outputs are written into.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Directory that persisted build state (stores, cached content) lives in.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    /// How layout patterns are matched.
    #[serde(default)]
    pub pattern_type: PatternType,
    /// File extensions whose contents are treated as text by data sources.
    #[serde(default = "default_text_extensions")]
    pub text_extensions: Vec<String>,
    /// Free-form site attributes, readable by filters through the tracked
    /// accessors and fingerprinted like document attributes.
    #[serde(default)]
    pub attributes: Attributes,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("tmp/stanza")
}

fn default_text_extensions() -> Vec<String> {
    ["css", "erb", "htm", "html", "js", "md", "txt", "xml"]
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}

impl SiteConfig {
    /// Computes the configuration's change-detection fingerprint.
    ///
    /// The attribute half covers the free-form `[site.attributes]` table;
    /// the content half covers the typed fields. Dependency edges onto the
    /// configuration carry the attributes aspect, so changing a typed field
    /// does not invalidate attribute-only dependents.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut buf = Vec::new();
        buf.extend_from_slice(self.name.as_bytes());
        buf.push(0);
        buf.extend_from_slice(self.output_dir.to_string_lossy().as_bytes());
        buf.push(0);
        buf.extend_from_slice(self.state_dir.to_string_lossy().as_bytes());
        buf.push(0);
        buf.extend_from_slice(match self.pattern_type {
            PatternType::Glob => b"glob",
            PatternType::Legacy => b"legacy",
        });
        buf.push(0);
        for ext in &self.text_extensions {
            buf.extend_from_slice(ext.as_bytes());
            buf.push(0);
        }
        Fingerprint {
            attributes: Checksum::of_attributes(&self.attributes),
            content: Checksum::from_bytes(&buf),
        }
    }
}

/// How patterns passed to layout resolution are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    /// Glob matching: `*`, `?` and `**` are wildcards.
    #[default]
    Glob,
    /// Exact identifier matching only.
    Legacy,
}
