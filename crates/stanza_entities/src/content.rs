//! Document content, textual or binary.
//!
//! Textual content lives in memory behind a cheap-to-clone `Arc<str>`.
//! Binary content is a path to a file on disk; its bytes are only read
//! when a checksum or an output copy is needed.

use serde::{Deserialize, Serialize};
use stanza_common::Checksum;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The content of a document or snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ContentRepr", into = "ContentRepr")]
pub enum Content {
    /// UTF-8 text held in memory.
    Textual(Arc<str>),
    /// A file on disk, identified by path.
    Binary(PathBuf),
}

impl Content {
    /// Creates textual content.
    pub fn textual(text: impl Into<Arc<str>>) -> Self {
        Content::Textual(text.into())
    }

    /// Creates binary content referencing a file on disk.
    pub fn binary(path: impl Into<PathBuf>) -> Self {
        Content::Binary(path.into())
    }

    /// Returns `true` if this content is binary.
    pub fn is_binary(&self) -> bool {
        matches!(self, Content::Binary(_))
    }

    /// Returns `true` if this content is textual.
    pub fn is_textual(&self) -> bool {
        matches!(self, Content::Textual(_))
    }

    /// Returns the text, if this content is textual.
    pub fn text(&self) -> Option<&str> {
        match self {
            Content::Textual(text) => Some(text),
            Content::Binary(_) => None,
        }
    }

    /// Returns the file path, if this content is binary.
    pub fn binary_path(&self) -> Option<&Path> {
        match self {
            Content::Textual(_) => None,
            Content::Binary(path) => Some(path),
        }
    }

    /// Computes the checksum of the content bytes.
    ///
    /// For binary content the backing file is read; `None` means the file
    /// could not be read, which callers treat as "changed" so that stale
    /// state is never trusted.
    pub fn checksum(&self) -> Option<Checksum> {
        match self {
            Content::Textual(text) => Some(Checksum::from_bytes(text.as_bytes())),
            Content::Binary(path) => {
                let bytes = std::fs::read(path).ok()?;
                Some(Checksum::from_bytes(&bytes))
            }
        }
    }
}

/// Serialization mirror of [`Content`]; keeps the public type free to use
/// `Arc<str>` internally.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ContentRepr {
    Textual(String),
    Binary(PathBuf),
}

impl From<ContentRepr> for Content {
    fn from(repr: ContentRepr) -> Self {
        match repr {
            ContentRepr::Textual(text) => Content::textual(text),
            ContentRepr::Binary(path) => Content::Binary(path),
        }
    }
}

impl From<Content> for ContentRepr {
    fn from(content: Content) -> Self {
        match content {
            Content::Textual(text) => ContentRepr::Textual(text.as_ref().to_owned()),
            Content::Binary(path) => ContentRepr::Binary(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn textual_checksum_matches_byte_checksum() {
        let content = Content::textual("hello");
        assert_eq!(content.checksum(), Some(Checksum::from_bytes(b"hello")));
    }

    #[test]
    fn binary_checksum_reads_backing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        fs::write(&path, b"\x00\x01\x02").unwrap();

        let content = Content::binary(&path);
        assert_eq!(
            content.checksum(),
            Some(Checksum::from_bytes(b"\x00\x01\x02"))
        );
    }

    #[test]
    fn missing_binary_file_has_no_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let content = Content::binary(dir.path().join("gone.bin"));
        assert_eq!(content.checksum(), None);
    }

    #[test]
    fn kind_predicates() {
        assert!(Content::textual("x").is_textual());
        assert!(!Content::textual("x").is_binary());
        assert!(Content::binary("/tmp/x").is_binary());
        assert_eq!(Content::textual("x").text(), Some("x"));
        assert_eq!(Content::binary("/tmp/x").text(), None);
    }

    #[test]
    fn serde_round_trip_both_variants() {
        let textual = Content::textual("body");
        let binary = Content::binary("/assets/logo.png");

        let json = serde_json::to_string(&textual).unwrap();
        assert_eq!(serde_json::from_str::<Content>(&json).unwrap(), textual);

        let json = serde_json::to_string(&binary).unwrap();
        assert_eq!(serde_json::from_str::<Content>(&json).unwrap(), binary);
    }
}
