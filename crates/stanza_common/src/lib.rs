//! Shared foundational types used across the Stanza build core.
//!
//! This crate provides the vocabulary the rest of the workspace speaks:
//! path-like identifiers and persisted reference forms, structured attribute
//! tables, content checksums and fingerprints, identifier patterns, and
//! shared error types.

#![warn(missing_docs)]

pub mod attributes;
pub mod checksum;
pub mod identifier;
pub mod pattern;
pub mod result;

pub use attributes::{AttributeValue, Attributes};
pub use checksum::{Checksum, Fingerprint};
pub use identifier::{EntityRef, Identifier, RepName, RepRef};
pub use pattern::Pattern;
pub use result::InternalError;
