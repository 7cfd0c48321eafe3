//! Content-derived checksums for change detection between runs.
//!
//! Every document carries a [`Fingerprint`] made of two independent
//! [`Checksum`]s, one over its raw content and one over its attribute table.
//! Outdatedness decisions compare the halves separately, so an attribute
//! edit does not look like a content edit.

use crate::attributes::{AttributeValue, Attributes};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A 128-bit XXH3 checksum of some piece of content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum([u8; 16]);

impl Checksum {
    /// Computes the checksum of a byte slice.
    pub fn from_bytes(data: &[u8]) -> Self {
        Checksum(xxhash_rust::xxh3::xxh3_128(data).to_le_bytes())
    }

    /// Computes the checksum of an attribute table.
    ///
    /// The table is digested through a canonical byte encoding: map entries
    /// in key order, every value prefixed with a type tag and length. Two
    /// structurally equal tables therefore always produce the same checksum,
    /// and values of different types never collide by sharing a rendering
    /// (the integer `1` and the string `"1"` digest differently).
    pub fn of_attributes(attributes: &Attributes) -> Self {
        let mut buf = Vec::new();
        digest_map(attributes, &mut buf);
        Checksum::from_bytes(&buf)
    }

    /// Returns the raw checksum bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

fn digest_map(map: &BTreeMap<String, AttributeValue>, out: &mut Vec<u8>) {
    out.push(b'm');
    out.extend_from_slice(&(map.len() as u64).to_le_bytes());
    for (key, value) in map {
        out.extend_from_slice(&(key.len() as u64).to_le_bytes());
        out.extend_from_slice(key.as_bytes());
        digest_value(value, out);
    }
}

fn digest_value(value: &AttributeValue, out: &mut Vec<u8>) {
    match value {
        AttributeValue::Bool(b) => {
            out.push(b'b');
            out.push(u8::from(*b));
        }
        AttributeValue::Int(i) => {
            out.push(b'i');
            out.extend_from_slice(&i.to_le_bytes());
        }
        AttributeValue::Float(f) => {
            out.push(b'f');
            out.extend_from_slice(&f.to_bits().to_le_bytes());
        }
        AttributeValue::String(s) => {
            out.push(b's');
            out.extend_from_slice(&(s.len() as u64).to_le_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        AttributeValue::Array(values) => {
            out.push(b'a');
            out.extend_from_slice(&(values.len() as u64).to_le_bytes());
            for value in values {
                digest_value(value, out);
            }
        }
        AttributeValue::Map(map) => digest_map(map, out),
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// The pair of checksums recorded for a document: one over its attribute
/// table and one over its raw content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Checksum of the attribute table.
    pub attributes: Checksum,
    /// Checksum of the raw content bytes.
    pub content: Checksum,
}
