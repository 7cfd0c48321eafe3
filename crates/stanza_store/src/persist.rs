//! Shared load/save plumbing for the persisted stores.
//!
//! Two on-disk shapes exist. Human-readable stores use a versioned JSON
//! envelope. The content cache uses a framed binary format: a 4-byte
//! little-endian header length, a bincode header with magic bytes, format
//! version and payload checksum, then the bincode payload. Loading either
//! shape is fail-safe: any validation failure reads as "no stored data".

use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stanza_common::Checksum;
use std::path::Path;

/// Magic bytes identifying a Stanza binary store file.
const FRAME_MAGIC: [u8; 4] = *b"STNZ";

#[derive(Deserialize)]
struct Envelope<T> {
    version: u32,
    data: T,
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T: Serialize> {
    version: u32,
    data: &'a T,
}

/// Header prepended to every framed binary store file for validation.
#[derive(Debug, Serialize, Deserialize)]
struct FrameHeader {
    /// Magic bytes: must be `b"STNZ"`.
    magic: [u8; 4],
    /// Format version of the payload encoding.
    format_version: u32,
    /// Stanza version that produced the file.
    stanza_version: String,
    /// Checksum of the payload (for corruption detection).
    checksum: Checksum,
}

/// Loads a JSON store file.
///
/// Returns `None` if the file is missing, unreadable, malformed, or was
/// written with a different format version.
pub fn load_json<T: DeserializeOwned>(path: &Path, version: u32) -> Option<T> {
    let content = std::fs::read_to_string(path).ok()?;
    let envelope: Envelope<T> = serde_json::from_str(&content).ok()?;
    (envelope.version == version).then_some(envelope.data)
}

/// Saves a JSON store file inside a versioned envelope.
pub fn save_json<T: Serialize>(path: &Path, version: u32, data: &T) -> Result<(), StoreError> {
    let envelope = EnvelopeRef { version, data };
    let json =
        serde_json::to_string_pretty(&envelope).map_err(|e| StoreError::Serialization {
            reason: e.to_string(),
        })?;
    write_atomic(path, json.as_bytes())
}

/// Loads a framed binary store file.
///
/// Returns `None` on any validation failure: missing or truncated file,
/// wrong magic, wrong format version, checksum mismatch, or undecodable
/// payload.
pub fn load_framed<T: DeserializeOwned>(path: &Path, format_version: u32) -> Option<T> {
    let raw = std::fs::read(path).ok()?;
    if raw.len() < 4 {
        return None;
    }

    let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
    if raw.len() < 4 + header_len {
        return None;
    }

    let header: FrameHeader =
        bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
            .ok()?
            .0;
    if header.magic != FRAME_MAGIC || header.format_version != format_version {
        return None;
    }

    let payload = &raw[4 + header_len..];
    if Checksum::from_bytes(payload) != header.checksum {
        return None;
    }

    bincode::serde::decode_from_slice(payload, bincode::config::standard())
        .ok()
        .map(|(value, _)| value)
}

/// Saves a framed binary store file.
pub fn save_framed<T: Serialize>(
    path: &Path,
    format_version: u32,
    data: &T,
) -> Result<(), StoreError> {
    let payload = bincode::serde::encode_to_vec(data, bincode::config::standard()).map_err(|e| {
        StoreError::Serialization {
            reason: e.to_string(),
        }
    })?;

    let header = FrameHeader {
        magic: FRAME_MAGIC,
        format_version,
        stanza_version: env!("CARGO_PKG_VERSION").to_string(),
        checksum: Checksum::from_bytes(&payload),
    };
    let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
        .map_err(|e| StoreError::Serialization {
            reason: e.to_string(),
        })?;

    let header_len = header_bytes.len() as u32;
    let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(&payload);

    write_atomic(path, &output)
}

/// Writes a file through a temporary sibling and a rename, so a crash
/// mid-write never leaves a truncated store behind.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes).map_err(|e| StoreError::Io {
        path: tmp.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp, path).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
