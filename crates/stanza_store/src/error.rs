//! Error types for store persistence.

use std::path::PathBuf;

/// Errors that can occur while writing persisted state.
///
/// Reading never produces these: loads are fail-safe and fall back to an
/// empty store instead.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An I/O error at a specific path.
    #[error("store I/O error at {path}: {source}")]
    Io {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization of store contents failed.
    #[error("store serialization error: {reason}")]
    Serialization {
        /// Why serialization failed.
        reason: String,
    },
}
