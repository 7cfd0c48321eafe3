//! Error types surfaced by compilation.
//!
//! Every rep-level error names the item and representation it occurred
//! in, plus the offending filter, layout, or snapshot, so a failure deep
//! inside a program can be reported without a separate context layer.

use stanza_common::{Identifier, InternalError, RepName, RepRef};
use stanza_entities::SnapshotName;
use stanza_store::StoreError;
use std::path::PathBuf;

/// Errors that can occur while compiling a site.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A filter step named a filter that is not registered.
    #[error("unknown filter '{name}' for item {item}, rep {rep}")]
    UnknownFilter {
        /// Item being compiled.
        item: Identifier,
        /// Representation being compiled.
        rep: RepName,
        /// The unregistered filter name.
        name: String,
    },

    /// A binary-input filter was applied to textual content.
    #[error("cannot use binary filter '{name}' on textual content of item {item}, rep {rep}")]
    CannotUseBinaryFilter {
        /// Item being compiled.
        item: Identifier,
        /// Representation being compiled.
        rep: RepName,
        /// The mismatched filter name.
        name: String,
    },

    /// A textual-input filter was applied to binary content.
    #[error("cannot use textual filter '{name}' on binary content of item {item}, rep {rep}")]
    CannotUseTextualFilter {
        /// Item being compiled.
        item: Identifier,
        /// Representation being compiled.
        rep: RepName,
        /// The mismatched filter name.
        name: String,
    },

    /// A binary-output filter returned without writing its output file.
    #[error("filter '{name}' did not write its output for item {item}, rep {rep}")]
    OutputNotWritten {
        /// Item being compiled.
        item: Identifier,
        /// Representation being compiled.
        rep: RepName,
        /// The filter that should have written the file.
        name: String,
    },

    /// A layout step's pattern matched no layout.
    #[error("no layout matches '{pattern}' for item {item}, rep {rep}")]
    UnknownLayout {
        /// Item being compiled.
        item: Identifier,
        /// Representation being compiled.
        rep: RepName,
        /// The pattern that matched nothing.
        pattern: String,
    },

    /// The resolved layout has no filter assigned to render it.
    #[error("no filter defined for layout {layout}, used by item {item}, rep {rep}")]
    UndefinedFilterForLayout {
        /// Item being compiled.
        item: Identifier,
        /// Representation being compiled.
        rep: RepName,
        /// The layout with no filter assignment.
        layout: Identifier,
    },

    /// A layout step was reached while the working content was binary.
    #[error("cannot lay out binary content of item {item}, rep {rep}")]
    CannotLayoutBinaryItem {
        /// Item being compiled.
        item: Identifier,
        /// Representation being compiled.
        rep: RepName,
    },

    /// A snapshot name was captured twice in one program.
    #[error("snapshot '{snapshot}' captured twice for item {item}, rep {rep}")]
    DuplicateSnapshot {
        /// Item being compiled.
        item: Identifier,
        /// Representation being compiled.
        rep: RepName,
        /// The repeated snapshot name.
        snapshot: SnapshotName,
    },

    /// A filter ran and reported an error of its own.
    #[error("filter '{name}' failed for item {item}, rep {rep}: {reason}")]
    FilterFailed {
        /// Item being compiled.
        item: Identifier,
        /// Representation being compiled.
        rep: RepName,
        /// The failing filter.
        name: String,
        /// The filter's own error message.
        reason: String,
    },

    /// Compilation needs another rep's compiled content first.
    ///
    /// The scheduler catches this, parks the rep, and retries it after
    /// the blocking rep finishes. It only escapes to callers when the
    /// blocker can never finish.
    #[error("item {item}, rep {rep} requires compiled content of {blocker}")]
    UnmetDependency {
        /// Item being compiled.
        item: Identifier,
        /// Representation being compiled.
        rep: RepName,
        /// The rep whose compiled content is needed.
        blocker: RepRef,
    },

    /// Every remaining rep is waiting on another remaining rep.
    #[error("dependency cycle between reps: {description}")]
    DependencyCycle {
        /// The stuck reps and what each is waiting for.
        description: String,
    },

    /// Writing a compiled output file failed.
    #[error("failed to write output {path}: {source}")]
    OutputWrite {
        /// The output path being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A store could not be written back.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An internal invariant was violated.
    #[error(transparent)]
    Internal(#[from] InternalError),
}
