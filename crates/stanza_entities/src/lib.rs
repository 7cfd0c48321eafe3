//! In-memory data model for one build run.
//!
//! A [`Site`] holds the immutable inputs of a run: items and layouts, stored
//! densely and indexed by identifier. A [`RepSet`] holds the mutable side:
//! one [`ItemRep`] per representation of each item, accumulating snapshots
//! as compilation progresses. Both are rebuilt from scratch every run; only
//! persisted reference forms from `stanza_common` survive between runs.

#![warn(missing_docs)]

pub mod arena;
pub mod content;
pub mod document;
pub mod ids;
pub mod rep;
pub mod site;

pub use arena::{Arena, ArenaId};
pub use content::Content;
pub use document::{Document, DocumentKind};
pub use ids::{DocumentId, RepId};
pub use rep::{ItemRep, RepSet, SnapshotName};
pub use site::Site;
