//! The compilation engine: deciding what is stale and rebuilding it.
//!
//! A run turns the provided rules into a frozen action plan, compares it
//! and the current documents against the persisted stores to find
//! outdated representations, then replays their programs while tracked
//! accessors record which aspects of which entities each one read. Fresh
//! reps whose previous output is still cached skip compilation entirely.
//! Reps that read the compiled content of a rep that has not finished
//! yet are parked and retried once the blocker completes.

#![warn(missing_docs)]

pub mod compiler;
pub mod errors;
pub mod executor;
pub mod filter;
pub mod notify;
pub mod outdatedness;
pub mod provider;
pub mod selector;
pub mod tracker;

pub use compiler::{Compiler, RunSummary};
pub use errors::CompileError;
pub use executor::{find_layout, Executor};
pub use filter::{
    Filter, FilterContext, FilterError, FilterInput, FilterKind, FilterOutput, FilterRegistry,
};
pub use notify::{Notification, NotificationHub};
pub use outdatedness::{OutdatednessChecker, OutdatednessReason};
pub use provider::{ActionPlan, ActionProvider};
pub use selector::RepQueue;
pub use tracker::{DepRecord, DependencyTracker};
