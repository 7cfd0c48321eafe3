//! Site configuration loading for Stanza.
//!
//! Configuration lives in a `stanza.toml` file at the project root. It
//! names the site, places the output and state directories, selects the
//! pattern matching mode, and carries a free-form attribute table that
//! participates in dependency tracking like any document's attributes.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use types::{PatternType, SiteConfig};
