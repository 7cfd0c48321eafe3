//! Path-like identities for documents and their persisted reference forms.
//!
//! Documents are addressed by [`Identifier`]s such as `/articles/intro.md`.
//! Stores never hold in-memory handles; they persist [`EntityRef`]s and
//! [`RepRef`]s, which survive across runs and are re-resolved against the
//! current document universe on load.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A path-like document identity, e.g. `/articles/intro.md`.
///
/// Identifiers are cheap to clone and compare. They are stored verbatim;
/// use [`Identifier::cleaned`] when two spellings of the same path must
/// compare equal.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Identifier(Arc<str>);

impl Identifier {
    /// Creates an identifier from any string-like value.
    pub fn new(value: impl AsRef<str>) -> Self {
        Identifier(Arc::from(value.as_ref()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the cleaned form: exactly one leading and one trailing slash.
    ///
    /// `foo`, `/foo`, `foo/` and `/foo/` all clean to `/foo/`. The root
    /// spelling cleans to `/`.
    pub fn cleaned(&self) -> Identifier {
        let trimmed = self.0.trim_matches('/');
        if trimmed.is_empty() {
            Identifier::new("/")
        } else {
            Identifier::new(format!("/{trimmed}/"))
        }
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier(Arc::from(value.as_str()))
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::new(value)
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.0.as_ref().to_owned()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.0)
    }
}

/// The name of one representation of an item, e.g. `default` or `feed`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepName(String);

impl RepName {
    /// Creates a representation name.
    pub fn new(value: impl Into<String>) -> Self {
        RepName(value.into())
    }

    /// The conventional primary representation name, `default`.
    pub fn default_rep() -> Self {
        RepName::new("default")
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted reference to a dependency-graph entity.
///
/// The site configuration participates in the graph as a single entity with
/// no identifier of its own.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRef {
    /// An item, referenced by identifier.
    Item(Identifier),
    /// A layout, referenced by identifier.
    Layout(Identifier),
    /// The site configuration.
    Config,
}

impl EntityRef {
    /// Returns the identifier for item and layout references.
    pub fn identifier(&self) -> Option<&Identifier> {
        match self {
            EntityRef::Item(identifier) | EntityRef::Layout(identifier) => Some(identifier),
            EntityRef::Config => None,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Item(identifier) => write!(f, "item:{identifier}"),
            EntityRef::Layout(identifier) => write!(f, "layout:{identifier}"),
            EntityRef::Config => f.write_str("config"),
        }
    }
}

/// A persisted reference to one representation of one item.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepRef {
    /// Identifier of the owning item.
    pub item: Identifier,
    /// Name of the representation.
    pub name: RepName,
}

impl RepRef {
    /// Creates a representation reference.
    pub fn new(item: Identifier, name: RepName) -> Self {
        RepRef { item, name }
    }
}

impl fmt::Display for RepRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.item, self.name)
    }
}
