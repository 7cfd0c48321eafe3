//! The site: all documents loaded for one run, indexed by identifier.

use crate::arena::Arena;
use crate::content::Content;
use crate::document::{Document, DocumentKind};
use crate::ids::DocumentId;
use stanza_common::{Attributes, EntityRef, Identifier};
use std::collections::{HashMap, HashSet};

/// All items and layouts of one run.
///
/// Documents are stored densely and indexed by identifier per kind; an item
/// and a layout may share an identifier. Iteration follows insertion order,
/// which makes glob-based layout resolution deterministic.
#[derive(Debug, Default)]
pub struct Site {
    documents: Arena<DocumentId, Document>,
    items: HashMap<Identifier, DocumentId>,
    layouts: HashMap<Identifier, DocumentId>,
    item_order: Vec<DocumentId>,
    layout_order: Vec<DocumentId>,
}

impl Site {
    /// Creates an empty site.
    pub fn new() -> Self {
        Site::default()
    }

    /// Adds an item.
    ///
    /// # Panics
    ///
    /// Panics if an item with this identifier already exists.
    pub fn add_item(
        &mut self,
        identifier: Identifier,
        attributes: Attributes,
        content: Content,
    ) -> DocumentId {
        assert!(
            !self.items.contains_key(&identifier),
            "duplicate item identifier {identifier}"
        );
        let id = self.alloc(DocumentKind::Item, identifier.clone(), attributes, content);
        self.items.insert(identifier, id);
        self.item_order.push(id);
        id
    }

    /// Adds a layout.
    ///
    /// # Panics
    ///
    /// Panics if a layout with this identifier already exists.
    pub fn add_layout(
        &mut self,
        identifier: Identifier,
        attributes: Attributes,
        content: Content,
    ) -> DocumentId {
        assert!(
            !self.layouts.contains_key(&identifier),
            "duplicate layout identifier {identifier}"
        );
        let id = self.alloc(DocumentKind::Layout, identifier.clone(), attributes, content);
        self.layouts.insert(identifier, id);
        self.layout_order.push(id);
        id
    }

    fn alloc(
        &mut self,
        kind: DocumentKind,
        identifier: Identifier,
        attributes: Attributes,
        content: Content,
    ) -> DocumentId {
        let id = DocumentId::from_raw(self.documents.len() as u32);
        self.documents
            .alloc(Document::new(id, kind, identifier, attributes, content));
        id
    }

    /// Returns the document with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    pub fn document(&self, id: DocumentId) -> &Document {
        self.documents.get(id)
    }

    /// Looks up an item's ID by identifier.
    pub fn item_id(&self, identifier: &Identifier) -> Option<DocumentId> {
        self.items.get(identifier).copied()
    }

    /// Looks up a layout's ID by identifier.
    pub fn layout_id(&self, identifier: &Identifier) -> Option<DocumentId> {
        self.layouts.get(identifier).copied()
    }

    /// Looks up an item by identifier.
    pub fn item(&self, identifier: &Identifier) -> Option<&Document> {
        self.item_id(identifier).map(|id| self.documents.get(id))
    }

    /// Looks up a layout by identifier.
    pub fn layout(&self, identifier: &Identifier) -> Option<&Document> {
        self.layout_id(identifier).map(|id| self.documents.get(id))
    }

    /// Iterates over items in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &Document> {
        self.item_order.iter().map(|&id| self.documents.get(id))
    }

    /// Iterates over layouts in insertion order.
    pub fn layouts(&self) -> impl Iterator<Item = &Document> {
        self.layout_order.iter().map(|&id| self.documents.get(id))
    }

    /// Resolves a persisted reference against this run's documents.
    ///
    /// The configuration reference has no document; it resolves to `None`.
    pub fn resolve(&self, entity: &EntityRef) -> Option<&Document> {
        match entity {
            EntityRef::Item(identifier) => self.item(identifier),
            EntityRef::Layout(identifier) => self.layout(identifier),
            EntityRef::Config => None,
        }
    }

    /// The universe of entity references for this run: every item, every
    /// layout, and the configuration.
    pub fn entity_refs(&self) -> HashSet<EntityRef> {
        let mut refs: HashSet<EntityRef> = self
            .documents
            .values()
            .map(Document::entity_ref)
            .collect();
        refs.insert(EntityRef::Config);
        refs
    }

    /// The number of documents, items and layouts combined.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}
