//! Source documents: items and layouts.

use crate::content::Content;
use crate::ids::DocumentId;
use stanza_common::{Attributes, Checksum, EntityRef, Fingerprint, Identifier};

/// Whether a document is an item (compiled into outputs) or a layout
/// (a template wrapped around item content).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    /// An item.
    Item,
    /// A layout.
    Layout,
}

/// A source document loaded for this run.
///
/// Documents are immutable once added to a [`Site`](crate::site::Site);
/// an edit between runs shows up as a new document with a different
/// fingerprint.
#[derive(Clone, Debug)]
pub struct Document {
    id: DocumentId,
    kind: DocumentKind,
    identifier: Identifier,
    attributes: Attributes,
    content: Content,
}

impl Document {
    pub(crate) fn new(
        id: DocumentId,
        kind: DocumentKind,
        identifier: Identifier,
        attributes: Attributes,
        content: Content,
    ) -> Self {
        Document {
            id,
            kind,
            identifier,
            attributes,
            content,
        }
    }

    /// The document's ID within its site.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Whether this document is an item or a layout.
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// The document's identifier.
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// The document's attribute table.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// The document's raw content.
    pub fn content(&self) -> &Content {
        &self.content
    }

    /// The persisted reference form of this document.
    pub fn entity_ref(&self) -> EntityRef {
        match self.kind {
            DocumentKind::Item => EntityRef::Item(self.identifier.clone()),
            DocumentKind::Layout => EntityRef::Layout(self.identifier.clone()),
        }
    }

    /// Computes the document's change-detection fingerprint.
    ///
    /// `None` means the content checksum could not be computed (a binary
    /// document whose backing file is unreadable). Callers must then treat
    /// the document as changed.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        let content = self.content.checksum()?;
        Some(Fingerprint {
            attributes: Checksum::of_attributes(&self.attributes),
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stanza_common::AttributeValue;

    fn doc(kind: DocumentKind, content: Content) -> Document {
        let mut attributes = Attributes::new();
        attributes.insert("title".into(), AttributeValue::from("Hello"));
        Document::new(
            DocumentId::from_raw(0),
            kind,
            Identifier::new("/hello.md"),
            attributes,
            content,
        )
    }

    #[test]
    fn entity_ref_follows_kind() {
        let item = doc(DocumentKind::Item, Content::textual("x"));
        let layout = doc(DocumentKind::Layout, Content::textual("x"));
        assert_eq!(
            item.entity_ref(),
            EntityRef::Item(Identifier::new("/hello.md"))
        );
        assert_eq!(
            layout.entity_ref(),
            EntityRef::Layout(Identifier::new("/hello.md"))
        );
    }

    #[test]
    fn fingerprint_separates_attributes_from_content() {
        let a = doc(DocumentKind::Item, Content::textual("one"));
        let b = doc(DocumentKind::Item, Content::textual("two"));
        let fp_a = a.fingerprint().unwrap();
        let fp_b = b.fingerprint().unwrap();
        assert_eq!(fp_a.attributes, fp_b.attributes);
        assert_ne!(fp_a.content, fp_b.content);
    }

    #[test]
    fn unreadable_binary_content_yields_no_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let item = doc(
            DocumentKind::Item,
            Content::binary(dir.path().join("missing.png")),
        );
        assert!(item.fingerprint().is_none());
    }
}
