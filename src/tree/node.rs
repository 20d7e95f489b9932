//! Node type definitions.
//!
//! The `NodeKind` enum represents all node types in an XML document tree.
//! Each variant carries the node-type-specific payload (element name and
//! attribute chain, text content, PI target/data). Navigation links live in
//! `NodeData`, not here.

use super::AttrId;
use crate::name::XmlName;

/// The kind of an XML node and its associated data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document node — there is exactly one per `Document`, and it is
    /// always the arena root.
    Document,

    /// An element node, e.g., `<item lang="en">`.
    Element {
        /// The element's qualified name.
        name: XmlName,
        /// Whether a childless element serializes self-closing (`<a/>`)
        /// rather than expanded (`<a></a>`). Ignored once children exist.
        is_empty: bool,
        /// Head of the attribute chain.
        first_attr: Option<AttrId>,
        /// Tail of the attribute chain.
        last_attr: Option<AttrId>,
    },

    /// A text node containing character data.
    Text {
        /// The text content (already decoded — character references resolved).
        content: String,
    },

    /// A CDATA section, e.g., `<![CDATA[...]]>`.
    CData {
        /// The CDATA content (no escaping applied).
        content: String,
    },

    /// A comment node, e.g., `<!-- ... -->`.
    Comment {
        /// The comment text (without the `<!--` and `-->` delimiters).
        content: String,
    },

    /// A processing instruction, e.g., `<?target data?>`.
    ProcessingInstruction {
        /// The PI target (e.g., `"xml-stylesheet"`).
        target: String,
        /// The PI data (empty string if none).
        data: String,
    },

    /// A document type declaration node, e.g., `<!DOCTYPE html>`.
    DocumentType {
        /// The root element name declared in the DOCTYPE.
        name: String,
        /// The PUBLIC identifier, if any.
        public_id: Option<String>,
        /// The SYSTEM identifier (URI), if any.
        system_id: Option<String>,
        /// The internal subset text (between `[` and `]`), if any.
        internal_subset: Option<String>,
    },
}

impl NodeKind {
    /// Returns `true` for node kinds that can hold child nodes.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Document | Self::Element { .. })
    }
}

/// The XML declaration of a document: `<?xml version="1.0" ...?>`.
///
/// Not a node — it is carried on the `Document` itself and serialized ahead
/// of all children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// The XML version (e.g., `"1.0"`).
    pub version: String,
    /// Declared encoding (e.g., `"UTF-8"`), if any.
    pub encoding: Option<String>,
    /// The standalone flag (`"yes"` / `"no"`), if declared.
    pub standalone: Option<String>,
}

impl Declaration {
    /// Creates a declaration. `version` defaults to `"1.0"` when `None`.
    #[must_use]
    pub fn new(
        version: Option<&str>,
        encoding: Option<&str>,
        standalone: Option<&str>,
    ) -> Self {
        Self {
            version: version.unwrap_or("1.0").to_string(),
            encoding: encoding.map(str::to_string),
            standalone: standalone.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_container() {
        assert!(NodeKind::Document.is_container());
        assert!(!NodeKind::Text {
            content: "x".to_string()
        }
        .is_container());
        assert!(!NodeKind::Comment {
            content: "x".to_string()
        }
        .is_container());
    }

    #[test]
    fn test_declaration_defaults() {
        let decl = Declaration::new(None, None, Some("yes"));
        assert_eq!(decl.version, "1.0");
        assert_eq!(decl.encoding, None);
        assert_eq!(decl.standalone.as_deref(), Some("yes"));
    }
}
