//! Pull-style writer contract and the tree-building writer.
//!
//! [`XmlWrite`] is the primitive-call contract shared by every serialization
//! sink: a caller drives it one `write_*` call at a time, in document order,
//! attributes before element content. The tree itself serializes by driving
//! these primitives (see [`crate::serial`]), and [`NodeWriter`] implements
//! the same contract in the other direction — each call incrementally builds
//! a [`Document`], enforcing structural well-formedness at the exact call
//! that would violate it. The writer never attempts best-effort recovery: a
//! call made in an invalid state fails and changes nothing.

use crate::error::{Error, Result, SourceLocation};
use crate::name::{Namespace, XmlName};
use crate::tree::{declared_prefix, Document, NodeId};

/// The pull-writer contract: start-element / attribute / text / end-element
/// primitives accepted one call at a time.
///
/// `prefix` and `uri` travel together: the prefix is a serialization hint,
/// the URI is the name's identity. Passing a non-empty prefix with an empty
/// URI is an error for implementations that resolve names.
pub trait XmlWrite {
    /// Writes the XML declaration. Only legal before anything else.
    fn write_declaration(
        &mut self,
        version: &str,
        encoding: Option<&str>,
        standalone: Option<&str>,
    ) -> Result<()>;

    /// Writes the document type declaration.
    fn write_doctype(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        internal_subset: Option<&str>,
    ) -> Result<()>;

    /// Opens an element.
    fn write_start_element(&mut self, prefix: &str, local: &str, uri: &str) -> Result<()>;

    /// Closes the innermost open element; a childless element may take the
    /// self-closing form.
    fn write_end_element(&mut self) -> Result<()>;

    /// Closes the innermost open element, forcing the expanded
    /// `<a></a>` form even when childless.
    fn write_full_end_element(&mut self) -> Result<()>;

    /// Opens an attribute on the current element.
    fn write_start_attribute(&mut self, prefix: &str, local: &str, uri: &str) -> Result<()>;

    /// Closes the open attribute.
    fn write_end_attribute(&mut self) -> Result<()>;

    /// Writes character data: into the open attribute's value if one is
    /// open, otherwise as text content.
    fn write_text(&mut self, text: &str) -> Result<()>;

    /// Writes a CDATA section.
    fn write_cdata(&mut self, text: &str) -> Result<()>;

    /// Writes a comment.
    fn write_comment(&mut self, text: &str) -> Result<()>;

    /// Writes a processing instruction.
    fn write_processing_instruction(&mut self, target: &str, data: &str) -> Result<()>;

    /// Writes whitespace-only character data.
    fn write_whitespace(&mut self, text: &str) -> Result<()>;
}

/// What has been written at the document top level so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TopLevel {
    None,
    XmlDeclaration,
    DocumentType,
    Element,
}

/// An element whose start tag is still open.
struct OpenElement {
    id: NodeId,
    /// Prefix bindings promised by start-element / start-attribute calls,
    /// reconciled when the start tag seals.
    pending: Vec<(String, Namespace)>,
    /// Once sealed (first content or end tag), no more attributes.
    sealed: bool,
}

/// An attribute between start-attribute and end-attribute calls.
struct OpenAttribute {
    name: XmlName,
    value: String,
}

/// A writer that builds a [`Document`] from pull-writer calls.
///
/// # Namespace reconciliation
///
/// If a start-element or start-attribute call names a prefix for a non-empty
/// namespace, and neither the element's own namespace-declaration attributes
/// nor an ancestor's bind that prefix by the time the start tag seals, the
/// writer synthesizes the missing `xmlns[:prefix]` attribute. Declarations
/// the caller wrote explicitly are never rewritten.
///
/// # Examples
///
/// ```
/// use xylo::{NodeWriter, XmlWrite};
///
/// let mut w = NodeWriter::new();
/// w.write_start_element("", "root", "").unwrap();
/// w.write_start_attribute("", "id", "").unwrap();
/// w.write_text("1").unwrap();
/// w.write_end_attribute().unwrap();
/// w.write_text("hello").unwrap();
/// w.write_end_element().unwrap();
///
/// let doc = w.finish().unwrap();
/// let root = doc.root_element().unwrap();
/// assert_eq!(doc.text_content(root), "hello");
/// ```
pub struct NodeWriter {
    doc: Document,
    open: Vec<OpenElement>,
    attribute: Option<OpenAttribute>,
    top: TopLevel,
    last_created: Option<NodeId>,
}

impl NodeWriter {
    /// Creates a writer targeting a fresh document.
    #[must_use]
    pub fn new() -> Self {
        Self {
            doc: Document::new(),
            open: Vec::new(),
            attribute: None,
            top: TopLevel::None,
            last_created: None,
        }
    }

    /// Finishes writing and returns the built document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if an element or attribute is
    /// still open.
    pub fn finish(self) -> Result<Document> {
        if self.attribute.is_some() {
            return Err(Error::invalid_op("an attribute is still open"));
        }
        if let Some(frame) = self.open.last() {
            let name = self
                .doc
                .node_name(frame.id)
                .map_or_else(String::new, |n| n.to_string());
            return Err(Error::invalid_op(format!("element '{name}' is still open")));
        }
        Ok(self.doc)
    }

    /// The node most recently created by a write call, if any.
    #[must_use]
    pub fn last_node(&self) -> Option<NodeId> {
        self.last_created
    }

    /// Records the source location of the most recently created node, unless
    /// one is already recorded (a merged text node keeps the location of its
    /// first chunk).
    pub fn set_last_location(&mut self, location: SourceLocation) {
        if let Some(id) = self.last_created {
            if self.doc.source_location(id).is_none() {
                self.doc.set_source_location(id, location);
            }
        }
    }

    fn current(&self) -> Option<NodeId> {
        self.open.last().map(|frame| frame.id)
    }

    fn require_no_open_attribute(&self, what: &str) -> Result<()> {
        if self.attribute.is_some() {
            return Err(Error::invalid_op(format!(
                "cannot write {what} while an attribute is open"
            )));
        }
        Ok(())
    }

    /// Seals the innermost open element: no more attributes may be written,
    /// and promised prefix bindings that are still unbound get their
    /// `xmlns[:prefix]` declaration synthesized.
    fn seal_current(&mut self) -> Result<()> {
        let Some(frame) = self.open.last_mut() else {
            return Ok(());
        };
        if frame.sealed {
            return Ok(());
        }
        frame.sealed = true;
        let id = frame.id;
        let pending = std::mem::take(&mut frame.pending);
        for (prefix, ns) in pending {
            let declared_here = self
                .doc
                .attributes(id)
                .any(|a| declared_prefix(self.doc.attr(a).name) == Some(prefix.as_str()));
            if declared_here {
                continue;
            }
            if self.doc.namespace_for_prefix(id, &prefix) == Some(ns) {
                continue;
            }
            let decl_name = if prefix.is_empty() {
                XmlName::get("xmlns")?
            } else {
                Namespace::xmlns().get_name(&prefix)?
            };
            self.doc.set_attribute_value(id, decl_name, Some(ns.uri()))?;
        }
        Ok(())
    }

    fn append_leaf(&mut self, node: NodeId) -> Result<()> {
        match self.current() {
            Some(parent) => {
                self.seal_current()?;
                self.doc.add(parent, node)?;
            }
            None => {
                let root = self.doc.root();
                self.doc.add(root, node)?;
            }
        }
        self.last_created = Some(node);
        Ok(())
    }
}

impl Default for NodeWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlWrite for NodeWriter {
    fn write_declaration(
        &mut self,
        version: &str,
        encoding: Option<&str>,
        standalone: Option<&str>,
    ) -> Result<()> {
        if self.top != TopLevel::None
            || self.doc.first_child(self.doc.root()).is_some()
            || self.current().is_some()
        {
            return Err(Error::invalid_op(
                "the XML declaration must be written before any other content",
            ));
        }
        self.doc.declaration = Some(crate::tree::Declaration::new(
            Some(version),
            encoding,
            standalone,
        ));
        self.top = TopLevel::XmlDeclaration;
        Ok(())
    }

    fn write_doctype(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        internal_subset: Option<&str>,
    ) -> Result<()> {
        if self.current().is_some() {
            return Err(Error::invalid_op(
                "the document type declaration must be at the document top level",
            ));
        }
        if !matches!(self.top, TopLevel::None | TopLevel::XmlDeclaration) {
            return Err(Error::invalid_op(
                "the document type declaration must precede the root element",
            ));
        }
        self.require_no_open_attribute("a document type declaration")?;
        let node = self
            .doc
            .new_document_type(name, public_id, system_id, internal_subset)?;
        let root = self.doc.root();
        self.doc.add(root, node)?;
        self.last_created = Some(node);
        self.top = TopLevel::DocumentType;
        Ok(())
    }

    fn write_start_element(&mut self, prefix: &str, local: &str, uri: &str) -> Result<()> {
        self.require_no_open_attribute("an element")?;
        if !prefix.is_empty() && uri.is_empty() {
            return Err(Error::argument(
                "a prefix cannot be bound to the empty namespace",
            ));
        }
        let name = Namespace::get(uri).get_name(local)?;
        self.seal_current()?;
        let element = self.doc.new_element(name);
        match self.current() {
            Some(parent) => self.doc.add(parent, element)?,
            None => {
                let root = self.doc.root();
                self.doc.add(root, element)?;
                self.top = TopLevel::Element;
            }
        }
        let mut pending = Vec::new();
        if !uri.is_empty() {
            pending.push((prefix.to_string(), Namespace::get(uri)));
        }
        self.open.push(OpenElement {
            id: element,
            pending,
            sealed: false,
        });
        self.last_created = Some(element);
        Ok(())
    }

    fn write_end_element(&mut self) -> Result<()> {
        self.require_no_open_attribute("an end tag")?;
        if self.open.is_empty() {
            return Err(Error::invalid_op("no element is open"));
        }
        self.seal_current()?;
        self.open.pop();
        Ok(())
    }

    fn write_full_end_element(&mut self) -> Result<()> {
        self.require_no_open_attribute("an end tag")?;
        let Some(frame) = self.open.last() else {
            return Err(Error::invalid_op("no element is open"));
        };
        let id = frame.id;
        self.seal_current()?;
        self.doc.set_element_empty(id, false);
        self.open.pop();
        Ok(())
    }

    fn write_start_attribute(&mut self, prefix: &str, local: &str, uri: &str) -> Result<()> {
        self.require_no_open_attribute("an attribute")?;
        let Some(frame) = self.open.last() else {
            return Err(Error::invalid_op("no element is open"));
        };
        if frame.sealed {
            return Err(Error::invalid_op(
                "attributes must be written before element content",
            ));
        }
        // Namespace-declaration attributes: xmlns:prefix or bare xmlns.
        let name = if prefix == "xmlns" {
            Namespace::xmlns().get_name(local)?
        } else if prefix.is_empty() && local == "xmlns" {
            XmlName::get("xmlns")?
        } else {
            if !prefix.is_empty() && uri.is_empty() {
                return Err(Error::argument(
                    "a prefix cannot be bound to the empty namespace",
                ));
            }
            if !prefix.is_empty() {
                let ns = Namespace::get(uri);
                if let Some(frame) = self.open.last_mut() {
                    frame.pending.push((prefix.to_string(), ns));
                }
            }
            Namespace::get(uri).get_name(local)?
        };
        self.attribute = Some(OpenAttribute {
            name,
            value: String::new(),
        });
        Ok(())
    }

    fn write_end_attribute(&mut self) -> Result<()> {
        let Some(pending) = self.attribute.take() else {
            return Err(Error::invalid_op("no attribute is open"));
        };
        let Some(element) = self.current() else {
            return Err(Error::invalid_op("no element is open"));
        };
        let attr = self.doc.new_attribute(pending.name, &pending.value);
        // Duplicate names are rejected here, leaving the chain unchanged.
        self.doc.add_attribute(element, attr)
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        if let Some(attr) = self.attribute.as_mut() {
            attr.value.push_str(text);
            return Ok(());
        }
        match self.current() {
            Some(parent) => {
                self.seal_current()?;
                self.doc.add(parent, text)?;
                self.last_created = self.doc.last_child(parent);
            }
            None => {
                let root = self.doc.root();
                self.doc.add(root, text)?;
                self.last_created = self.doc.last_child(root);
            }
        }
        Ok(())
    }

    fn write_cdata(&mut self, text: &str) -> Result<()> {
        self.require_no_open_attribute("a CDATA section")?;
        let node = self.doc.new_cdata(text);
        self.append_leaf(node)
    }

    fn write_comment(&mut self, text: &str) -> Result<()> {
        self.require_no_open_attribute("a comment")?;
        let node = self.doc.new_comment(text);
        self.append_leaf(node)
    }

    fn write_processing_instruction(&mut self, target: &str, data: &str) -> Result<()> {
        self.require_no_open_attribute("a processing instruction")?;
        let node = self.doc.new_processing_instruction(target, data)?;
        self.append_leaf(node)
    }

    fn write_whitespace(&mut self, text: &str) -> Result<()> {
        if !text.chars().all(char::is_whitespace) {
            return Err(Error::argument(
                "write_whitespace accepts whitespace characters only",
            ));
        }
        self.write_text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeKind;

    fn name(s: &str) -> XmlName {
        XmlName::get(s).unwrap()
    }

    #[test]
    fn test_build_document_with_prolog() {
        let mut w = NodeWriter::new();
        w.write_declaration("1.0", Some("UTF-8"), Some("yes")).unwrap();
        w.write_doctype("root", None, Some("root.dtd"), None).unwrap();
        w.write_comment(" prolog ").unwrap();
        w.write_start_element("", "root", "").unwrap();
        w.write_end_element().unwrap();

        let doc = w.finish().unwrap();
        let decl = doc.declaration.as_ref().unwrap();
        assert_eq!(decl.version, "1.0");
        assert_eq!(decl.standalone.as_deref(), Some("yes"));
        assert!(doc.document_type().is_some());
        assert!(doc.root_element().is_some());
        assert_eq!(doc.children(doc.root()).count(), 3);
    }

    #[test]
    fn test_nested_elements_and_attributes() {
        let mut w = NodeWriter::new();
        w.write_start_element("", "root", "").unwrap();
        w.write_start_attribute("", "id", "").unwrap();
        w.write_text("r1").unwrap();
        w.write_end_attribute().unwrap();
        w.write_start_element("", "child", "").unwrap();
        w.write_text("body").unwrap();
        w.write_end_element().unwrap();
        w.write_end_element().unwrap();

        let doc = w.finish().unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.attribute_value(root, name("id")), Some("r1"));
        let child = doc.first_child(root).unwrap();
        assert_eq!(doc.node_name(child), Some(name("child")));
        assert_eq!(doc.text_content(child), "body");
    }

    #[test]
    fn test_attribute_value_accumulates_chunks() {
        let mut w = NodeWriter::new();
        w.write_start_element("", "e", "").unwrap();
        w.write_start_attribute("", "a", "").unwrap();
        w.write_text("one ").unwrap();
        w.write_text("two").unwrap();
        w.write_end_attribute().unwrap();
        w.write_end_element().unwrap();
        let doc = w.finish().unwrap();
        let e = doc.root_element().unwrap();
        assert_eq!(doc.attribute_value(e, name("a")), Some("one two"));
    }

    #[test]
    fn test_prefix_binding_synthesized_at_seal() {
        let mut w = NodeWriter::new();
        w.write_start_element("p", "root", "urn:p").unwrap();
        w.write_end_element().unwrap();
        let doc = w.finish().unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.node_name(root).unwrap().namespace().uri(), "urn:p");
        let decl = Namespace::xmlns().get_name("p").unwrap();
        assert_eq!(doc.attribute_value(root, decl), Some("urn:p"));
    }

    #[test]
    fn test_default_namespace_synthesized() {
        let mut w = NodeWriter::new();
        w.write_start_element("", "root", "urn:default").unwrap();
        w.write_end_element().unwrap();
        let doc = w.finish().unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.attribute_value(root, name("xmlns")), Some("urn:default"));
    }

    #[test]
    fn test_explicit_declaration_not_rewritten() {
        let mut w = NodeWriter::new();
        w.write_start_element("p", "root", "urn:p").unwrap();
        w.write_start_attribute("xmlns", "p", "").unwrap();
        w.write_text("urn:p").unwrap();
        w.write_end_attribute().unwrap();
        w.write_end_element().unwrap();
        let doc = w.finish().unwrap();
        let root = doc.root_element().unwrap();
        // Exactly one declaration: the explicit one.
        assert_eq!(doc.attributes(root).count(), 1);
    }

    #[test]
    fn test_inherited_binding_not_redeclared() {
        let mut w = NodeWriter::new();
        w.write_start_element("p", "root", "urn:p").unwrap();
        w.write_start_element("p", "child", "urn:p").unwrap();
        w.write_end_element().unwrap();
        w.write_end_element().unwrap();
        let doc = w.finish().unwrap();
        let root = doc.root_element().unwrap();
        let child = doc.first_child(root).unwrap();
        assert_eq!(doc.attributes(root).count(), 1);
        assert_eq!(doc.attributes(child).count(), 0);
    }

    #[test]
    fn test_self_closing_versus_full_end() {
        let mut w = NodeWriter::new();
        w.write_start_element("", "root", "").unwrap();
        w.write_start_element("", "a", "").unwrap();
        w.write_end_element().unwrap();
        w.write_start_element("", "b", "").unwrap();
        w.write_full_end_element().unwrap();
        w.write_end_element().unwrap();

        let doc = w.finish().unwrap();
        let root = doc.root_element().unwrap();
        let kids: Vec<_> = doc.children(root).collect();
        assert!(doc.element_is_empty(kids[0]));
        assert!(!doc.element_is_empty(kids[1]));
    }

    #[test]
    fn test_attribute_without_open_element_fails() {
        let mut w = NodeWriter::new();
        assert!(matches!(
            w.write_start_attribute("", "a", ""),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_attribute_after_content_fails() {
        let mut w = NodeWriter::new();
        w.write_start_element("", "e", "").unwrap();
        w.write_text("content").unwrap();
        assert!(matches!(
            w.write_start_attribute("", "late", ""),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_duplicate_attribute_rejected() {
        let mut w = NodeWriter::new();
        w.write_start_element("", "e", "").unwrap();
        w.write_start_attribute("", "a", "").unwrap();
        w.write_end_attribute().unwrap();
        w.write_start_attribute("", "a", "").unwrap();
        assert!(matches!(
            w.write_end_attribute(),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_declaration_after_content_fails() {
        let mut w = NodeWriter::new();
        w.write_comment("early").unwrap();
        assert!(matches!(
            w.write_declaration("1.0", None, None),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_doctype_rules() {
        let mut w = NodeWriter::new();
        w.write_start_element("", "root", "").unwrap();
        w.write_end_element().unwrap();
        assert!(matches!(
            w.write_doctype("root", None, None, None),
            Err(Error::InvalidOperation(_))
        ));

        let mut w = NodeWriter::new();
        w.write_doctype("root", None, None, None).unwrap();
        assert!(matches!(
            w.write_doctype("root", None, None, None),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_second_root_element_rejected() {
        let mut w = NodeWriter::new();
        w.write_start_element("", "first", "").unwrap();
        w.write_end_element().unwrap();
        assert!(matches!(
            w.write_start_element("", "second", ""),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_top_level_text_must_be_whitespace() {
        let mut w = NodeWriter::new();
        assert!(matches!(w.write_text("not ws"), Err(Error::Argument(_))));
        w.write_whitespace("\n  ").unwrap();
        assert!(matches!(w.write_whitespace("x"), Err(Error::Argument(_))));
    }

    #[test]
    fn test_unbalanced_finish_fails() {
        let mut w = NodeWriter::new();
        w.write_start_element("", "open", "").unwrap();
        assert!(matches!(w.finish(), Err(Error::InvalidOperation(_))));

        let mut w = NodeWriter::new();
        w.write_start_element("", "e", "").unwrap();
        w.write_start_attribute("", "a", "").unwrap();
        assert!(matches!(w.finish(), Err(Error::InvalidOperation(_))));
    }

    #[test]
    fn test_end_element_without_open_fails() {
        let mut w = NodeWriter::new();
        assert!(matches!(
            w.write_end_element(),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_text_merges_into_trailing_text_node() {
        let mut w = NodeWriter::new();
        w.write_start_element("", "e", "").unwrap();
        w.write_text("a").unwrap();
        w.write_text("b").unwrap();
        w.write_end_element().unwrap();
        let doc = w.finish().unwrap();
        let e = doc.root_element().unwrap();
        assert_eq!(doc.children(e).count(), 1);
        let text = doc.first_child(e).unwrap();
        assert!(matches!(&doc.node(text).kind, NodeKind::Text { content } if content == "ab"));
    }
}
