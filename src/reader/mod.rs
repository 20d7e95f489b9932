//! Pull-based streaming reader over a document tree.
//!
//! The [`NodeReader`] walks a persistent tree through a cursor-style,
//! pull-based interface — the same shape as a streaming text reader, but
//! with the tree itself as the token source and no second copy of the data.
//! Each [`NodeReader::read`] call advances depth-first: down into the first
//! child, across to the next sibling, or up with a synthetic end-tag step.
//!
//! Attributes are addressed positionally as pseudo-nodes rather than tree
//! nodes. On the XML declaration the reader synthesizes `version` /
//! `encoding` / `standalone` pseudo-attributes, and on the document type
//! declaration `PUBLIC` / `SYSTEM` — none of which exist in the tree.
//!
//! # Examples
//!
//! ```
//! use xylo::{Document, NodeReader, XmlNodeType};
//!
//! let doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
//! let mut reader = NodeReader::new(&doc);
//! let mut elements = Vec::new();
//!
//! while reader.read() {
//!     if reader.node_type() == XmlNodeType::Element {
//!         elements.push(reader.local_name().unwrap().to_string());
//!     }
//! }
//!
//! assert_eq!(elements, vec!["root", "child"]);
//! ```

use crate::name::XmlName;
use crate::tree::{Document, NodeId, NodeKind};
use std::borrow::Cow;
use std::fmt::Write as _;

/// The type of the node the reader is positioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XmlNodeType {
    /// No node — the reader has not been advanced yet or is closed.
    None,
    /// An element start tag, e.g. `<div>` or `<br/>`.
    ///
    /// For self-closing elements, [`NodeReader::is_empty_element`] returns
    /// `true` and no matching `EndElement` is produced.
    Element,
    /// A synthetic element end tag, e.g. `</div>`.
    EndElement,
    /// A text node containing character data.
    Text,
    /// A CDATA section.
    CData,
    /// An XML comment.
    Comment,
    /// A processing instruction.
    ProcessingInstruction,
    /// The XML declaration, e.g. `<?xml version="1.0"?>`.
    XmlDeclaration,
    /// A document type declaration.
    DocumentType,
    /// A whitespace-only text node.
    Whitespace,
    /// An attribute pseudo-node, after attribute navigation.
    Attribute,
    /// The end of the readable region has been reached.
    EndDocument,
}

/// The reader lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// [`NodeReader::read`] has not been called yet.
    Initial,
    /// The reader is positioned on a node.
    Interactive,
    /// The walk has passed the end of the start node's subtree.
    EndOfFile,
    /// [`NodeReader::close`] was called.
    Closed,
}

/// Where the cursor sits in the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// The synthetic XML-declaration step (document readers only).
    Declaration,
    /// On a tree node (the start tag, for elements).
    Node(NodeId),
    /// On the synthetic end tag of an element.
    End(NodeId),
}

/// A pull cursor over a document tree.
///
/// Created with [`NodeReader::new`] to read a whole document, or
/// [`NodeReader::for_node`] to read one subtree. The reader borrows the
/// document immutably for its whole life, so the tree cannot change under
/// a live reader.
pub struct NodeReader<'d> {
    doc: &'d Document,
    start: NodeId,
    state: ReadState,
    cursor: Option<Cursor>,
    /// Positional attribute index while navigating attributes.
    attr: Option<usize>,
    /// Whether the cursor has descended into the attribute's value.
    in_value: bool,
}

impl<'d> NodeReader<'d> {
    /// Creates a reader over the whole document.
    #[must_use]
    pub fn new(doc: &'d Document) -> Self {
        Self::for_node(doc, doc.root())
    }

    /// Creates a reader over the subtree rooted at `start`.
    #[must_use]
    pub fn for_node(doc: &'d Document, start: NodeId) -> Self {
        Self {
            doc,
            start,
            state: ReadState::Initial,
            cursor: None,
            attr: None,
            in_value: false,
        }
    }

    /// Returns the reader's lifecycle state.
    #[must_use]
    pub fn state(&self) -> ReadState {
        self.state
    }

    /// Closes the reader; subsequent reads return `false`.
    pub fn close(&mut self) {
        self.state = ReadState::Closed;
        self.cursor = None;
        self.attr = None;
        self.in_value = false;
    }

    /// Advances the reader to the next node in document order.
    ///
    /// Returns `true` if the reader is positioned on a node, `false` at the
    /// end of the readable region (or when closed).
    pub fn read(&mut self) -> bool {
        self.attr = None;
        self.in_value = false;
        match self.state {
            ReadState::Closed | ReadState::EndOfFile => false,
            ReadState::Initial => {
                self.state = ReadState::Interactive;
                if matches!(self.doc.node(self.start).kind, NodeKind::Document) {
                    if self.doc.declaration.is_some() {
                        self.cursor = Some(Cursor::Declaration);
                        return true;
                    }
                    return self.descend_or_finish();
                }
                self.cursor = Some(Cursor::Node(self.start));
                true
            }
            ReadState::Interactive => match self.cursor {
                None => self.finish(),
                Some(Cursor::Declaration) => self.descend_or_finish(),
                Some(Cursor::Node(id)) => match &self.doc.node(id).kind {
                    NodeKind::Element { .. } => {
                        if let Some(child) = self.doc.first_child(id) {
                            self.cursor = Some(Cursor::Node(child));
                            true
                        } else if self.doc.element_is_empty(id) {
                            self.advance_past(id)
                        } else {
                            self.cursor = Some(Cursor::End(id));
                            true
                        }
                    }
                    _ => self.advance_past(id),
                },
                Some(Cursor::End(id)) => self.advance_past(id),
            },
        }
    }

    fn descend_or_finish(&mut self) -> bool {
        if let Some(child) = self.doc.first_child(self.start) {
            self.cursor = Some(Cursor::Node(child));
            true
        } else {
            self.finish()
        }
    }

    fn advance_past(&mut self, id: NodeId) -> bool {
        if id == self.start {
            return self.finish();
        }
        if let Some(sibling) = self.doc.next_sibling(id) {
            self.cursor = Some(Cursor::Node(sibling));
            return true;
        }
        match self.doc.parent(id) {
            Some(parent) if matches!(self.doc.node(parent).kind, NodeKind::Element { .. }) => {
                self.cursor = Some(Cursor::End(parent));
                true
            }
            // Ascended to the document node (or off a detached subtree).
            _ => self.finish(),
        }
    }

    fn finish(&mut self) -> bool {
        self.state = ReadState::EndOfFile;
        self.cursor = None;
        false
    }

    // === Current node properties ===

    /// Returns the type of the current node.
    #[must_use]
    pub fn node_type(&self) -> XmlNodeType {
        match self.state {
            ReadState::Initial | ReadState::Closed => return XmlNodeType::None,
            ReadState::EndOfFile => return XmlNodeType::EndDocument,
            ReadState::Interactive => {}
        }
        if self.in_value {
            return XmlNodeType::Text;
        }
        if self.attr.is_some() {
            return XmlNodeType::Attribute;
        }
        match self.cursor {
            None => XmlNodeType::None,
            Some(Cursor::Declaration) => XmlNodeType::XmlDeclaration,
            Some(Cursor::End(_)) => XmlNodeType::EndElement,
            Some(Cursor::Node(id)) => match &self.doc.node(id).kind {
                NodeKind::Element { .. } => XmlNodeType::Element,
                NodeKind::Text { content } => {
                    if content.chars().all(char::is_whitespace) {
                        XmlNodeType::Whitespace
                    } else {
                        XmlNodeType::Text
                    }
                }
                NodeKind::CData { .. } => XmlNodeType::CData,
                NodeKind::Comment { .. } => XmlNodeType::Comment,
                NodeKind::ProcessingInstruction { .. } => XmlNodeType::ProcessingInstruction,
                NodeKind::DocumentType { .. } => XmlNodeType::DocumentType,
                NodeKind::Document => XmlNodeType::None,
            },
        }
    }

    /// Returns the tree node the cursor sits on, if it is a real node
    /// (attribute positions report their element).
    #[must_use]
    pub fn current_node(&self) -> Option<NodeId> {
        match self.cursor {
            Some(Cursor::Node(id) | Cursor::End(id)) => Some(id),
            _ => None,
        }
    }

    /// Returns the qualified name of the current node: the element name, the
    /// attribute name while navigating attributes, the target of a
    /// processing instruction, `xml` on the declaration, or the doctype's
    /// root element name.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn name(&self) -> Option<XmlName> {
        if self.in_value {
            return None;
        }
        if let Some(index) = self.attr {
            return self.attribute_at(index).map(|(name, _)| name);
        }
        match self.cursor? {
            Cursor::Declaration => Some(XmlName::get("xml").expect("static name is valid")),
            Cursor::End(id) => self.doc.node_name(id),
            Cursor::Node(id) => match &self.doc.node(id).kind {
                NodeKind::Element { name, .. } => Some(*name),
                // PI targets and doctype names are validated at construction.
                NodeKind::ProcessingInstruction { target, .. } => {
                    Some(XmlName::get(target).expect("validated name token"))
                }
                NodeKind::DocumentType { name, .. } => {
                    Some(XmlName::get(name).expect("validated name token"))
                }
                _ => None,
            },
        }
    }

    /// Returns the local part of the current node's name.
    #[must_use]
    pub fn local_name(&self) -> Option<&'static str> {
        self.name().map(XmlName::local_name)
    }

    /// Returns the namespace URI of the current node's name, or `None` when
    /// it has no namespace.
    #[must_use]
    pub fn namespace_uri(&self) -> Option<&'static str> {
        let ns = self.name()?.namespace();
        if ns.is_none() {
            None
        } else {
            Some(ns.uri())
        }
    }

    /// Returns the value of the current node: text-like content, attribute
    /// values (including synthesized declaration and doctype
    /// pseudo-attributes), the declaration's pseudo-content, or the
    /// doctype's internal subset.
    #[must_use]
    pub fn value(&self) -> Option<Cow<'d, str>> {
        if let Some(index) = self.attr {
            return self.attribute_at(index).map(|(_, value)| value);
        }
        match self.cursor? {
            Cursor::Declaration => {
                let decl = self.doc.declaration.as_ref()?;
                let mut text = format!("version=\"{}\"", decl.version);
                if let Some(encoding) = &decl.encoding {
                    let _ = write!(text, " encoding=\"{encoding}\"");
                }
                if let Some(standalone) = &decl.standalone {
                    let _ = write!(text, " standalone=\"{standalone}\"");
                }
                Some(Cow::Owned(text))
            }
            Cursor::End(_) => None,
            Cursor::Node(id) => match &self.doc.node(id).kind {
                NodeKind::Text { content }
                | NodeKind::CData { content }
                | NodeKind::Comment { content } => Some(Cow::Borrowed(content.as_str())),
                NodeKind::ProcessingInstruction { data, .. } => {
                    Some(Cow::Borrowed(data.as_str()))
                }
                NodeKind::DocumentType {
                    internal_subset, ..
                } => Some(Cow::Borrowed(
                    internal_subset.as_deref().unwrap_or(""),
                )),
                _ => None,
            },
        }
    }

    /// Returns whether the current node has a value.
    #[must_use]
    pub fn has_value(&self) -> bool {
        self.value().is_some()
    }

    /// Returns whether the current element is self-closing. `false` on
    /// attribute positions and non-elements.
    #[must_use]
    pub fn is_empty_element(&self) -> bool {
        if self.attr.is_some() {
            return false;
        }
        match self.cursor {
            Some(Cursor::Node(id)) => self.doc.element_is_empty(id),
            _ => false,
        }
    }

    /// Returns the depth of the current position.
    ///
    /// The start node's immediate content is at depth 0. Attribute positions
    /// add one level and the inside of an attribute's value a second one.
    #[must_use]
    pub fn depth(&self) -> u32 {
        let base = match self.cursor {
            None | Some(Cursor::Declaration) => 0,
            Some(Cursor::Node(id) | Cursor::End(id)) => {
                let mut edges = 0u32;
                let mut cur = id;
                while cur != self.start {
                    match self.doc.parent(cur) {
                        Some(parent) => {
                            edges += 1;
                            cur = parent;
                        }
                        None => break,
                    }
                }
                // A document start node is an envelope, not a readable
                // position; its children sit at depth 0.
                if matches!(self.doc.node(self.start).kind, NodeKind::Document) {
                    edges.saturating_sub(1)
                } else {
                    edges
                }
            }
        };
        let extra = match (self.attr.is_some(), self.in_value) {
            (_, true) => 2,
            (true, false) => 1,
            (false, false) => 0,
        };
        base + extra
    }

    // === Attributes ===

    /// Returns the number of attributes addressable at the current position:
    /// real attributes on an element, or synthesized pseudo-attributes on
    /// the XML declaration (`version`, `encoding`, `standalone`) and the
    /// doctype (`PUBLIC`, `SYSTEM`).
    #[must_use]
    pub fn attribute_count(&self) -> usize {
        match self.cursor {
            Some(Cursor::Declaration) => {
                let Some(decl) = self.doc.declaration.as_ref() else {
                    return 0;
                };
                1 + usize::from(decl.encoding.is_some()) + usize::from(decl.standalone.is_some())
            }
            Some(Cursor::Node(id)) => match &self.doc.node(id).kind {
                NodeKind::Element { .. } => self.doc.attributes(id).count(),
                NodeKind::DocumentType {
                    public_id,
                    system_id,
                    ..
                } => usize::from(public_id.is_some()) + usize::from(system_id.is_some()),
                _ => 0,
            },
            _ => 0,
        }
    }

    /// Returns the name and value of the attribute at a positional index.
    #[must_use]
    #[allow(clippy::expect_used)]
    fn attribute_at(&self, index: usize) -> Option<(XmlName, Cow<'d, str>)> {
        let pseudo = |local: &str, value: &'d str| {
            Some((
                XmlName::get(local).expect("static name is valid"),
                Cow::Borrowed(value),
            ))
        };
        match self.cursor? {
            Cursor::Declaration => {
                let decl = self.doc.declaration.as_ref()?;
                let mut fields: Vec<(&str, &'d str)> = vec![("version", decl.version.as_str())];
                if let Some(encoding) = &decl.encoding {
                    fields.push(("encoding", encoding.as_str()));
                }
                if let Some(standalone) = &decl.standalone {
                    fields.push(("standalone", standalone.as_str()));
                }
                let (local, value) = *fields.get(index)?;
                pseudo(local, value)
            }
            Cursor::Node(id) => match &self.doc.node(id).kind {
                NodeKind::Element { .. } => {
                    let attr = self.doc.attributes(id).nth(index)?;
                    Some((
                        self.doc.attr_name(attr),
                        Cow::Borrowed(self.doc.attr_value(attr)),
                    ))
                }
                NodeKind::DocumentType {
                    public_id,
                    system_id,
                    ..
                } => {
                    let mut fields: Vec<(&str, &'d str)> = Vec::new();
                    if let Some(public) = public_id {
                        fields.push(("PUBLIC", public.as_str()));
                    }
                    if let Some(system) = system_id {
                        fields.push(("SYSTEM", system.as_str()));
                    }
                    let (local, value) = *fields.get(index)?;
                    pseudo(local, value)
                }
                _ => None,
            },
            Cursor::End(_) => None,
        }
    }

    /// Returns an attribute's value by positional index without moving the
    /// cursor.
    #[must_use]
    pub fn get_attribute(&self, index: usize) -> Option<Cow<'d, str>> {
        self.attribute_at(index).map(|(_, value)| value)
    }

    /// Returns an attribute's value by expanded name (or bare local name for
    /// pseudo-attributes) without moving the cursor.
    #[must_use]
    pub fn get_attribute_named(&self, name: &str) -> Option<Cow<'d, str>> {
        let wanted = XmlName::get(name).ok()?;
        for index in 0..self.attribute_count() {
            if let Some((attr_name, value)) = self.attribute_at(index) {
                if attr_name == wanted {
                    return Some(value);
                }
            }
        }
        None
    }

    /// Moves the reader to the first attribute of the current position.
    pub fn move_to_first_attribute(&mut self) -> bool {
        if self.attribute_count() == 0 {
            return false;
        }
        self.attr = Some(0);
        self.in_value = false;
        true
    }

    /// Moves the reader to the next attribute, or the first when not yet on
    /// one.
    pub fn move_to_next_attribute(&mut self) -> bool {
        let Some(index) = self.attr else {
            return self.move_to_first_attribute();
        };
        if index + 1 >= self.attribute_count() {
            return false;
        }
        self.attr = Some(index + 1);
        self.in_value = false;
        true
    }

    /// Moves the reader to the attribute with the given expanded name.
    pub fn move_to_attribute(&mut self, name: &str) -> bool {
        let Ok(wanted) = XmlName::get(name) else {
            return false;
        };
        for index in 0..self.attribute_count() {
            if self.attribute_at(index).map(|(n, _)| n) == Some(wanted) {
                self.attr = Some(index);
                self.in_value = false;
                return true;
            }
        }
        false
    }

    /// Pops the reader back out of attribute context to the owning node
    /// without losing the cursor. Returns `false` if not on an attribute.
    pub fn move_to_element(&mut self) -> bool {
        if self.attr.is_none() {
            return false;
        }
        self.attr = None;
        self.in_value = false;
        true
    }

    /// Descends into the current attribute's value, exposing it as a text
    /// position one level deeper. Returns `false` when not on an attribute
    /// or already inside the value.
    pub fn read_attribute_value(&mut self) -> bool {
        if self.attr.is_none() || self.in_value {
            return false;
        }
        self.in_value = true;
        true
    }
}
