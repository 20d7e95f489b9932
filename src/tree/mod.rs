//! Arena-based XML document tree.
//!
//! This module implements the core tree representation using arena allocation
//! with typed indices. All nodes live in a contiguous `Vec<NodeData>` owned by
//! the `Document`, and are referenced by `NodeId` — a newtype over
//! `NonZeroU32`. Attributes live in a second arena referenced by `AttrId` and
//! form an independent doubly-linked chain per element, separate from the
//! child chain.
//!
//! This design provides O(1) node access, cache-friendly layout, no reference
//! counting overhead, and safe bulk deallocation (drop the `Document` and
//! everything is freed).
//!
//! # Architecture
//!
//! Arena indices serve as all navigation links (parent, first\_child,
//! last\_child, next\_sibling, prev\_sibling). "Detached" nodes are simply
//! arena entries with no parent; content added to a container that already
//! has an owner is detached first and moved, never copied. Several detached
//! subtrees can coexist in one arena, which is what the document-order
//! comparator's unrelated-tree rule applies to.
//!
//! All mutation goes through `&mut Document` — the tree itself carries no
//! locks and is single-writer by construction. Iterators capture the next
//! link before yielding, so removing the node an iterator just returned is
//! safe; inserting or removing unrelated nodes mid-iteration is not.

mod equality;
mod node;
mod order;

pub use equality::{deep_equals, deep_hash};
pub use node::{Declaration, NodeKind};
pub use order::compare_in_document_order;

use crate::error::{Error, Result, SourceLocation};
use crate::name::{Namespace, XmlName};
use crate::parser::ParseOptions;
use crate::serial::SerializeOptions;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;

/// A typed index into the document's node arena.
///
/// `NodeId` is a newtype over `NonZeroU32`, meaning it can never be zero
/// and `Option<NodeId>` has the same size as `NodeId` (niche optimization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Creates a `NodeId` from a raw index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 0.
    #[allow(clippy::expect_used, clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::new(index as u32).expect("NodeId index must be non-zero"))
    }

    /// Returns the raw index as a `usize` for indexing into the arena.
    fn as_index(self) -> usize {
        self.0.get() as usize
    }
}

/// A typed index into the document's attribute arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct AttrId(NonZeroU32);

impl AttrId {
    #[allow(clippy::expect_used, clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::new(index as u32).expect("AttrId index must be non-zero"))
    }

    fn as_index(self) -> usize {
        self.0.get() as usize
    }
}

/// Storage for a single node in the document arena.
///
/// Each node stores its kind (element, text, comment, etc.) and links to
/// parent, children, and siblings for tree navigation. Access individual
/// nodes via [`Document::node`].
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is (element, text, comment, etc.) and its payload.
    pub kind: NodeKind,
    /// Parent node, if any. The document root node and detached nodes have none.
    pub parent: Option<NodeId>,
    /// First child node.
    pub first_child: Option<NodeId>,
    /// Last child node (for O(1) append).
    pub last_child: Option<NodeId>,
    /// Next sibling.
    pub next_sibling: Option<NodeId>,
    /// Previous sibling.
    pub prev_sibling: Option<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
        }
    }
}

/// Storage for a single attribute in the attribute arena.
///
/// Attributes are never members of the child chain; they form their own
/// doubly-linked chain headed by the owning element's `first_attr` /
/// `last_attr` pointers.
#[derive(Debug, Clone)]
pub struct AttrData {
    /// The attribute's qualified name.
    pub name: XmlName,
    /// The attribute value.
    pub value: String,
    /// The element this attribute belongs to, if attached.
    pub owner: Option<NodeId>,
    /// Previous attribute in the owner's chain.
    pub prev: Option<AttrId>,
    /// Next attribute in the owner's chain.
    pub next: Option<AttrId>,
}

/// What part of a mutation a change notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeTarget {
    /// A node was affected.
    Node(NodeId),
    /// An attribute was affected.
    Attr(AttrId),
}

/// The kind of mutation a change notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Content was added to a container.
    Add,
    /// Content was removed from a container.
    Remove,
    /// A name changed (element rename, PI retarget).
    Name,
    /// A scalar value changed (text content, attribute value).
    Value,
}

/// Whether a notification fires before or after the mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangePhase {
    /// The mutation has been validated but not yet applied.
    Changing,
    /// The mutation has been applied.
    Changed,
}

/// A change notification delivered to observers registered with
/// [`Document::watch`].
///
/// Notifications bubble: a mutation anywhere under a watched node invokes
/// that node's observers, walking from the mutation site up to the root.
/// Observers receive only this event value — never the tree itself — so an
/// observer cannot interleave further mutation with the one in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    /// The node or attribute the mutation applies to.
    pub target: ChangeTarget,
    /// What kind of mutation occurred.
    pub kind: ChangeKind,
    /// Whether this fires before ([`ChangePhase::Changing`]) or after
    /// ([`ChangePhase::Changed`]) the mutation.
    pub phase: ChangePhase,
}

/// Content accepted by the tree-mutation entry points ([`Document::add`] and
/// friends).
///
/// Mirrors the normalization rules of the insertion path: bare strings wrap
/// as text, nested collections flatten in order, and [`Content::None`]
/// entries are silently skipped. Use the [`content!`](crate::content) macro
/// to build mixed sequences.
#[derive(Debug)]
pub enum Content {
    /// Nothing — skipped without error.
    None,
    /// An existing node, detached from any prior owner and moved.
    Node(NodeId),
    /// An attribute (valid only when the target is an element).
    Attr(AttrId),
    /// A string, wrapped as a text node (or merged into a trailing one).
    Text(String),
    /// A sequence, flattened recursively in order.
    Many(Vec<Content>),
}

impl From<NodeId> for Content {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<AttrId> for Content {
    fn from(id: AttrId) -> Self {
        Self::Attr(id)
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl<T: Into<Content>> From<Option<T>> for Content {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(value) => value.into(),
            None => Self::None,
        }
    }
}

impl<T: Into<Content>> From<Vec<T>> for Content {
    fn from(items: Vec<T>) -> Self {
        Self::Many(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Content>, const N: usize> From<[T; N]> for Content {
    fn from(items: [T; N]) -> Self {
        Self::Many(items.into_iter().map(Into::into).collect())
    }
}

/// Builds a [`Content::Many`] sequence from mixed content expressions.
///
/// # Examples
///
/// ```
/// use xylo::{content, Document, XmlName};
///
/// let mut doc = Document::new();
/// let root = doc.new_element(XmlName::get("root").unwrap());
/// let child = doc.new_element(XmlName::get("child").unwrap());
/// doc.add(root, content![child, "text"]).unwrap();
/// assert_eq!(doc.children(root).count(), 2);
/// ```
#[macro_export]
macro_rules! content {
    () => { $crate::Content::None };
    ($($item:expr),+ $(,)?) => {
        $crate::Content::Many(vec![$($crate::Content::from($item)),+])
    };
}

/// A flattened content item, produced before any mutation happens so that
/// content computed from the container's current state is captured first.
enum ContentItem {
    Node(NodeId),
    Attr(AttrId),
    Text(String),
}

fn flatten_content(content: Content, out: &mut Vec<ContentItem>) {
    match content {
        Content::None => {}
        Content::Node(id) => out.push(ContentItem::Node(id)),
        Content::Attr(id) => out.push(ContentItem::Attr(id)),
        Content::Text(s) => out.push(ContentItem::Text(s)),
        Content::Many(items) => {
            for item in items {
                flatten_content(item, out);
            }
        }
    }
}

type Observer = Box<dyn FnMut(&ChangeEvent)>;

/// An XML document.
///
/// The `Document` owns all nodes and attributes in arenas and provides
/// methods for tree navigation and mutation. All tree operations go through
/// `&Document` (navigation) or `&mut Document` (mutation). The arena root is
/// always a document node; free-standing elements and text are simply arena
/// entries that are not (yet) attached to anything.
///
/// # Examples
///
/// ```
/// use xylo::Document;
///
/// let doc = Document::parse_str("<root/>").unwrap();
/// let root = doc.root_element().unwrap();
/// assert_eq!(doc.node_name(root).unwrap().local_name(), "root");
/// ```
pub struct Document {
    /// The node arena. Index 0 is unused (placeholder for `NonZeroU32`).
    nodes: Vec<NodeData>,
    /// The attribute arena. Index 0 is unused.
    attrs: Vec<AttrData>,
    /// The document root node id.
    root: NodeId,
    /// The XML declaration, if any.
    pub declaration: Option<Declaration>,
    /// The base URI the document was loaded from, if recorded.
    pub base_uri: Option<String>,
    /// Per-node out-of-band data, keyed by type.
    annotations: HashMap<NodeId, Vec<Box<dyn Any + Send + Sync>>>,
    /// Per-node source provenance, populated when parsing with line info.
    locations: HashMap<NodeId, SourceLocation>,
    /// Change observers, keyed by the watched node.
    observers: HashMap<NodeId, Vec<Observer>>,
}

impl Document {
    /// Creates a new empty document.
    ///
    /// The document contains a single root document node.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        // Index 0: placeholder (NodeId uses NonZeroU32)
        nodes.push(NodeData::new(NodeKind::Document));
        // Index 1: the document root node
        nodes.push(NodeData::new(NodeKind::Document));
        let root = NodeId::from_index(1);
        Self {
            nodes,
            attrs: vec![AttrData {
                name: XmlName::get("placeholder").expect("static name is valid"),
                value: String::new(),
                owner: None,
                prev: None,
                next: None,
            }],
            root,
            declaration: None,
            base_uri: None,
            annotations: HashMap::new(),
            locations: HashMap::new(),
            observers: HashMap::new(),
        }
    }

    /// Parses an XML string into a `Document` with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not well-formed XML.
    ///
    /// # Examples
    ///
    /// ```
    /// use xylo::Document;
    ///
    /// let doc = Document::parse_str("<root><child/></root>").unwrap();
    /// ```
    pub fn parse_str(input: &str) -> Result<Self> {
        crate::parser::parse_str(input, &ParseOptions::default())
    }

    /// Parses an XML string with explicit [`ParseOptions`].
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not well-formed XML.
    pub fn parse_str_with(input: &str, options: &ParseOptions) -> Result<Self> {
        crate::parser::parse_str(input, options)
    }

    /// Parses XML from raw bytes, detecting encoding automatically.
    ///
    /// Uses BOM sniffing and XML declaration inspection to determine the
    /// encoding, transcodes to UTF-8, then parses. See
    /// [`crate::encoding::decode_to_utf8`].
    ///
    /// # Errors
    ///
    /// Returns an error if the encoding cannot be determined, the bytes
    /// cannot be transcoded, or the resulting XML is not well-formed.
    pub fn parse_bytes(input: &[u8]) -> Result<Self> {
        Self::parse_bytes_with(input, &ParseOptions::default())
    }

    /// Parses XML from raw bytes with explicit [`ParseOptions`].
    ///
    /// # Errors
    ///
    /// Same conditions as [`Document::parse_bytes`].
    pub fn parse_bytes_with(input: &[u8], options: &ParseOptions) -> Result<Self> {
        let utf8 = crate::encoding::decode_to_utf8(input)?;
        let text = utf8.strip_prefix('\u{FEFF}').unwrap_or(&utf8);
        crate::parser::parse_str(text, options)
    }

    /// Serializes the document to an XML string with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if a comment or processing instruction holds content
    /// that cannot be represented in serialized form (`--` in a comment,
    /// `?>` in PI data).
    pub fn to_xml(&self) -> Result<String> {
        crate::serial::document_to_string(self, &SerializeOptions::default())
    }

    /// Serializes the document with explicit [`SerializeOptions`].
    ///
    /// # Errors
    ///
    /// Same conditions as [`Document::to_xml`].
    pub fn to_xml_with(&self, options: &SerializeOptions) -> Result<String> {
        crate::serial::document_to_string(self, options)
    }

    /// Returns the document root node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the root element of the document (the single top-level element).
    ///
    /// Returns `None` if the document has no element child.
    #[must_use]
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root)
            .find(|&id| matches!(self.node(id).kind, NodeKind::Element { .. }))
    }

    /// Returns the document type declaration node, if present.
    #[must_use]
    pub fn document_type(&self) -> Option<NodeId> {
        self.children(self.root)
            .find(|&id| matches!(self.node(id).kind, NodeKind::DocumentType { .. }))
    }

    /// Returns a reference to the [`NodeData`] for the given node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a valid node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Returns a reference to the [`AttrData`] for the given attribute.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a valid attribute.
    #[must_use]
    pub fn attr(&self, id: AttrId) -> &AttrData {
        &self.attrs[id.as_index()]
    }

    fn attr_mut(&mut self, id: AttrId) -> &mut AttrData {
        &mut self.attrs[id.as_index()]
    }

    /// Returns the qualified name of an element node.
    ///
    /// Non-element nodes return `None`; processing instructions expose their
    /// target via [`Document::pi_target`] instead.
    #[must_use]
    pub fn node_name(&self, id: NodeId) -> Option<XmlName> {
        match self.node(id).kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the target of a processing instruction node.
    #[must_use]
    pub fn pi_target(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::ProcessingInstruction { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Returns the scalar payload of a text, CDATA, or comment node, or the
    /// data of a processing instruction.
    ///
    /// For container nodes, returns `None` — use
    /// [`text_content`](Document::text_content) to get the concatenated text
    /// of all descendant text nodes.
    #[must_use]
    pub fn node_text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text { content }
            | NodeKind::Comment { content }
            | NodeKind::CData { content } => Some(content),
            NodeKind::ProcessingInstruction { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Returns the concatenated text of the node and all its descendants, in
    /// document order. Text and CDATA payloads contribute; comments and
    /// processing instructions do not.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut result = String::new();
        self.collect_text(id, &mut result);
        result
    }

    fn collect_text(&self, id: NodeId, buf: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text { content } | NodeKind::CData { content } => {
                buf.push_str(content);
            }
            _ => {
                for child in self.children(id) {
                    self.collect_text(child, buf);
                }
            }
        }
    }

    /// Returns `true` if a childless element should serialize self-closing
    /// (`<a/>`), `false` for the expanded form (`<a></a>`). Elements with
    /// children and non-element nodes return `false`.
    #[must_use]
    pub fn element_is_empty(&self, id: NodeId) -> bool {
        match self.node(id).kind {
            NodeKind::Element { is_empty, .. } => is_empty && self.node(id).first_child.is_none(),
            _ => false,
        }
    }

    pub(crate) fn set_element_empty(&mut self, id: NodeId, empty: bool) {
        if let NodeKind::Element { is_empty, .. } = &mut self.node_mut(id).kind {
            *is_empty = empty;
        }
    }

    /// Returns the total number of nodes in the arena (excluding placeholder).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1
    }

    // === Navigation ===

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }

    /// Returns the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).last_child
    }

    /// Returns the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling
    }

    /// Returns the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev_sibling
    }

    /// Returns an iterator over the children of a node.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.node(id).first_child,
        }
    }

    /// Returns an iterator over a node and its ancestors (walking up to root).
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: Some(id),
        }
    }

    /// Returns an iterator over all descendants of a node (depth-first,
    /// excluding the node itself).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            root: id,
            next: self.first_child(id),
        }
    }

    /// Returns an iterator over the siblings after a node, in document order.
    pub fn following_siblings(&self, id: NodeId) -> FollowingSiblings<'_> {
        FollowingSiblings {
            doc: self,
            next: self.next_sibling(id),
        }
    }

    /// Returns an iterator over the siblings before a node, in reverse
    /// document order.
    pub fn preceding_siblings(&self, id: NodeId) -> PrecedingSiblings<'_> {
        PrecedingSiblings {
            doc: self,
            next: self.prev_sibling(id),
        }
    }

    /// Returns an iterator over the element children of a node.
    pub fn elements(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(parent)
            .filter(move |&c| matches!(self.node(c).kind, NodeKind::Element { .. }))
    }

    /// Returns an iterator over the element children with the given name.
    pub fn elements_named(
        &self,
        parent: NodeId,
        name: XmlName,
    ) -> impl Iterator<Item = NodeId> + '_ {
        self.children(parent)
            .filter(move |&c| self.node_name(c) == Some(name))
    }

    /// Returns the first element child with the given name.
    #[must_use]
    pub fn element(&self, parent: NodeId, name: XmlName) -> Option<NodeId> {
        self.elements_named(parent, name).next()
    }

    /// Returns an iterator over all descendant elements with the given name.
    pub fn descendants_named(
        &self,
        root: NodeId,
        name: XmlName,
    ) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(root)
            .filter(move |&c| self.node_name(c) == Some(name))
    }

    // === Node constructors ===

    /// Allocates a new detached element node.
    pub fn new_element(&mut self, name: XmlName) -> NodeId {
        self.create_node(NodeKind::Element {
            name,
            is_empty: true,
            first_attr: None,
            last_attr: None,
        })
    }

    /// Allocates a new detached text node.
    pub fn new_text(&mut self, content: &str) -> NodeId {
        self.create_node(NodeKind::Text {
            content: content.to_string(),
        })
    }

    /// Allocates a new detached CDATA node.
    pub fn new_cdata(&mut self, content: &str) -> NodeId {
        self.create_node(NodeKind::CData {
            content: content.to_string(),
        })
    }

    /// Allocates a new detached comment node.
    ///
    /// The content is not validated here; a comment holding `--` is rejected
    /// at serialization time instead.
    pub fn new_comment(&mut self, content: &str) -> NodeId {
        self.create_node(NodeKind::Comment {
            content: content.to_string(),
        })
    }

    /// Allocates a new detached processing-instruction node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] if `target` is not a legal XML name or is
    /// the reserved target `xml` (in any case).
    pub fn new_processing_instruction(&mut self, target: &str, data: &str) -> Result<NodeId> {
        crate::name::validate_name(target)?;
        if target.eq_ignore_ascii_case("xml") {
            return Err(Error::argument(
                "'xml' is a reserved processing instruction target",
            ));
        }
        Ok(self.create_node(NodeKind::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        }))
    }

    /// Allocates a new detached document type declaration node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] if `name` is not a legal XML name.
    pub fn new_document_type(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        internal_subset: Option<&str>,
    ) -> Result<NodeId> {
        crate::name::validate_name(name)?;
        Ok(self.create_node(NodeKind::DocumentType {
            name: name.to_string(),
            public_id: public_id.map(str::to_string),
            system_id: system_id.map(str::to_string),
            internal_subset: internal_subset.map(str::to_string),
        }))
    }

    /// Allocates a new detached attribute.
    pub fn new_attribute(&mut self, name: XmlName, value: &str) -> AttrId {
        let index = self.attrs.len();
        self.attrs.push(AttrData {
            name,
            value: value.to_string(),
            owner: None,
            prev: None,
            next: None,
        });
        AttrId::from_index(index)
    }

    /// Allocates a new node in the arena and returns its `NodeId`.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(NodeData::new(kind));
        NodeId::from_index(index)
    }

    // === Attributes ===

    /// Returns an iterator over an element's attribute chain.
    ///
    /// Returns an empty iterator for non-element nodes.
    pub fn attributes(&self, id: NodeId) -> Attributes<'_> {
        let first = match self.node(id).kind {
            NodeKind::Element { first_attr, .. } => first_attr,
            _ => None,
        };
        Attributes { doc: self, next: first }
    }

    /// Returns the first attribute of an element.
    #[must_use]
    pub fn first_attribute(&self, id: NodeId) -> Option<AttrId> {
        match self.node(id).kind {
            NodeKind::Element { first_attr, .. } => first_attr,
            _ => None,
        }
    }

    /// Returns the last attribute of an element.
    #[must_use]
    pub fn last_attribute(&self, id: NodeId) -> Option<AttrId> {
        match self.node(id).kind {
            NodeKind::Element { last_attr, .. } => last_attr,
            _ => None,
        }
    }

    /// Returns `true` if the element has at least one attribute.
    #[must_use]
    pub fn has_attributes(&self, id: NodeId) -> bool {
        self.first_attribute(id).is_some()
    }

    /// Returns the attribute with the given name on an element, if present.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: XmlName) -> Option<AttrId> {
        self.attributes(id).find(|&a| self.attr(a).name == name)
    }

    /// Returns the value of the attribute with the given name on an element.
    #[must_use]
    pub fn attribute_value(&self, id: NodeId, name: XmlName) -> Option<&str> {
        self.attribute(id, name).map(|a| self.attr(a).value.as_str())
    }

    /// Returns an attribute's qualified name.
    #[must_use]
    pub fn attr_name(&self, id: AttrId) -> XmlName {
        self.attr(id).name
    }

    /// Returns an attribute's value.
    #[must_use]
    pub fn attr_value(&self, id: AttrId) -> &str {
        &self.attr(id).value
    }

    /// Returns the element an attribute is attached to, if any.
    #[must_use]
    pub fn attr_owner(&self, id: AttrId) -> Option<NodeId> {
        self.attr(id).owner
    }

    /// Returns the next attribute in the owning element's chain.
    #[must_use]
    pub fn next_attribute(&self, id: AttrId) -> Option<AttrId> {
        self.attr(id).next
    }

    /// Returns the previous attribute in the owning element's chain.
    #[must_use]
    pub fn prev_attribute(&self, id: AttrId) -> Option<AttrId> {
        self.attr(id).prev
    }

    /// Sets an attribute's value, firing `Value` change notifications through
    /// the owning element's ancestor chain when attached.
    pub fn set_attr_value(&mut self, id: AttrId, value: &str) {
        let owner = self.attr(id).owner;
        if let Some(el) = owner {
            self.raise(el, ChangeTarget::Attr(id), ChangeKind::Value, ChangePhase::Changing);
        }
        self.attr_mut(id).value = value.to_string();
        if let Some(el) = owner {
            self.raise(el, ChangeTarget::Attr(id), ChangeKind::Value, ChangePhase::Changed);
        }
    }

    /// Returns `true` if the attribute is a namespace declaration: its name
    /// is in the `xmlns` namespace (`xmlns:prefix="uri"`), or its local name
    /// is `xmlns` with no namespace (`xmlns="uri"`).
    #[must_use]
    pub fn is_namespace_declaration(&self, id: AttrId) -> bool {
        declared_prefix(self.attr(id).name).is_some()
    }

    /// Appends an attribute to an element's chain.
    ///
    /// An attribute attached elsewhere is detached first and moved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] if `element` is not an element, and
    /// [`Error::InvalidOperation`] if an attribute with the same name already
    /// exists on it — the chain is left unchanged in that case.
    pub fn add_attribute(&mut self, element: NodeId, attr: AttrId) -> Result<()> {
        if !matches!(self.node(element).kind, NodeKind::Element { .. }) {
            return Err(Error::argument("attributes can only be added to elements"));
        }
        let name = self.attr(attr).name;
        if self.attribute(element, name).is_some() {
            return Err(Error::invalid_op(format!("duplicate attribute '{name}'")));
        }
        if self.attr(attr).owner.is_some() {
            self.remove_attribute(attr);
        }
        self.raise(element, ChangeTarget::Attr(attr), ChangeKind::Add, ChangePhase::Changing);
        self.attach_attr(element, attr);
        self.raise(element, ChangeTarget::Attr(attr), ChangeKind::Add, ChangePhase::Changed);
        Ok(())
    }

    /// Adds, updates, or removes an attribute by name: `Some(value)` adds or
    /// updates, `None` removes (a no-op if the attribute is absent).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] if `element` is not an element.
    pub fn set_attribute_value(
        &mut self,
        element: NodeId,
        name: XmlName,
        value: Option<&str>,
    ) -> Result<()> {
        if !matches!(self.node(element).kind, NodeKind::Element { .. }) {
            return Err(Error::argument("attributes can only be set on elements"));
        }
        match (self.attribute(element, name), value) {
            (Some(attr), Some(v)) => {
                self.set_attr_value(attr, v);
                Ok(())
            }
            (Some(attr), None) => {
                self.remove_attribute(attr);
                Ok(())
            }
            (None, Some(v)) => {
                let attr = self.new_attribute(name, v);
                self.add_attribute(element, attr)
            }
            (None, None) => Ok(()),
        }
    }

    /// Unlinks an attribute from its owning element.
    ///
    /// Removing an attribute that is not attached to anything is a no-op.
    pub fn remove_attribute(&mut self, attr: AttrId) {
        let Some(el) = self.attr(attr).owner else {
            return;
        };
        self.raise(el, ChangeTarget::Attr(attr), ChangeKind::Remove, ChangePhase::Changing);
        self.detach_attr(attr);
        self.raise(el, ChangeTarget::Attr(attr), ChangeKind::Remove, ChangePhase::Changed);
    }

    /// Removes all attributes from an element.
    pub fn remove_attributes(&mut self, element: NodeId) {
        let attrs: Vec<AttrId> = self.attributes(element).collect();
        for attr in attrs {
            self.remove_attribute(attr);
        }
    }

    fn attach_attr(&mut self, element: NodeId, attr: AttrId) {
        self.attr_mut(attr).owner = Some(element);
        let last = self.last_attribute(element);
        match last {
            Some(prev) => {
                self.attr_mut(prev).next = Some(attr);
                self.attr_mut(attr).prev = Some(prev);
            }
            None => self.with_attr_links(element, |first, _| *first = Some(attr)),
        }
        self.with_attr_links(element, |_, last| *last = Some(attr));
    }

    fn detach_attr(&mut self, attr: AttrId) {
        let Some(el) = self.attr(attr).owner else {
            return;
        };
        let prev = self.attr(attr).prev;
        let next = self.attr(attr).next;
        match prev {
            Some(p) => self.attr_mut(p).next = next,
            None => self.with_attr_links(el, |first, _| *first = next),
        }
        match next {
            Some(n) => self.attr_mut(n).prev = prev,
            None => self.with_attr_links(el, |_, last| *last = prev),
        }
        let data = self.attr_mut(attr);
        data.owner = None;
        data.prev = None;
        data.next = None;
    }

    fn with_attr_links<R>(
        &mut self,
        element: NodeId,
        f: impl FnOnce(&mut Option<AttrId>, &mut Option<AttrId>) -> R,
    ) -> R {
        match &mut self.node_mut(element).kind {
            NodeKind::Element {
                first_attr,
                last_attr,
                ..
            } => f(first_attr, last_attr),
            _ => panic!("attribute chain on a non-element node"),
        }
    }

    // === Namespace scope lookup ===

    /// Resolves a prefix to its in-scope namespace at the given node by
    /// scanning namespace-declaration attributes from the node upward.
    /// The reserved `xml` prefix is always bound. An empty prefix resolves
    /// the default namespace.
    #[must_use]
    pub fn namespace_for_prefix(&self, node: NodeId, prefix: &str) -> Option<Namespace> {
        if prefix == "xml" {
            return Some(Namespace::xml());
        }
        let mut cur = Some(node);
        while let Some(id) = cur {
            for attr in self.attributes(id) {
                if declared_prefix(self.attr(attr).name) == Some(prefix) {
                    return Some(Namespace::get(&self.attr(attr).value));
                }
            }
            cur = self.node(id).parent;
        }
        None
    }

    /// Finds a prefix whose in-scope binding at the given node is the given
    /// namespace. Shadowed declarations are skipped; the empty string means
    /// the default namespace. Returns `None` when no in-scope declaration
    /// binds the namespace.
    #[must_use]
    pub fn prefix_for_namespace(&self, node: NodeId, ns: Namespace) -> Option<String> {
        if ns == Namespace::xml() {
            return Some("xml".to_string());
        }
        let mut shadowed: Vec<&str> = Vec::new();
        let mut cur = Some(node);
        while let Some(id) = cur {
            for attr in self.attributes(id) {
                let Some(prefix) = declared_prefix(self.attr(attr).name) else {
                    continue;
                };
                if shadowed.contains(&prefix) {
                    continue;
                }
                shadowed.push(prefix);
                if Namespace::get(&self.attr(attr).value) == ns {
                    return Some(prefix.to_string());
                }
            }
            cur = self.node(id).parent;
        }
        None
    }

    // === Mutation ===

    /// Appends content at the tail of a container.
    ///
    /// Content is normalized per [`Content`]: nested sequences flatten in
    /// order, `None` entries are skipped, strings become text nodes (a
    /// string appended to an element whose last child is already a text node
    /// is merged into it), nodes are detached from any prior owner and
    /// moved, and attributes append to the attribute chain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] for content the target cannot hold (an
    /// attribute on a document, a doctype on an element, non-whitespace text
    /// at the document top level) and [`Error::InvalidOperation`] for
    /// structural violations (second root element, doctype after the root,
    /// duplicate attribute, adding a node inside itself). Items accepted
    /// before a rejected item remain added.
    ///
    /// # Examples
    ///
    /// ```
    /// use xylo::{content, Document, XmlName};
    ///
    /// let mut doc = Document::new();
    /// let root = doc.new_element(XmlName::get("root").unwrap());
    /// doc.add(doc.root(), root).unwrap();
    /// doc.add(root, content!["hello, ", "world"]).unwrap();
    /// assert_eq!(doc.text_content(root), "hello, world");
    /// assert_eq!(doc.children(root).count(), 1); // merged into one text node
    /// ```
    pub fn add(&mut self, parent: NodeId, content: impl Into<Content>) -> Result<()> {
        self.insert_content(parent, None, content.into(), true)
    }

    /// Inserts content at the head of a container, preserving the content's
    /// own order.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Document::add`].
    pub fn add_first(&mut self, parent: NodeId, content: impl Into<Content>) -> Result<()> {
        let anchor = self.node(parent).first_child;
        self.insert_content(parent, anchor, content.into(), false)
    }

    /// Inserts content immediately before a reference node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the reference node has no
    /// parent, plus the conditions of [`Document::add`].
    pub fn add_before(&mut self, reference: NodeId, content: impl Into<Content>) -> Result<()> {
        let Some(parent) = self.node(reference).parent else {
            return Err(Error::invalid_op("the reference node has no parent"));
        };
        self.insert_content(parent, Some(reference), content.into(), false)
    }

    /// Inserts content immediately after a reference node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the reference node has no
    /// parent, plus the conditions of [`Document::add`].
    pub fn add_after(&mut self, reference: NodeId, content: impl Into<Content>) -> Result<()> {
        let Some(parent) = self.node(reference).parent else {
            return Err(Error::invalid_op("the reference node has no parent"));
        };
        let anchor = self.node(reference).next_sibling;
        self.insert_content(parent, anchor, content.into(), false)
    }

    /// Unlinks a node from its parent, re-patching neighbor links and the
    /// parent's first/last pointers, then clears the node's own sibling and
    /// parent links. The node stays allocated and can be re-added.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the node has no parent.
    pub fn remove(&mut self, node: NodeId) -> Result<()> {
        let Some(parent) = self.node(node).parent else {
            return Err(Error::invalid_op("the node has no parent"));
        };
        self.raise(parent, ChangeTarget::Node(node), ChangeKind::Remove, ChangePhase::Changing);
        self.detach(node);
        self.raise(parent, ChangeTarget::Node(node), ChangeKind::Remove, ChangePhase::Changed);
        Ok(())
    }

    /// Removes all children of a container. Iterates over a snapshot, so the
    /// removals do not disturb the traversal.
    pub fn remove_nodes(&mut self, parent: NodeId) {
        let children: Vec<NodeId> = self.children(parent).collect();
        for child in children {
            self.raise(parent, ChangeTarget::Node(child), ChangeKind::Remove, ChangePhase::Changing);
            self.detach(child);
            self.raise(parent, ChangeTarget::Node(child), ChangeKind::Remove, ChangePhase::Changed);
        }
    }

    /// Replaces all children of a container with new content.
    ///
    /// The new content is materialized in full *before* the old children are
    /// removed, so content computed from the container's current state (for
    /// example, its children in reverse order) is captured correctly.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Document::add`].
    pub fn replace_nodes(&mut self, parent: NodeId, content: impl Into<Content>) -> Result<()> {
        if !self.node(parent).kind.is_container() {
            return Err(Error::argument("target node cannot contain content"));
        }
        let mut items = Vec::new();
        flatten_content(content.into(), &mut items);
        self.remove_nodes(parent);
        self.insert_items(parent, None, items, true)
    }

    /// Renames an element, firing `Name` change notifications.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] if the node is not an element.
    pub fn set_name(&mut self, element: NodeId, name: XmlName) -> Result<()> {
        if !matches!(self.node(element).kind, NodeKind::Element { .. }) {
            return Err(Error::argument("only elements can be renamed"));
        }
        self.raise(element, ChangeTarget::Node(element), ChangeKind::Name, ChangePhase::Changing);
        if let NodeKind::Element { name: n, .. } = &mut self.node_mut(element).kind {
            *n = name;
        }
        self.raise(element, ChangeTarget::Node(element), ChangeKind::Name, ChangePhase::Changed);
        Ok(())
    }

    /// Retargets a processing instruction, firing `Name` change notifications.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] if the node is not a processing
    /// instruction or the target is not a legal, non-reserved name.
    pub fn set_pi_target(&mut self, pi: NodeId, target: &str) -> Result<()> {
        if !matches!(self.node(pi).kind, NodeKind::ProcessingInstruction { .. }) {
            return Err(Error::argument("node is not a processing instruction"));
        }
        crate::name::validate_name(target)?;
        if target.eq_ignore_ascii_case("xml") {
            return Err(Error::argument(
                "'xml' is a reserved processing instruction target",
            ));
        }
        self.raise(pi, ChangeTarget::Node(pi), ChangeKind::Name, ChangePhase::Changing);
        if let NodeKind::ProcessingInstruction { target: t, .. } = &mut self.node_mut(pi).kind {
            *t = target.to_string();
        }
        self.raise(pi, ChangeTarget::Node(pi), ChangeKind::Name, ChangePhase::Changed);
        Ok(())
    }

    /// Sets a node's value: the payload of a text, CDATA, or comment node,
    /// the data of a processing instruction, or — for an element — replaces
    /// all children with a single text node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] for document and doctype nodes.
    pub fn set_value(&mut self, node: NodeId, value: &str) -> Result<()> {
        match &self.node(node).kind {
            NodeKind::Text { .. } | NodeKind::CData { .. } | NodeKind::Comment { .. } => {
                self.raise(node, ChangeTarget::Node(node), ChangeKind::Value, ChangePhase::Changing);
                match &mut self.node_mut(node).kind {
                    NodeKind::Text { content }
                    | NodeKind::CData { content }
                    | NodeKind::Comment { content } => *content = value.to_string(),
                    _ => {}
                }
                self.raise(node, ChangeTarget::Node(node), ChangeKind::Value, ChangePhase::Changed);
                Ok(())
            }
            NodeKind::ProcessingInstruction { .. } => {
                self.raise(node, ChangeTarget::Node(node), ChangeKind::Value, ChangePhase::Changing);
                if let NodeKind::ProcessingInstruction { data, .. } = &mut self.node_mut(node).kind
                {
                    *data = value.to_string();
                }
                self.raise(node, ChangeTarget::Node(node), ChangeKind::Value, ChangePhase::Changed);
                Ok(())
            }
            NodeKind::Element { .. } => {
                self.remove_nodes(node);
                self.add(node, value)
            }
            NodeKind::Document | NodeKind::DocumentType { .. } => {
                Err(Error::argument("this node kind has no settable value"))
            }
        }
    }

    fn insert_content(
        &mut self,
        parent: NodeId,
        anchor: Option<NodeId>,
        content: Content,
        coalesce: bool,
    ) -> Result<()> {
        if !self.node(parent).kind.is_container() {
            return Err(Error::argument("target node cannot contain content"));
        }
        let mut items = Vec::new();
        flatten_content(content, &mut items);
        self.insert_items(parent, anchor, items, coalesce)
    }

    fn insert_items(
        &mut self,
        parent: NodeId,
        anchor: Option<NodeId>,
        items: Vec<ContentItem>,
        coalesce: bool,
    ) -> Result<()> {
        for item in items {
            match item {
                ContentItem::Text(s) => self.insert_text(parent, anchor, s, coalesce)?,
                ContentItem::Node(n) => self.insert_node(parent, anchor, n)?,
                ContentItem::Attr(a) => self.add_attribute(parent, a)?,
            }
        }
        Ok(())
    }

    fn insert_text(
        &mut self,
        parent: NodeId,
        anchor: Option<NodeId>,
        s: String,
        coalesce: bool,
    ) -> Result<()> {
        // Merging into a trailing text node is an optimization only; it must
        // preserve the value sequence exactly.
        if coalesce
            && anchor.is_none()
            && matches!(self.node(parent).kind, NodeKind::Element { .. })
        {
            if let Some(last) = self.node(parent).last_child {
                if matches!(self.node(last).kind, NodeKind::Text { .. }) {
                    self.raise(last, ChangeTarget::Node(last), ChangeKind::Value, ChangePhase::Changing);
                    if let NodeKind::Text { content } = &mut self.node_mut(last).kind {
                        content.push_str(&s);
                    }
                    self.raise(last, ChangeTarget::Node(last), ChangeKind::Value, ChangePhase::Changed);
                    return Ok(());
                }
            }
        }
        let text = self.new_text(&s);
        self.insert_node(parent, anchor, text)
    }

    fn insert_node(&mut self, parent: NodeId, anchor: Option<NodeId>, n: NodeId) -> Result<()> {
        if anchor == Some(n) {
            // Inserting a node directly before itself leaves it where it is.
            return Ok(());
        }
        self.verify_added_node(parent, n, anchor)?;
        if self.node(n).parent.is_some() {
            // Owned content is moved: removed from its current owner (with
            // that container's own notifications) and re-attached here.
            self.remove(n)?;
        }
        self.raise(parent, ChangeTarget::Node(n), ChangeKind::Add, ChangePhase::Changing);
        match anchor {
            Some(reference) => self.attach_before(reference, n),
            None => self.attach_tail(parent, n),
        }
        self.raise(parent, ChangeTarget::Node(n), ChangeKind::Add, ChangePhase::Changed);
        Ok(())
    }

    /// Enforces the container's structural rules before any link changes.
    fn verify_added_node(
        &self,
        parent: NodeId,
        n: NodeId,
        anchor: Option<NodeId>,
    ) -> Result<()> {
        if matches!(self.node(n).kind, NodeKind::Document) {
            return Err(Error::argument("a document node cannot be added as content"));
        }
        if self.ancestors(parent).any(|a| a == n) {
            return Err(Error::invalid_op(
                "cannot add a node as a descendant of itself",
            ));
        }
        match self.node(parent).kind {
            NodeKind::Document => self.verify_document_child(n, anchor),
            NodeKind::Element { .. } => match self.node(n).kind {
                NodeKind::DocumentType { .. } => Err(Error::argument(
                    "a document type declaration cannot be added to an element",
                )),
                _ => Ok(()),
            },
            _ => Err(Error::argument("target node cannot contain content")),
        }
    }

    fn verify_document_child(&self, n: NodeId, anchor: Option<NodeId>) -> Result<()> {
        match &self.node(n).kind {
            NodeKind::Element { .. } => {
                if self.root_element().is_some() {
                    return Err(Error::invalid_op("document already has a root element"));
                }
                // An element may not land before a pending doctype.
                let mut cur = anchor;
                while let Some(c) = cur {
                    if matches!(self.node(c).kind, NodeKind::DocumentType { .. }) {
                        return Err(Error::invalid_op(
                            "the root element cannot precede the document type declaration",
                        ));
                    }
                    cur = self.node(c).next_sibling;
                }
                Ok(())
            }
            NodeKind::DocumentType { .. } => {
                if self.document_type().is_some() {
                    return Err(Error::invalid_op(
                        "document already has a document type declaration",
                    ));
                }
                // The doctype must precede the root element; scan everything
                // before the insertion point.
                let mut cur = self.node(self.root).first_child;
                while let Some(c) = cur {
                    if cur == anchor {
                        break;
                    }
                    if matches!(self.node(c).kind, NodeKind::Element { .. }) {
                        return Err(Error::invalid_op(
                            "the document type declaration must precede the root element",
                        ));
                    }
                    cur = self.node(c).next_sibling;
                }
                Ok(())
            }
            NodeKind::Text { content } => {
                if content.chars().all(char::is_whitespace) {
                    Ok(())
                } else {
                    Err(Error::argument(
                        "non-whitespace text cannot be added at the document top level",
                    ))
                }
            }
            NodeKind::CData { .. } => Err(Error::argument(
                "a CDATA section cannot be added to a document",
            )),
            _ => Ok(()),
        }
    }

    /// Appends a child node to the end of a parent's child list.
    fn attach_tail(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.node(child).parent.is_none(),
            "child already has a parent; detach it first"
        );
        self.node_mut(child).parent = Some(parent);
        if let Some(last) = self.node(parent).last_child {
            self.node_mut(last).next_sibling = Some(child);
            self.node_mut(child).prev_sibling = Some(last);
            self.node_mut(parent).last_child = Some(child);
        } else {
            self.node_mut(parent).first_child = Some(child);
            self.node_mut(parent).last_child = Some(child);
        }
    }

    /// Inserts `new_child` before `reference` in the parent's child list.
    #[allow(clippy::expect_used)]
    fn attach_before(&mut self, reference: NodeId, new_child: NodeId) {
        debug_assert!(
            self.node(new_child).parent.is_none(),
            "new_child already has a parent; detach it first"
        );
        let parent = self
            .node(reference)
            .parent
            .expect("reference has no parent");
        self.node_mut(new_child).parent = Some(parent);
        if let Some(prev) = self.node(reference).prev_sibling {
            self.node_mut(prev).next_sibling = Some(new_child);
            self.node_mut(new_child).prev_sibling = Some(prev);
        } else {
            self.node_mut(parent).first_child = Some(new_child);
        }
        self.node_mut(new_child).next_sibling = Some(reference);
        self.node_mut(reference).prev_sibling = Some(new_child);
    }

    /// Detaches a node from its parent (but does not free it from the arena).
    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        let prev = self.node(id).prev_sibling;
        let next = self.node(id).next_sibling;
        match prev {
            Some(p) => self.node_mut(p).next_sibling = next,
            None => self.node_mut(parent).first_child = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev_sibling = prev,
            None => self.node_mut(parent).last_child = prev,
        }
        self.node_mut(id).parent = None;
        self.node_mut(id).prev_sibling = None;
        self.node_mut(id).next_sibling = None;
        // An element emptied of children serializes self-closing again.
        if self.node(parent).first_child.is_none() {
            self.set_element_empty(parent, true);
        }
    }

    // === Change notifications ===

    /// Registers a change observer on a node. The observer is invoked for
    /// mutations to the node itself and to anything beneath it, with
    /// [`ChangePhase::Changing`] before each mutation and
    /// [`ChangePhase::Changed`] after.
    pub fn watch(&mut self, node: NodeId, observer: impl FnMut(&ChangeEvent) + 'static) {
        self.observers.entry(node).or_default().push(Box::new(observer));
    }

    /// Removes all observers registered on a node.
    pub fn unwatch(&mut self, node: NodeId) {
        self.observers.remove(&node);
    }

    /// Walks from `origin` to the root, invoking observers on each node.
    fn raise(&mut self, origin: NodeId, target: ChangeTarget, kind: ChangeKind, phase: ChangePhase) {
        if self.observers.is_empty() {
            return;
        }
        let event = ChangeEvent { target, kind, phase };
        let mut cur = Some(origin);
        while let Some(id) = cur {
            cur = self.nodes[id.as_index()].parent;
            if let Some(mut list) = self.observers.remove(&id) {
                for observer in &mut list {
                    observer(&event);
                }
                self.observers.insert(id, list);
            }
        }
    }

    // === Annotations ===

    /// Attaches an arbitrary annotation value to a node. Multiple
    /// annotations, including several of the same type, can coexist.
    pub fn add_annotation<T: Any + Send + Sync>(&mut self, node: NodeId, value: T) {
        self.annotations.entry(node).or_default().push(Box::new(value));
    }

    /// Returns the first annotation of type `T` on a node.
    #[must_use]
    pub fn annotation<T: Any>(&self, node: NodeId) -> Option<&T> {
        self.annotations
            .get(&node)?
            .iter()
            .find_map(|boxed| (**boxed).downcast_ref::<T>())
    }

    /// Returns all annotations of type `T` on a node.
    pub fn annotations<T: Any>(&self, node: NodeId) -> impl Iterator<Item = &T> + '_ {
        self.annotations
            .get(&node)
            .into_iter()
            .flatten()
            .filter_map(|boxed| (**boxed).downcast_ref::<T>())
    }

    /// Removes all annotations of type `T` from a node.
    pub fn remove_annotations<T: Any>(&mut self, node: NodeId) {
        if let Some(list) = self.annotations.get_mut(&node) {
            list.retain(|boxed| !(**boxed).is::<T>());
            if list.is_empty() {
                self.annotations.remove(&node);
            }
        }
    }

    // === Provenance ===

    /// Returns the source location a node was parsed from, when the document
    /// was loaded with line info enabled.
    #[must_use]
    pub fn source_location(&self, node: NodeId) -> Option<SourceLocation> {
        self.locations.get(&node).copied()
    }

    pub(crate) fn set_source_location(&mut self, node: NodeId, location: SourceLocation) {
        self.locations.insert(node, location);
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &(self.nodes.len() - 1))
            .field("attrs", &(self.attrs.len() - 1))
            .field("declaration", &self.declaration)
            .field("base_uri", &self.base_uri)
            .finish_non_exhaustive()
    }
}

/// Returns the prefix a namespace-declaration attribute name declares:
/// `Some("")` for `xmlns`, `Some(prefix)` for `xmlns:prefix`, `None` for
/// ordinary attributes.
pub(crate) fn declared_prefix(name: XmlName) -> Option<&'static str> {
    if name.namespace() == Namespace::xmlns() {
        Some(name.local_name())
    } else if name.namespace().is_none() && name.local_name() == "xmlns" {
        Some("")
    } else {
        None
    }
}

// === Iterators ===

/// Iterator over the children of a node.
pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).next_sibling;
        Some(current)
    }
}

/// Iterator over a node and its ancestors.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).parent;
        Some(current)
    }
}

/// Iterator over the siblings following a node.
pub struct FollowingSiblings<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for FollowingSiblings<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).next_sibling;
        Some(current)
    }
}

/// Iterator over the siblings preceding a node, nearest first.
pub struct PrecedingSiblings<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for PrecedingSiblings<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).prev_sibling;
        Some(current)
    }
}

/// Iterator over an element's attribute chain.
pub struct Attributes<'a> {
    doc: &'a Document,
    next: Option<AttrId>,
}

impl Iterator for Attributes<'_> {
    type Item = AttrId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.attr(current).next;
        Some(current)
    }
}

/// Depth-first iterator over all descendants of a node.
pub struct Descendants<'a> {
    doc: &'a Document,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        // Try to go deeper first
        if let Some(child) = self.doc.first_child(current) {
            self.next = Some(child);
            return Some(current);
        }

        // Try next sibling
        if let Some(sibling) = self.doc.next_sibling(current) {
            self.next = Some(sibling);
            return Some(current);
        }

        // Walk up to find an ancestor with a next sibling
        let mut ancestor = self.doc.parent(current);
        while let Some(anc) = ancestor {
            if anc == self.root {
                self.next = None;
                return Some(current);
            }
            if let Some(sibling) = self.doc.next_sibling(anc) {
                self.next = Some(sibling);
                return Some(current);
            }
            ancestor = self.doc.parent(anc);
        }

        self.next = None;
        Some(current)
    }
}
