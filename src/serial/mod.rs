//! Serializing trees back to XML text.
//!
//! Every node type serializes by driving the [`XmlWrite`] primitives in a
//! fixed order — declaration and doctype payloads first, then per element
//! its attributes (namespace declarations in stored order among them)
//! followed by its children. [`write_node`] is that walk; it resolves
//! namespace prefixes from in-scope `xmlns` declarations, synthesizing a
//! declaration on the spot when a namespace has no binding.
//!
//! [`XmlTextWriter`] is the textual sink. Attribute values escape `<`, `>`,
//! `&`, `"` and CR/LF/TAB as `&lt;`, `&gt;`, `&amp;`, `&quot;`, `&#xD;`,
//! `&#xA;`, `&#x9;`; text content escapes `<`, `>`, `&` and CR; CDATA
//! content renders `]]>` as `]]&gt;`.

use crate::error::{Error, Result};
use crate::name::{XmlName, XML_URI};
use crate::tree::{declared_prefix, Document, NodeId, NodeKind};
use crate::writer::XmlWrite;
use std::fmt;

/// Options controlling XML serialization output.
///
/// # Examples
///
/// ```
/// use xylo::{Document, SerializeOptions};
///
/// let doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
/// let xml = doc.to_xml_with(&SerializeOptions::default().indent(true)).unwrap();
/// assert!(xml.contains("  <child>"));
/// ```
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Whether to produce indented (pretty-printed) output.
    /// Defaults to `false`.
    pub indent: bool,
    /// The indentation string used for each level when `indent` is `true`.
    /// Defaults to two spaces.
    pub indent_str: String,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            indent: false,
            indent_str: "  ".to_string(),
        }
    }
}

impl SerializeOptions {
    /// Enables or disables indented output. Elements with text content are
    /// never indented internally, so character data survives unchanged.
    #[must_use]
    pub fn indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the indentation string used for each nesting level.
    #[must_use]
    pub fn indent_str(mut self, s: &str) -> Self {
        self.indent_str = s.to_string();
        self
    }
}

/// Serializes a whole document to a string.
///
/// # Errors
///
/// Returns an error if a comment or PI holds unserializable content.
pub fn document_to_string(doc: &Document, options: &SerializeOptions) -> Result<String> {
    node_to_string(doc, doc.root(), options)
}

/// Serializes one node (and its subtree) to a string. Namespace prefixes
/// declared on ancestors remain in effect.
///
/// # Errors
///
/// Returns an error if a comment or PI holds unserializable content.
pub fn node_to_string(doc: &Document, node: NodeId, options: &SerializeOptions) -> Result<String> {
    let mut writer = XmlTextWriter::new(String::new(), options.clone());
    write_node(doc, node, &mut writer)?;
    Ok(writer.into_inner())
}

// === The WriteTo walk ===

/// In-scope prefix bindings during a serialization walk. Unlike the tree's
/// own ancestor scan, this also carries declarations synthesized on the fly
/// for unbound namespaces.
struct PrefixScope {
    bindings: Vec<(String, String)>,
    frames: Vec<usize>,
    generated: u32,
}

impl PrefixScope {
    fn new() -> Self {
        Self {
            bindings: Vec::new(),
            frames: Vec::new(),
            generated: 0,
        }
    }

    /// Seeds the scope with every declaration in force at `node`, outermost
    /// first, so subtree serialization sees inherited prefixes.
    fn seeded(doc: &Document, node: NodeId) -> Self {
        let mut scope = Self::new();
        let mut chain: Vec<NodeId> = doc.ancestors(node).skip(1).collect();
        chain.reverse();
        for ancestor in chain {
            for attr in doc.attributes(ancestor) {
                if let Some(prefix) = declared_prefix(doc.attr(attr).name) {
                    scope.declare(prefix, doc.attr(attr).value.as_str());
                }
            }
        }
        scope
    }

    fn push_frame(&mut self) {
        self.frames.push(self.bindings.len());
    }

    fn pop_frame(&mut self) {
        let mark = self.frames.pop().unwrap_or(0);
        self.bindings.truncate(mark);
    }

    fn declare(&mut self, prefix: &str, uri: &str) {
        self.bindings.push((prefix.to_string(), uri.to_string()));
    }

    /// The URI currently bound to a prefix, empty string when unbound.
    fn resolve(&self, prefix: &str) -> &str {
        for (p, uri) in self.bindings.iter().rev() {
            if p == prefix {
                return uri;
            }
        }
        if prefix == "xml" {
            XML_URI
        } else {
            ""
        }
    }

    /// A prefix whose current binding is `uri`. The default prefix is only
    /// usable for element names.
    fn prefix_for(&self, uri: &str, allow_default: bool) -> Option<&str> {
        let mut shadowed: Vec<&str> = Vec::new();
        for (p, bound) in self.bindings.iter().rev() {
            if shadowed.contains(&p.as_str()) {
                continue;
            }
            shadowed.push(p);
            if !allow_default && p.is_empty() {
                continue;
            }
            if bound == uri {
                return Some(p);
            }
        }
        (uri == XML_URI).then_some("xml")
    }

    fn generate_prefix(&mut self) -> String {
        loop {
            self.generated += 1;
            let candidate = format!("ns{}", self.generated);
            if self.resolve(&candidate).is_empty() {
                return candidate;
            }
        }
    }
}

/// Serializes `node` into any [`XmlWrite`] sink, in document order.
///
/// # Errors
///
/// Propagates sink errors; the textual sink rejects comments containing
/// `--` (or ending in `-`) and PI data containing `?>` here rather than at
/// construction time.
pub fn write_node<W: XmlWrite>(doc: &Document, node: NodeId, sink: &mut W) -> Result<()> {
    let mut scope = PrefixScope::seeded(doc, node);
    write_node_scoped(doc, node, sink, &mut scope)
}

fn write_node_scoped<W: XmlWrite>(
    doc: &Document,
    node: NodeId,
    sink: &mut W,
    scope: &mut PrefixScope,
) -> Result<()> {
    match &doc.node(node).kind {
        NodeKind::Document => {
            if let Some(decl) = &doc.declaration {
                sink.write_declaration(
                    &decl.version,
                    decl.encoding.as_deref(),
                    decl.standalone.as_deref(),
                )?;
            }
            for child in doc.children(node) {
                write_node_scoped(doc, child, sink, scope)?;
            }
            Ok(())
        }
        NodeKind::Element { name, .. } => write_element(doc, node, *name, sink, scope),
        NodeKind::Text { content } => sink.write_text(content),
        NodeKind::CData { content } => sink.write_cdata(content),
        NodeKind::Comment { content } => sink.write_comment(content),
        NodeKind::ProcessingInstruction { target, data } => {
            sink.write_processing_instruction(target, data)
        }
        NodeKind::DocumentType {
            name,
            public_id,
            system_id,
            internal_subset,
        } => sink.write_doctype(
            name,
            public_id.as_deref(),
            system_id.as_deref(),
            internal_subset.as_deref(),
        ),
    }
}

fn write_element<W: XmlWrite>(
    doc: &Document,
    element: NodeId,
    name: XmlName,
    sink: &mut W,
    scope: &mut PrefixScope,
) -> Result<()> {
    scope.push_frame();
    // This element's own declarations are in force for its own name.
    for attr in doc.attributes(element) {
        if let Some(prefix) = declared_prefix(doc.attr(attr).name) {
            scope.declare(prefix, doc.attr(attr).value.as_str());
        }
    }

    let uri = name.namespace().uri();
    // A default declaration synthesized for this element, written before
    // its stored attributes.
    let mut synthetic: Option<String> = None;
    let prefix = if uri.is_empty() {
        if !scope.resolve("").is_empty() {
            // A default namespace is in force but this element has none;
            // undeclare it here.
            scope.declare("", "");
            synthetic = Some(String::new());
        }
        String::new()
    } else {
        match scope.prefix_for(uri, true) {
            Some(p) => p.to_string(),
            None => {
                scope.declare("", uri);
                synthetic = Some(uri.to_string());
                String::new()
            }
        }
    };

    sink.write_start_element(&prefix, name.local_name(), uri)?;

    if let Some(decl_uri) = synthetic {
        write_default_declaration(sink, &decl_uri)?;
    }

    for attr in doc.attributes(element) {
        let data = doc.attr(attr);
        let attr_name = data.name;
        if let Some(decl) = declared_prefix(attr_name) {
            if decl.is_empty() {
                sink.write_start_attribute("", "xmlns", "")?;
            } else {
                sink.write_start_attribute("xmlns", decl, "")?;
            }
            sink.write_text(&data.value)?;
            sink.write_end_attribute()?;
            continue;
        }
        let attr_uri = attr_name.namespace().uri();
        let attr_prefix = if attr_uri.is_empty() {
            String::new()
        } else {
            match scope.prefix_for(attr_uri, false) {
                Some(p) => p.to_string(),
                None => {
                    let generated = scope.generate_prefix();
                    scope.declare(&generated, attr_uri);
                    write_prefixed_declaration(sink, &generated, attr_uri)?;
                    generated
                }
            }
        };
        sink.write_start_attribute(&attr_prefix, attr_name.local_name(), attr_uri)?;
        sink.write_text(&data.value)?;
        sink.write_end_attribute()?;
    }

    if doc.first_child(element).is_none() {
        if doc.element_is_empty(element) {
            sink.write_end_element()?;
        } else {
            sink.write_full_end_element()?;
        }
    } else {
        for child in doc.children(element) {
            write_node_scoped(doc, child, sink, scope)?;
        }
        sink.write_end_element()?;
    }
    scope.pop_frame();
    Ok(())
}

fn write_default_declaration<W: XmlWrite>(sink: &mut W, uri: &str) -> Result<()> {
    sink.write_start_attribute("", "xmlns", "")?;
    sink.write_text(uri)?;
    sink.write_end_attribute()
}

fn write_prefixed_declaration<W: XmlWrite>(sink: &mut W, prefix: &str, uri: &str) -> Result<()> {
    sink.write_start_attribute("xmlns", prefix, "")?;
    sink.write_text(uri)?;
    sink.write_end_attribute()
}

// === The textual sink ===

/// A frame for an open element in the textual writer.
struct TextFrame {
    qname: String,
    has_child_nodes: bool,
    has_text: bool,
}

/// An [`XmlWrite`] sink producing XML text into any [`fmt::Write`] target.
///
/// # Examples
///
/// ```
/// use xylo::{SerializeOptions, XmlTextWriter, XmlWrite};
///
/// let mut w = XmlTextWriter::new(String::new(), SerializeOptions::default());
/// w.write_start_element("", "greeting", "").unwrap();
/// w.write_text("hi & bye").unwrap();
/// w.write_end_element().unwrap();
/// assert_eq!(w.into_inner(), "<greeting>hi &amp; bye</greeting>");
/// ```
pub struct XmlTextWriter<W: fmt::Write> {
    out: W,
    options: SerializeOptions,
    frames: Vec<TextFrame>,
    /// A start tag is written but not yet closed with `>`.
    open_tag: bool,
    open_attr: bool,
    started: bool,
}

impl<W: fmt::Write> XmlTextWriter<W> {
    /// Creates a writer over any `fmt::Write` target.
    #[must_use]
    pub fn new(out: W, options: SerializeOptions) -> Self {
        Self {
            out,
            options,
            frames: Vec::new(),
            open_tag: false,
            open_attr: false,
            started: false,
        }
    }

    /// Consumes the writer and returns the output target.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn put(&mut self, s: &str) -> Result<()> {
        self.out
            .write_str(s)
            .map_err(|_| Error::invalid_op("the output sink failed"))
    }

    fn close_open_tag(&mut self) -> Result<()> {
        if self.open_tag {
            self.put(">")?;
            self.open_tag = false;
        }
        Ok(())
    }

    /// Newline and indentation before a structural node, unless the parent
    /// holds text (mixed content is never re-formatted).
    fn indent_before_node(&mut self) -> Result<()> {
        if !self.options.indent || !self.started {
            return Ok(());
        }
        if self.frames.last().is_some_and(|frame| frame.has_text) {
            return Ok(());
        }
        self.put("\n")?;
        let indent = self.options.indent_str.repeat(self.frames.len());
        self.put(&indent)
    }

    fn mark_child_node(&mut self) {
        self.started = true;
        if let Some(frame) = self.frames.last_mut() {
            frame.has_child_nodes = true;
        }
    }

    fn mark_text(&mut self) {
        self.started = true;
        if let Some(frame) = self.frames.last_mut() {
            frame.has_text = true;
        }
    }

    fn qualified(prefix: &str, local: &str) -> String {
        if prefix.is_empty() {
            local.to_string()
        } else {
            format!("{prefix}:{local}")
        }
    }
}

impl<W: fmt::Write> XmlWrite for XmlTextWriter<W> {
    fn write_declaration(
        &mut self,
        version: &str,
        encoding: Option<&str>,
        standalone: Option<&str>,
    ) -> Result<()> {
        if self.started {
            return Err(Error::invalid_op(
                "the XML declaration must be written before any other content",
            ));
        }
        self.started = true;
        self.put("<?xml version=\"")?;
        self.put(version)?;
        self.put("\"")?;
        if let Some(encoding) = encoding {
            self.put(" encoding=\"")?;
            self.put(encoding)?;
            self.put("\"")?;
        }
        if let Some(standalone) = standalone {
            self.put(" standalone=\"")?;
            self.put(standalone)?;
            self.put("\"")?;
        }
        self.put("?>")?;
        // In indent mode the node separator supplies the line break.
        if self.options.indent {
            Ok(())
        } else {
            self.put("\n")
        }
    }

    fn write_doctype(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        internal_subset: Option<&str>,
    ) -> Result<()> {
        self.close_open_tag()?;
        self.indent_before_node()?;
        self.mark_child_node();
        self.put("<!DOCTYPE ")?;
        self.put(name)?;
        match (public_id, system_id) {
            (Some(public), Some(system)) => {
                self.put(" PUBLIC \"")?;
                self.put(public)?;
                self.put("\" \"")?;
                self.put(system)?;
                self.put("\"")?;
            }
            (None, Some(system)) => {
                self.put(" SYSTEM \"")?;
                self.put(system)?;
                self.put("\"")?;
            }
            _ => {}
        }
        if let Some(subset) = internal_subset {
            self.put(" [")?;
            self.put(subset)?;
            self.put("]")?;
        }
        self.put(">")
    }

    fn write_start_element(&mut self, prefix: &str, local: &str, _uri: &str) -> Result<()> {
        if self.open_attr {
            return Err(Error::invalid_op(
                "cannot write an element inside an attribute value",
            ));
        }
        self.close_open_tag()?;
        self.indent_before_node()?;
        self.mark_child_node();
        let qname = Self::qualified(prefix, local);
        self.put("<")?;
        self.put(&qname)?;
        self.frames.push(TextFrame {
            qname,
            has_child_nodes: false,
            has_text: false,
        });
        self.open_tag = true;
        Ok(())
    }

    fn write_end_element(&mut self) -> Result<()> {
        if self.open_tag {
            if self.frames.pop().is_none() {
                return Err(Error::invalid_op("no element is open"));
            }
            self.open_tag = false;
            return self.put("/>");
        }
        self.write_end_element_common()
    }

    fn write_full_end_element(&mut self) -> Result<()> {
        if self.open_tag {
            self.put(">")?;
            self.open_tag = false;
        }
        self.write_end_element_common()
    }

    fn write_start_attribute(&mut self, prefix: &str, local: &str, _uri: &str) -> Result<()> {
        if !self.open_tag {
            return Err(Error::invalid_op(
                "attributes must be written inside a start tag",
            ));
        }
        if self.open_attr {
            return Err(Error::invalid_op("an attribute is already open"));
        }
        self.open_attr = true;
        self.put(" ")?;
        let qname = Self::qualified(prefix, local);
        self.put(&qname)?;
        self.put("=\"")
    }

    fn write_end_attribute(&mut self) -> Result<()> {
        if !self.open_attr {
            return Err(Error::invalid_op("no attribute is open"));
        }
        self.open_attr = false;
        self.put("\"")
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        if self.open_attr {
            let escaped = escape_attribute(text);
            return self.put(&escaped);
        }
        self.close_open_tag()?;
        self.mark_text();
        let escaped = escape_text(text);
        self.put(&escaped)
    }

    fn write_cdata(&mut self, text: &str) -> Result<()> {
        if self.open_attr {
            return Err(Error::invalid_op(
                "a CDATA section cannot appear inside an attribute value",
            ));
        }
        self.close_open_tag()?;
        self.mark_text();
        self.put("<![CDATA[")?;
        // The reserved terminator is rendered as `]]&gt;`, scanning left to
        // right so overlapping occurrences are handled once per position.
        let escaped = text.replace("]]>", "]]&gt;");
        self.put(&escaped)?;
        self.put("]]>")
    }

    fn write_comment(&mut self, text: &str) -> Result<()> {
        if self.open_attr {
            return Err(Error::invalid_op(
                "a comment cannot appear inside an attribute value",
            ));
        }
        if text.contains("--") || text.ends_with('-') {
            return Err(Error::argument(
                "a comment cannot contain '--' or end with '-'",
            ));
        }
        self.close_open_tag()?;
        self.indent_before_node()?;
        self.mark_child_node();
        self.put("<!--")?;
        self.put(text)?;
        self.put("-->")
    }

    fn write_processing_instruction(&mut self, target: &str, data: &str) -> Result<()> {
        if self.open_attr {
            return Err(Error::invalid_op(
                "a processing instruction cannot appear inside an attribute value",
            ));
        }
        if data.contains("?>") {
            return Err(Error::argument(
                "processing instruction data cannot contain '?>'",
            ));
        }
        self.close_open_tag()?;
        self.indent_before_node()?;
        self.mark_child_node();
        self.put("<?")?;
        self.put(target)?;
        if !data.is_empty() {
            self.put(" ")?;
            self.put(data)?;
        }
        self.put("?>")
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

impl<W: fmt::Write> XmlTextWriter<W> {
    /// Shared tail of the two end-element forms once the start tag is
    /// closed.
    fn write_end_element_common(&mut self) -> Result<()> {
        let Some(frame) = self.frames.pop() else {
            return Err(Error::invalid_op("no element is open"));
        };
        if self.options.indent && frame.has_child_nodes && !frame.has_text {
            self.put("\n")?;
            let indent = self.options.indent_str.repeat(self.frames.len());
            self.put(&indent)?;
        }
        self.put("</")?;
        self.put(&frame.qname)?;
        self.put(">")
    }
}

/// Escapes element text content: `&`, `<`, `>` and CR.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escapes attribute values: `&`, `<`, `>`, `"` and CR/LF/TAB, the latter
/// as hexadecimal character references so they survive attribute-value
/// normalization on reparse.
fn escape_attribute(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\r' => out.push_str("&#xD;"),
            '\n' => out.push_str("&#xA;"),
            '\t' => out.push_str("&#x9;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content;
    use crate::name::Namespace;
    use pretty_assertions::assert_eq;

    fn name(s: &str) -> XmlName {
        XmlName::get(s).unwrap()
    }

    fn to_xml(doc: &Document) -> String {
        doc.to_xml().unwrap()
    }

    #[test]
    fn test_simple_document() {
        let doc = Document::parse_str("<root><child>hi</child><empty/></root>").unwrap();
        assert_eq!(to_xml(&doc), "<root><child>hi</child><empty/></root>");
    }

    #[test]
    fn test_declaration_with_standalone() {
        let mut doc = Document::new();
        doc.declaration = Some(crate::tree::Declaration::new(Some("1.0"), None, Some("yes")));
        let root = doc.new_element(name("root"));
        doc.add(doc.root(), root).unwrap();
        assert_eq!(
            to_xml(&doc),
            "<?xml version=\"1.0\" standalone=\"yes\"?>\n<root/>"
        );
    }

    #[test]
    fn test_attribute_escaping() {
        let mut doc = Document::new();
        let e = doc.new_element(name("e"));
        doc.set_attribute_value(e, name("a"), Some("<>&\"\r\n\t")).unwrap();
        doc.add(doc.root(), e).unwrap();
        assert_eq!(
            to_xml(&doc),
            "<e a=\"&lt;&gt;&amp;&quot;&#xD;&#xA;&#x9;\"/>"
        );
    }

    #[test]
    fn test_text_escaping() {
        let mut doc = Document::new();
        let e = doc.new_element(name("e"));
        doc.add(e, "a < b & c > d\r").unwrap();
        doc.add(doc.root(), e).unwrap();
        assert_eq!(to_xml(&doc), "<e>a &lt; b &amp; c &gt; d&#xD;</e>");
    }

    #[test]
    fn test_cdata_terminator_split() {
        let mut doc = Document::new();
        let e = doc.new_element(name("e"));
        let cdata = doc.new_cdata("a]]>b");
        doc.add(e, cdata).unwrap();
        doc.add(doc.root(), e).unwrap();
        assert_eq!(to_xml(&doc), "<e><![CDATA[a]]&gt;b]]></e>");
    }

    #[test]
    fn test_cdata_overlapping_terminators() {
        let mut doc = Document::new();
        let e = doc.new_element(name("e"));
        let cdata = doc.new_cdata("]]]>");
        doc.add(e, cdata).unwrap();
        doc.add(doc.root(), e).unwrap();
        assert_eq!(to_xml(&doc), "<e><![CDATA[]]]&gt;]]></e>");
    }

    #[test]
    fn test_comment_content_rejected_at_write() {
        let mut doc = Document::new();
        let e = doc.new_element(name("e"));
        let comment = doc.new_comment("a--b");
        doc.add(e, comment).unwrap();
        doc.add(doc.root(), e).unwrap();
        assert!(matches!(doc.to_xml(), Err(Error::Argument(_))));
    }

    #[test]
    fn test_pi_data_rejected_at_write() {
        let mut doc = Document::new();
        let e = doc.new_element(name("e"));
        let pi = doc.new_processing_instruction("t", "bad ?> data").unwrap();
        doc.add(e, pi).unwrap();
        doc.add(doc.root(), e).unwrap();
        assert!(matches!(doc.to_xml(), Err(Error::Argument(_))));
    }

    #[test]
    fn test_empty_versus_expanded_forms() {
        let doc = Document::parse_str("<r><a/><b></b></r>").unwrap();
        assert_eq!(to_xml(&doc), "<r><a/><b></b></r>");
    }

    #[test]
    fn test_declared_prefixes_used() {
        let source = "<p:root xmlns:p=\"urn:p\"><p:child p:a=\"1\"/></p:root>";
        let doc = Document::parse_str(source).unwrap();
        assert_eq!(to_xml(&doc), source);
    }

    #[test]
    fn test_default_namespace_round_trips() {
        let source = "<root xmlns=\"urn:d\"><child/></root>";
        let doc = Document::parse_str(source).unwrap();
        assert_eq!(to_xml(&doc), source);
    }

    #[test]
    fn test_unbound_element_namespace_gets_default_declaration() {
        let mut doc = Document::new();
        let ns = Namespace::get("urn:auto");
        let root = doc.new_element(ns.get_name("root").unwrap());
        doc.add(doc.root(), root).unwrap();
        assert_eq!(to_xml(&doc), "<root xmlns=\"urn:auto\"/>");
    }

    #[test]
    fn test_unbound_attribute_namespace_gets_generated_prefix() {
        let mut doc = Document::new();
        let root = doc.new_element(name("root"));
        let attr_name = Namespace::get("urn:a").get_name("x").unwrap();
        doc.set_attribute_value(root, attr_name, Some("1")).unwrap();
        doc.add(doc.root(), root).unwrap();
        assert_eq!(to_xml(&doc), "<root xmlns:ns1=\"urn:a\" ns1:x=\"1\"/>");
    }

    #[test]
    fn test_default_namespace_undeclared_for_plain_child() {
        let mut doc = Document::new();
        let ns = Namespace::get("urn:d");
        let root = doc.new_element(ns.get_name("root").unwrap());
        doc.set_attribute_value(root, name("xmlns"), Some("urn:d")).unwrap();
        let child = doc.new_element(name("child"));
        doc.add(root, child).unwrap();
        doc.add(doc.root(), root).unwrap();
        assert_eq!(
            to_xml(&doc),
            "<root xmlns=\"urn:d\"><child xmlns=\"\"/></root>"
        );
    }

    #[test]
    fn test_doctype_forms() {
        let source = "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"svg11.dtd\"><svg/>";
        let doc = Document::parse_str(source).unwrap();
        assert_eq!(to_xml(&doc), source);

        let source = "<!DOCTYPE r [<!ENTITY a \"b\">]><r/>";
        let doc = Document::parse_str(source).unwrap();
        assert_eq!(to_xml(&doc), source);
    }

    #[test]
    fn test_pi_and_comment_rendering() {
        let source = "<!--note--><?style href=\"x\"?><r/>";
        let doc = Document::parse_str(source).unwrap();
        assert_eq!(to_xml(&doc), source);
    }

    #[test]
    fn test_indented_output() {
        let doc = Document::parse_str("<root><a><b/></a><c>text</c></root>").unwrap();
        let xml = doc
            .to_xml_with(&SerializeOptions::default().indent(true))
            .unwrap();
        assert_eq!(
            xml,
            "<root>\n  <a>\n    <b/>\n  </a>\n  <c>text</c>\n</root>"
        );
    }

    #[test]
    fn test_node_to_string_inherits_prefixes() {
        let doc =
            Document::parse_str("<p:root xmlns:p=\"urn:p\"><p:child>x</p:child></p:root>").unwrap();
        let root = doc.root_element().unwrap();
        let child = doc.first_child(root).unwrap();
        let xml = node_to_string(&doc, child, &SerializeOptions::default()).unwrap();
        assert_eq!(xml, "<p:child>x</p:child>");
    }

    #[test]
    fn test_mixed_content_not_reformatted() {
        let doc = Document::parse_str("<p>one <b>two</b> three</p>").unwrap();
        let xml = doc
            .to_xml_with(&SerializeOptions::default().indent(true))
            .unwrap();
        assert_eq!(xml, "<p>one <b>two</b> three</p>");
    }

    #[test]
    fn test_content_built_tree_serializes() {
        let mut doc = Document::new();
        let root = doc.new_element(name("root"));
        let child1 = doc.new_element(name("child1"));
        let child2 = doc.new_element(name("child2"));
        doc.add(root, content![child1, "text", child2]).unwrap();
        doc.add(doc.root(), root).unwrap();
        assert_eq!(to_xml(&doc), "<root><child1/>text<child2/></root>");
    }
}
