//! Building trees from serialized XML.
//!
//! The pull tokenizer itself is the external `xmlparser` crate; this module
//! is the adapter that consumes its tokens and drives a [`NodeWriter`] —
//! exactly one tree node per non-attribute token, one attribute per
//! attribute token. Namespace prefixes are resolved against a scope stack
//! fed by `xmlns` attributes, which also land in the tree as ordinary
//! namespace-declaration attributes.
//!
//! Only the five predefined entities and character references are expanded;
//! DTD-defined entities are not resolved. If the tokenizer reports malformed
//! input, the partially built tree is discarded with the error — there is no
//! recovery mode.

use crate::error::{Error, ParseError, Result, SourceLocation};
use crate::tree::Document;
use crate::writer::{NodeWriter, XmlWrite};
use std::borrow::Cow;
use xmlparser::{ElementEnd, ExternalId, StrSpan, Token, Tokenizer};

/// Options controlling how serialized XML is loaded.
///
/// # Examples
///
/// ```
/// use xylo::{Document, ParseOptions};
///
/// let opts = ParseOptions::default().preserve_whitespace(true).line_info(true);
/// let doc = Document::parse_str_with("<root> </root>", &opts).unwrap();
/// let root = doc.root_element().unwrap();
/// assert_eq!(doc.children(root).count(), 1);
/// assert!(doc.source_location(root).is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Keep whitespace-only text nodes instead of dropping them.
    /// Defaults to `false`.
    pub preserve_whitespace: bool,
    /// Record per-node line/column provenance, retrievable via
    /// [`Document::source_location`]. Defaults to `false`.
    pub line_info: bool,
    /// Base URI to record on the loaded document.
    pub base_uri: Option<String>,
}

impl ParseOptions {
    /// Keeps whitespace-only text nodes.
    #[must_use]
    pub fn preserve_whitespace(mut self, preserve: bool) -> Self {
        self.preserve_whitespace = preserve;
        self
    }

    /// Records per-node source locations.
    #[must_use]
    pub fn line_info(mut self, record: bool) -> Self {
        self.line_info = record;
        self
    }

    /// Sets the base URI recorded on the loaded document.
    #[must_use]
    pub fn base_uri(mut self, uri: &str) -> Self {
        self.base_uri = Some(uri.to_string());
        self
    }
}

/// Prefix-to-URI bindings, one frame per open element.
struct NamespaceScopes {
    bindings: Vec<(String, String)>,
    frames: Vec<usize>,
}

impl NamespaceScopes {
    fn new() -> Self {
        Self {
            bindings: Vec::new(),
            frames: Vec::new(),
        }
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

    /// Resolves a prefix to a URI; the most recent declaration wins. An
    /// undeclared default prefix resolves to no namespace, an undeclared
    /// named prefix to `None`.
    fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(crate::name::XML_URI);
        }
        for (p, uri) in self.bindings.iter().rev() {
            if p == prefix {
                return Some(uri);
            }
        }
        if prefix.is_empty() {
            Some("")
        } else {
            None
        }
    }
}

/// Byte-offset to line/column mapping, built once per parse.
struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    fn new(input: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in input.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self { line_starts }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn location(&self, input: &str, byte_offset: usize) -> SourceLocation {
        // The last line start at or before the offset. `Err(0)` cannot occur
        // because line_starts[0] is 0.
        let line = match self.line_starts.binary_search(&byte_offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        let line_start = self.line_starts[line];
        let column = input[line_start..byte_offset].chars().count() + 1;
        SourceLocation {
            line: (line + 1) as u32,
            column: column as u32,
            byte_offset,
        }
    }
}

/// A buffered start tag: attributes arrive between `ElementStart` and
/// `ElementEnd`, and prefixes can only be resolved once every `xmlns`
/// declaration on the tag has been seen.
struct PendingElement<'input> {
    prefix: StrSpan<'input>,
    local: StrSpan<'input>,
    offset: usize,
}

struct PendingAttr<'input> {
    prefix: StrSpan<'input>,
    local: StrSpan<'input>,
    value: StrSpan<'input>,
}

/// A `<!DOCTYPE ... [` header awaiting its closing `]>` so the internal
/// subset can be captured verbatim.
struct PendingDoctype {
    name: String,
    public_id: Option<String>,
    system_id: Option<String>,
    subset_start: usize,
    offset: usize,
}

fn split_external_id(id: Option<ExternalId<'_>>) -> (Option<String>, Option<String>) {
    match id {
        Some(ExternalId::Public(public, system)) => {
            (Some(public.as_str().to_string()), Some(system.as_str().to_string()))
        }
        Some(ExternalId::System(system)) => (None, Some(system.as_str().to_string())),
        None => (None, None),
    }
}

fn tokenizer_error(err: &xmlparser::Error) -> Error {
    let pos = err.pos();
    Error::Parse(ParseError {
        message: err.to_string(),
        location: SourceLocation {
            line: pos.row,
            column: pos.col,
            byte_offset: 0,
        },
    })
}

fn parse_error(message: impl Into<String>, location: SourceLocation) -> Error {
    Error::Parse(ParseError {
        message: message.into(),
        location,
    })
}

/// Expands character references and the five predefined entities.
fn expand_references<'a>(raw: &'a str, location: SourceLocation) -> Result<Cow<'a, str>> {
    if !raw.contains('&') {
        return Ok(Cow::Borrowed(raw));
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let Some(semi) = rest.find(';') else {
            return Err(parse_error("unterminated entity reference", location));
        };
        let entity = &rest[1..semi];
        match entity {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "apos" => out.push('\''),
            "quot" => out.push('"'),
            _ => {
                let Some(digits) = entity.strip_prefix('#') else {
                    return Err(parse_error(
                        format!("unknown entity reference '&{entity};'"),
                        location,
                    ));
                };
                let code_point = match digits.strip_prefix('x') {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => digits.parse::<u32>().ok(),
                };
                match code_point.and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => {
                        return Err(parse_error(
                            format!("invalid character reference '&{entity};'"),
                            location,
                        ))
                    }
                }
            }
        }
        rest = &rest[semi + 1..];
    }
    out.push_str(rest);
    Ok(Cow::Owned(out))
}

/// Parses serialized XML into a [`Document`] by driving a [`NodeWriter`]
/// from `xmlparser` tokens.
///
/// # Errors
///
/// Returns [`Error::Parse`] for malformed input (tokenizer errors,
/// mismatched tags, unbound prefixes, unknown entities) and the structural
/// errors of the write path for input the tree rejects.
pub fn parse_str(input: &str, options: &ParseOptions) -> Result<Document> {
    let mut writer = NodeWriter::new();
    let mut scopes = NamespaceScopes::new();
    let mut pending: Option<PendingElement<'_>> = None;
    let mut pending_attrs: Vec<PendingAttr<'_>> = Vec::new();
    let mut open_tags: Vec<(String, String)> = Vec::new();
    let mut doctype: Option<PendingDoctype> = None;
    let line_index = options.line_info.then(|| LineIndex::new(input));

    let locate = |line_index: &Option<LineIndex>, offset: usize| -> SourceLocation {
        line_index
            .as_ref()
            .map_or_else(SourceLocation::default, |index| index.location(input, offset))
    };

    for token in Tokenizer::from(input) {
        let token = token.map_err(|e| tokenizer_error(&e))?;
        match token {
            Token::Declaration {
                version,
                encoding,
                standalone,
                ..
            } => {
                writer.write_declaration(
                    version.as_str(),
                    encoding.as_ref().map(StrSpan::as_str),
                    standalone.map(|yes| if yes { "yes" } else { "no" }),
                )?;
            }
            Token::DtdStart {
                name, external_id, span,
            } => {
                let (public_id, system_id) = split_external_id(external_id);
                doctype = Some(PendingDoctype {
                    name: name.as_str().to_string(),
                    public_id,
                    system_id,
                    subset_start: span.end(),
                    offset: span.start(),
                });
            }
            Token::EntityDeclaration { .. } => {
                // Covered by the verbatim subset capture between the DTD
                // start and end spans.
            }
            Token::DtdEnd { span } => {
                if let Some(dt) = doctype.take() {
                    let subset = input[dt.subset_start..span.start()].trim();
                    writer.write_doctype(
                        &dt.name,
                        dt.public_id.as_deref(),
                        dt.system_id.as_deref(),
                        Some(subset),
                    )?;
                    if line_index.is_some() {
                        writer.set_last_location(locate(&line_index, dt.offset));
                    }
                }
            }
            Token::EmptyDtd {
                name, external_id, span,
            } => {
                let (public_id, system_id) = split_external_id(external_id);
                writer.write_doctype(
                    name.as_str(),
                    public_id.as_deref(),
                    system_id.as_deref(),
                    None,
                )?;
                if line_index.is_some() {
                    writer.set_last_location(locate(&line_index, span.start()));
                }
            }
            Token::ElementStart { prefix, local, span } => {
                pending = Some(PendingElement {
                    prefix,
                    local,
                    offset: span.start(),
                });
                pending_attrs.clear();
            }
            Token::Attribute {
                prefix,
                local,
                value,
                ..
            } => {
                pending_attrs.push(PendingAttr {
                    prefix,
                    local,
                    value,
                });
            }
            Token::ElementEnd { end, span } => match end {
                ElementEnd::Open | ElementEnd::Empty => {
                    let Some(element) = pending.take() else {
                        return Err(parse_error(
                            "element end without a start tag",
                            locate(&line_index, span.start()),
                        ));
                    };
                    let self_closing = matches!(end, ElementEnd::Empty);
                    open_element(
                        input,
                        &mut writer,
                        &mut scopes,
                        &element,
                        &pending_attrs,
                        self_closing,
                        &mut open_tags,
                        &line_index,
                    )?;
                    pending_attrs.clear();
                }
                ElementEnd::Close(prefix, local) => {
                    let matches_open = open_tags
                        .last()
                        .is_some_and(|(p, l)| p == prefix.as_str() && l == local.as_str());
                    if !matches_open {
                        return Err(parse_error(
                            format!("mismatched closing tag '{}'", local.as_str()),
                            locate(&line_index, span.start()),
                        ));
                    }
                    open_tags.pop();
                    // A matched close tag means the expanded form was used.
                    writer.write_full_end_element()?;
                    scopes.pop_frame();
                }
            },
            Token::Text { text } => {
                if doctype.is_some() {
                    // Inside the internal subset; captured verbatim at DtdEnd.
                    continue;
                }
                if !options.preserve_whitespace
                    && text.as_str().chars().all(char::is_whitespace)
                {
                    continue;
                }
                let location = locate(&line_index, text.start());
                let expanded = expand_references(text.as_str(), location)?;
                writer.write_text(&expanded)?;
                if line_index.is_some() {
                    writer.set_last_location(location);
                }
            }
            Token::Cdata { text, span } => {
                writer.write_cdata(text.as_str())?;
                if line_index.is_some() {
                    writer.set_last_location(locate(&line_index, span.start()));
                }
            }
            Token::Comment { text, span } => {
                if doctype.is_some() {
                    continue;
                }
                writer.write_comment(text.as_str())?;
                if line_index.is_some() {
                    writer.set_last_location(locate(&line_index, span.start()));
                }
            }
            Token::ProcessingInstruction {
                target,
                content,
                span,
            } => {
                if doctype.is_some() {
                    continue;
                }
                writer.write_processing_instruction(
                    target.as_str(),
                    content.as_ref().map_or("", StrSpan::as_str),
                )?;
                if line_index.is_some() {
                    writer.set_last_location(locate(&line_index, span.start()));
                }
            }
        }
    }

    if let Some((_, local)) = open_tags.last() {
        return Err(parse_error(
            format!("unclosed element '{local}'"),
            SourceLocation::default(),
        ));
    }
    let mut doc = writer.finish()?;
    doc.base_uri = options.base_uri.clone();
    Ok(doc)
}

#[allow(clippy::too_many_arguments)]
fn open_element(
    input: &str,
    writer: &mut NodeWriter,
    scopes: &mut NamespaceScopes,
    element: &PendingElement<'_>,
    attrs: &[PendingAttr<'_>],
    self_closing: bool,
    open_tags: &mut Vec<(String, String)>,
    line_index: &Option<LineIndex>,
) -> Result<()> {
    let locate = |offset: usize| -> SourceLocation {
        line_index
            .as_ref()
            .map_or_else(SourceLocation::default, |index| index.location(input, offset))
    };
    scopes.push_frame();
    // Declarations on this very tag are in scope for its own name, wherever
    // they appear among its attributes.
    for attr in attrs {
        let location = locate(attr.value.start());
        if attr.prefix.as_str() == "xmlns" {
            let uri = expand_references(attr.value.as_str(), location)?;
            scopes.declare(attr.local.as_str(), &uri);
        } else if attr.prefix.as_str().is_empty() && attr.local.as_str() == "xmlns" {
            let uri = expand_references(attr.value.as_str(), location)?;
            scopes.declare("", &uri);
        }
    }

    let location = locate(element.offset);
    let Some(uri) = scopes.resolve(element.prefix.as_str()) else {
        return Err(parse_error(
            format!("unbound namespace prefix '{}'", element.prefix.as_str()),
            location,
        ));
    };
    let uri = uri.to_string();
    writer.write_start_element(element.prefix.as_str(), element.local.as_str(), &uri)?;
    if line_index.is_some() {
        writer.set_last_location(location);
    }

    for attr in attrs {
        let location = locate(attr.value.start());
        let value = expand_references(attr.value.as_str(), location)?;
        let (prefix, local) = (attr.prefix.as_str(), attr.local.as_str());
        let uri = if prefix.is_empty() || prefix == "xmlns" {
            // Unprefixed attributes are in no namespace; xmlns attributes
            // resolve through their reserved name inside the writer.
            String::new()
        } else {
            match scopes.resolve(prefix) {
                Some(uri) => uri.to_string(),
                None => {
                    return Err(parse_error(
                        format!("unbound namespace prefix '{prefix}'"),
                        location,
                    ))
                }
            }
        };
        writer.write_start_attribute(prefix, local, &uri)?;
        writer.write_text(&value)?;
        writer.write_end_attribute()?;
    }

    if self_closing {
        writer.write_end_element()?;
        scopes.pop_frame();
    } else {
        open_tags.push((
            element.prefix.as_str().to_string(),
            element.local.as_str().to_string(),
        ));
    }
    Ok(())
}
