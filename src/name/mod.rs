//! Interned XML namespaces and qualified names.
//!
//! Element and attribute names are referenced by handle rather than by value.
//! A [`Namespace`] identifies a namespace URI and an [`XmlName`] a (local
//! name, namespace) pair; both are `Copy` handles into a process-wide intern
//! table, so comparing names is a single integer compare. Two handles are
//! equal if and only if their URIs / expanded names are equal — every
//! constructor goes through the intern table, so handle equality and value
//! equality always coincide.
//!
//! The table is guarded by a mutex around lookup-or-insert and its entries
//! live for the process; interned strings are therefore handed out as
//! `&'static str`.
//!
//! # Examples
//!
//! ```
//! use xylo::{Namespace, XmlName};
//!
//! let ns = Namespace::get("http://example.com/ns");
//! let name = ns.get_name("item").unwrap();
//! assert_eq!(name.local_name(), "item");
//! assert_eq!(name.to_string(), "{http://example.com/ns}item");
//!
//! // Clark notation round-trips through the same entry point.
//! assert_eq!(XmlName::get("{http://example.com/ns}item").unwrap(), name);
//! ```

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::{Mutex, OnceLock};

/// The namespace URI bound to the reserved `xml` prefix.
pub const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// The namespace URI of namespace-declaration attributes (`xmlns`, `xmlns:*`).
pub const XMLNS_URI: &str = "http://www.w3.org/2000/xmlns/";

/// An interned XML namespace, identified solely by its URI.
///
/// `Namespace::get(uri)` always returns the same handle for the same URI, so
/// equality is an O(1) integer compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Namespace(NonZeroU32);

/// An interned qualified name: a (local name, namespace) pair.
///
/// Obtained from [`Namespace::get_name`] or from [`XmlName::get`] with an
/// expanded name in Clark notation (`{uri}local`) or a bare local name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct XmlName(NonZeroU32);

/// The process-wide intern table behind [`Namespace`] and [`XmlName`].
struct NameTable {
    /// URI -> namespace id.
    ns_ids: HashMap<&'static str, u32>,
    /// Namespace id - 1 -> URI.
    ns_uris: Vec<&'static str>,
    /// Per-namespace name cache: namespace id -> (local name -> name id).
    name_ids: HashMap<u32, HashMap<&'static str, u32>>,
    /// Name id - 1 -> (namespace id, local name).
    name_entries: Vec<(u32, &'static str)>,
}

impl NameTable {
    fn new() -> Self {
        let mut table = NameTable {
            ns_ids: HashMap::new(),
            ns_uris: Vec::new(),
            name_ids: HashMap::new(),
            name_entries: Vec::new(),
        };
        // Pre-intern the empty namespace and the two reserved ones so their
        // handles are stable from the first use.
        table.intern_ns("");
        table.intern_ns(XML_URI);
        table.intern_ns(XMLNS_URI);
        table
    }

    fn intern_ns(&mut self, uri: &str) -> u32 {
        if let Some(&id) = self.ns_ids.get(uri) {
            return id;
        }
        let leaked: &'static str = Box::leak(uri.to_owned().into_boxed_str());
        let id = (self.ns_uris.len() + 1) as u32;
        self.ns_uris.push(leaked);
        self.ns_ids.insert(leaked, id);
        id
    }

    fn intern_name(&mut self, ns_id: u32, local: &str) -> u32 {
        if let Some(&id) = self.name_ids.get(&ns_id).and_then(|names| names.get(local)) {
            return id;
        }
        let leaked: &'static str = Box::leak(local.to_owned().into_boxed_str());
        let id = (self.name_entries.len() + 1) as u32;
        self.name_entries.push((ns_id, leaked));
        self.name_ids.entry(ns_id).or_default().insert(leaked, id);
        id
    }
}

fn table() -> &'static Mutex<NameTable> {
    static TABLE: OnceLock<Mutex<NameTable>> = OnceLock::new();
    TABLE.get_or_init(|| Mutex::new(NameTable::new()))
}

fn lock() -> std::sync::MutexGuard<'static, NameTable> {
    // Interning never panics while holding the lock, so poisoning cannot
    // occur in practice; recover rather than propagate if it somehow does.
    match table().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Namespace {
    /// Returns the canonical namespace handle for `uri`, interning it on
    /// first use.
    ///
    /// # Examples
    ///
    /// ```
    /// use xylo::Namespace;
    ///
    /// let a = Namespace::get("http://example.com");
    /// let b = Namespace::get("http://example.com");
    /// assert_eq!(a, b);
    /// ```
    #[must_use]
    pub fn get(uri: &str) -> Self {
        let id = lock().intern_ns(uri);
        Self(NonZeroU32::new(id).expect("namespace ids start at 1"))
    }

    /// The empty namespace (no namespace at all).
    #[must_use]
    pub fn none() -> Self {
        Self::get("")
    }

    /// The reserved namespace bound to the `xml` prefix.
    #[must_use]
    pub fn xml() -> Self {
        Self::get(XML_URI)
    }

    /// The namespace of namespace-declaration attributes.
    #[must_use]
    pub fn xmlns() -> Self {
        Self::get(XMLNS_URI)
    }

    /// Returns the namespace URI.
    #[must_use]
    pub fn uri(self) -> &'static str {
        lock().ns_uris[(self.0.get() - 1) as usize]
    }

    /// Returns `true` if this is the empty namespace.
    #[must_use]
    pub fn is_none(self) -> bool {
        self == Self::none()
    }

    /// Returns the canonical qualified name for `local` in this namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] if `local` is not a legal XML name token.
    pub fn get_name(self, local: &str) -> Result<XmlName> {
        validate_name(local)?;
        let id = lock().intern_name(self.0.get(), local);
        Ok(XmlName(NonZeroU32::new(id).expect("name ids start at 1")))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

impl XmlName {
    /// Resolves an expanded name: Clark notation `{uri}local` when the
    /// namespace is non-empty, or a bare `local` name otherwise. The output
    /// of [`XmlName::to_string`] parses back through this entry point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] if the expanded form is malformed or the
    /// local part is not a legal XML name token.
    ///
    /// # Examples
    ///
    /// ```
    /// use xylo::XmlName;
    ///
    /// let plain = XmlName::get("root").unwrap();
    /// assert!(plain.namespace().is_none());
    ///
    /// let qualified = XmlName::get("{urn:x}root").unwrap();
    /// assert_eq!(qualified.namespace().uri(), "urn:x");
    /// assert_eq!(qualified.local_name(), "root");
    /// ```
    pub fn get(expanded: &str) -> Result<Self> {
        if let Some(rest) = expanded.strip_prefix('{') {
            let Some(close) = rest.find('}') else {
                return Err(Error::argument(format!(
                    "malformed expanded name '{expanded}': missing '}}'"
                )));
            };
            let (uri, local) = (&rest[..close], &rest[close + 1..]);
            Namespace::get(uri).get_name(local)
        } else {
            Namespace::none().get_name(expanded)
        }
    }

    /// Returns the local part of the name.
    #[must_use]
    pub fn local_name(self) -> &'static str {
        lock().name_entries[(self.0.get() - 1) as usize].1
    }

    /// Returns the namespace part of the name.
    #[must_use]
    pub fn namespace(self) -> Namespace {
        let ns_id = lock().name_entries[(self.0.get() - 1) as usize].0;
        Namespace(NonZeroU32::new(ns_id).expect("namespace ids start at 1"))
    }
}

impl fmt::Display for XmlName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = self.namespace();
        if ns.is_none() {
            f.write_str(self.local_name())
        } else {
            write!(f, "{{{}}}{}", ns.uri(), self.local_name())
        }
    }
}

/// Checks that `name` is a legal XML name token (an NCName: no colon).
///
/// Character classes follow XML 1.0 Fifth Edition `NameStartChar` /
/// `NameChar`, minus `:` which is reserved for prefix syntax and never part
/// of an interned local name.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(Error::argument("'' is not a valid XML name"));
    };
    if !is_name_start_char(first) {
        return Err(Error::argument(format!(
            "'{name}' is not a valid XML name: illegal start character '{first}'"
        )));
    }
    for ch in chars {
        if !is_name_char(ch) {
            return Err(Error::argument(format!(
                "'{name}' is not a valid XML name: illegal character '{ch}'"
            )));
        }
    }
    Ok(())
}

fn is_name_start_char(ch: char) -> bool {
    matches!(ch,
        'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}' | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(ch: char) -> bool {
    is_name_start_char(ch)
        || matches!(ch,
            '-' | '.' | '0'..='9' | '\u{B7}'
            | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_interning_identity() {
        let a = Namespace::get("http://example.com/a");
        let b = Namespace::get("http://example.com/a");
        let c = Namespace::get("http://example.com/c");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.uri(), "http://example.com/a");
    }

    #[test]
    fn test_name_interning_identity() {
        let ns = Namespace::get("urn:test");
        let a = ns.get_name("item").unwrap();
        let b = ns.get_name("item").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, ns.get_name("other").unwrap());
        // Same local name in a different namespace is a different name.
        assert_ne!(a, Namespace::none().get_name("item").unwrap());
    }

    #[test]
    fn test_interning_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| Namespace::get("urn:threaded").get_name("n").unwrap()))
            .collect();
        let names: Vec<XmlName> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(names.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_clark_notation_round_trip() {
        let name = XmlName::get("{urn:test}root").unwrap();
        assert_eq!(name.to_string(), "{urn:test}root");
        assert_eq!(XmlName::get(&name.to_string()).unwrap(), name);

        let plain = XmlName::get("root").unwrap();
        assert_eq!(plain.to_string(), "root");
        assert_eq!(XmlName::get(&plain.to_string()).unwrap(), plain);
    }

    #[test]
    fn test_empty_braces_resolve_to_no_namespace() {
        let name = XmlName::get("{}root").unwrap();
        assert!(name.namespace().is_none());
        assert_eq!(name, XmlName::get("root").unwrap());
    }

    #[test]
    fn test_namespace_display_is_uri() {
        let ns = Namespace::get("urn:display");
        assert_eq!(ns.to_string(), "urn:display");
        assert_eq!(Namespace::none().to_string(), "");
    }

    #[test]
    fn test_well_known_namespaces() {
        assert_eq!(Namespace::xml().uri(), XML_URI);
        assert_eq!(Namespace::xmlns().uri(), XMLNS_URI);
        assert!(Namespace::none().is_none());
        assert!(!Namespace::xml().is_none());
    }

    #[test]
    fn test_invalid_names_rejected() {
        assert!(XmlName::get("").is_err());
        assert!(XmlName::get("1abc").is_err());
        assert!(XmlName::get("a b").is_err());
        assert!(XmlName::get("a<b").is_err());
        // Colons are prefix syntax, not name characters.
        assert!(XmlName::get("a:b").is_err());
        // Missing closing brace.
        assert!(XmlName::get("{urn:test").is_err());
        // Validation happens before interning: the bad local name must not
        // poison later lookups.
        assert!(XmlName::get("ok-name.1").is_ok());
    }

    #[test]
    fn test_unicode_names() {
        assert!(XmlName::get("élan").is_ok());
        assert!(XmlName::get("名前").is_ok());
        assert!(XmlName::get("_underscore").is_ok());
        assert!(XmlName::get("-leading-dash").is_err());
    }
}
