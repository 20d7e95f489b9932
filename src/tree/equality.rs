//! Structural equality and hashing over trees.
//!
//! Two nodes are structurally equal when they have the same kind and the
//! same payload, attributes, and child sequence — independent of which arena
//! they live in or where they sit in it. Attribute comparison is an
//! order-sensitive pairwise walk, not a set comparison; callers who treat
//! attribute order as insignificant must normalize before comparing.

use super::{Document, NodeId, NodeKind};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Compares two nodes (possibly from different documents) for structural
/// equality.
///
/// Elements match when their qualified names, effective emptiness (`<a/>`
/// versus `<a></a>`), attribute sequences (name and value, in order), and
/// child sequences all match recursively. Document nodes additionally
/// compare their XML declarations. Leaf nodes compare their scalar payloads.
///
/// # Examples
///
/// ```
/// use xylo::{deep_equals, Document};
///
/// let a = Document::parse_str("<root><x a=\"1\"/>text</root>").unwrap();
/// let b = Document::parse_str("<root><x a=\"1\"/>text</root>").unwrap();
/// assert!(deep_equals(&a, a.root(), &b, b.root()));
/// ```
#[must_use]
pub fn deep_equals(doc_a: &Document, a: NodeId, doc_b: &Document, b: NodeId) -> bool {
    match (&doc_a.node(a).kind, &doc_b.node(b).kind) {
        (NodeKind::Document, NodeKind::Document) => {
            doc_a.declaration == doc_b.declaration && children_equal(doc_a, a, doc_b, b)
        }
        (
            NodeKind::Element { name: name_a, .. },
            NodeKind::Element { name: name_b, .. },
        ) => {
            name_a == name_b
                && doc_a.element_is_empty(a) == doc_b.element_is_empty(b)
                && attributes_equal(doc_a, a, doc_b, b)
                && children_equal(doc_a, a, doc_b, b)
        }
        (NodeKind::Text { content: ca }, NodeKind::Text { content: cb })
        | (NodeKind::CData { content: ca }, NodeKind::CData { content: cb })
        | (NodeKind::Comment { content: ca }, NodeKind::Comment { content: cb }) => ca == cb,
        (
            NodeKind::ProcessingInstruction {
                target: ta,
                data: da,
            },
            NodeKind::ProcessingInstruction {
                target: tb,
                data: db,
            },
        ) => ta == tb && da == db,
        (
            NodeKind::DocumentType {
                name: na,
                public_id: pa,
                system_id: sa,
                internal_subset: ia,
            },
            NodeKind::DocumentType {
                name: nb,
                public_id: pb,
                system_id: sb,
                internal_subset: ib,
            },
        ) => na == nb && pa == pb && sa == sb && ia == ib,
        _ => false,
    }
}

fn attributes_equal(doc_a: &Document, a: NodeId, doc_b: &Document, b: NodeId) -> bool {
    let mut attrs_a = doc_a.attributes(a);
    let mut attrs_b = doc_b.attributes(b);
    loop {
        match (attrs_a.next(), attrs_b.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) => {
                if doc_a.attr(x).name != doc_b.attr(y).name
                    || doc_a.attr(x).value != doc_b.attr(y).value
                {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

fn children_equal(doc_a: &Document, a: NodeId, doc_b: &Document, b: NodeId) -> bool {
    let mut kids_a = doc_a.children(a);
    let mut kids_b = doc_b.children(b);
    loop {
        match (kids_a.next(), kids_b.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) => {
                if !deep_equals(doc_a, x, doc_b, y) {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// Computes a structural hash consistent with [`deep_equals`]: structurally
/// equal nodes hash equal. Child and attribute hashes are folded in with
/// position-dependent rotations, so reordering children or attributes
/// changes the hash (matching the order-sensitive equality).
#[must_use]
pub fn deep_hash(doc: &Document, node: NodeId) -> u64 {
    match &doc.node(node).kind {
        NodeKind::Document => {
            let mut h = hash_scalar("document");
            if let Some(decl) = &doc.declaration {
                h ^= hash_parts(&[
                    "declaration",
                    &decl.version,
                    decl.encoding.as_deref().unwrap_or(""),
                    decl.standalone.as_deref().unwrap_or(""),
                ]);
            }
            fold_children(doc, node, h)
        }
        NodeKind::Element { name, .. } => {
            let mut h = hash_parts(&[
                "element",
                name.namespace().uri(),
                name.local_name(),
            ]);
            if doc.element_is_empty(node) {
                h = h.rotate_left(1);
            }
            for attr in doc.attributes(node) {
                let data = doc.attr(attr);
                h = h.rotate_left(7)
                    ^ hash_parts(&[
                        "attribute",
                        data.name.namespace().uri(),
                        data.name.local_name(),
                        &data.value,
                    ]);
            }
            fold_children(doc, node, h)
        }
        NodeKind::Text { content } => hash_parts(&["text", content]),
        NodeKind::CData { content } => hash_parts(&["cdata", content]),
        NodeKind::Comment { content } => hash_parts(&["comment", content]),
        NodeKind::ProcessingInstruction { target, data } => hash_parts(&["pi", target, data]),
        NodeKind::DocumentType {
            name,
            public_id,
            system_id,
            internal_subset,
        } => hash_parts(&[
            "doctype",
            name,
            public_id.as_deref().unwrap_or(""),
            system_id.as_deref().unwrap_or(""),
            internal_subset.as_deref().unwrap_or(""),
        ]),
    }
}

fn fold_children(doc: &Document, node: NodeId, mut h: u64) -> u64 {
    for child in doc.children(node) {
        h = h.rotate_left(11) ^ deep_hash(doc, child);
    }
    h
}

fn hash_scalar(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

fn hash_parts(parts: &[&str]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for part in parts {
        part.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content;
    use crate::name::XmlName;

    fn name(s: &str) -> XmlName {
        XmlName::get(s).unwrap()
    }

    #[test]
    fn test_equal_trees_in_different_documents() {
        let mut a = Document::new();
        let mut b = Document::new();
        for doc in [&mut a, &mut b] {
            let root = doc.new_element(name("root"));
            doc.set_attribute_value(root, name("id"), Some("1")).unwrap();
            let child = doc.new_element(name("child"));
            doc.add(root, content![child, "tail"]).unwrap();
            doc.add(doc.root(), root).unwrap();
        }
        let ra = a.root_element().unwrap();
        let rb = b.root_element().unwrap();
        assert!(deep_equals(&a, ra, &b, rb));
        assert_eq!(deep_hash(&a, ra), deep_hash(&b, rb));
        assert!(deep_equals(&a, a.root(), &b, b.root()));
    }

    #[test]
    fn test_attribute_order_is_significant() {
        let mut a = Document::new();
        let ra = a.new_element(name("e"));
        a.set_attribute_value(ra, name("x"), Some("1")).unwrap();
        a.set_attribute_value(ra, name("y"), Some("2")).unwrap();

        let mut b = Document::new();
        let rb = b.new_element(name("e"));
        b.set_attribute_value(rb, name("y"), Some("2")).unwrap();
        b.set_attribute_value(rb, name("x"), Some("1")).unwrap();

        assert!(!deep_equals(&a, ra, &b, rb));
        assert_ne!(deep_hash(&a, ra), deep_hash(&b, rb));
    }

    #[test]
    fn test_child_reorder_changes_hash() {
        let mut a = Document::new();
        let ra = a.new_element(name("e"));
        a.add(ra, content!["one"]).unwrap();
        let ea = a.new_element(name("sub"));
        a.add(ra, ea).unwrap();

        let mut b = Document::new();
        let rb = b.new_element(name("e"));
        let eb = b.new_element(name("sub"));
        b.add(rb, eb).unwrap();
        b.add(rb, "one").unwrap();

        assert!(!deep_equals(&a, ra, &b, rb));
        assert_ne!(deep_hash(&a, ra), deep_hash(&b, rb));
    }

    #[test]
    fn test_kind_mismatch_not_equal() {
        let mut doc = Document::new();
        let text = doc.new_text("x");
        let cdata = doc.new_cdata("x");
        assert!(!deep_equals(&doc, text, &doc, cdata));
    }

    #[test]
    fn test_self_closing_differs_from_expanded() {
        let a = Document::parse_str("<root><a/></root>").unwrap();
        let b = Document::parse_str("<root><a></a></root>").unwrap();
        let ra = a.root_element().unwrap();
        let rb = b.root_element().unwrap();
        assert!(!deep_equals(&a, ra, &b, rb));
        assert_ne!(deep_hash(&a, ra), deep_hash(&b, rb));
    }

    #[test]
    fn test_declaration_participates_for_documents() {
        let mut a = Document::new();
        let mut b = Document::new();
        for doc in [&mut a, &mut b] {
            let root = doc.new_element(name("root"));
            doc.add(doc.root(), root).unwrap();
        }
        assert!(deep_equals(&a, a.root(), &b, b.root()));
        a.declaration = Some(crate::tree::Declaration::new(Some("1.0"), None, Some("yes")));
        assert!(!deep_equals(&a, a.root(), &b, b.root()));
    }

    #[test]
    fn test_pi_and_doctype_payload_equality() {
        let mut a = Document::new();
        let mut b = Document::new();
        let pa = a.new_processing_instruction("t", "d").unwrap();
        let pb = b.new_processing_instruction("t", "d").unwrap();
        assert!(deep_equals(&a, pa, &b, pb));
        let pc = b.new_processing_instruction("t", "other").unwrap();
        assert!(!deep_equals(&a, pa, &b, pc));

        let da = a.new_document_type("html", Some("p"), Some("s"), None).unwrap();
        let db = b.new_document_type("html", Some("p"), Some("s"), None).unwrap();
        assert!(deep_equals(&a, da, &b, db));
        let dc = b.new_document_type("html", None, Some("s"), None).unwrap();
        assert!(!deep_equals(&a, da, &b, dc));
    }
}
