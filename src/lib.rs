//! # xylo
//!
//! An in-memory XML document tree with streaming pull adapters. The tree is
//! arena-allocated and mutated through a single [`Document`] handle; names
//! are interned process-wide so comparing them is an integer compare; and
//! two adapters bridge the tree to pull-style streams — [`NodeReader`]
//! exposes a persistent tree through a cursor interface without copying it,
//! and [`NodeWriter`] builds a tree from one `write_*` call at a time.
//!
//! ## Quick Start
//!
//! ```
//! use xylo::Document;
//!
//! let mut doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
//! let root = doc.root_element().unwrap();
//! assert_eq!(doc.text_content(root), "Hello");
//!
//! doc.add(root, " world").unwrap();
//! assert_eq!(doc.to_xml().unwrap(), "<root><child>Hello</child> world</root>");
//! ```

pub mod encoding;
pub mod error;
pub mod name;
pub mod parser;
pub mod reader;
pub mod serial;
pub mod tree;
pub mod writer;

// Re-export primary types at the crate root for convenience.
pub use error::{Error, ParseError, Result, SourceLocation};
pub use name::{Namespace, XmlName};
pub use parser::ParseOptions;
pub use reader::{NodeReader, ReadState, XmlNodeType};
pub use serial::{SerializeOptions, XmlTextWriter};
pub use tree::{
    compare_in_document_order, deep_equals, deep_hash, AttrId, ChangeEvent, ChangeKind,
    ChangePhase, ChangeTarget, Content, Declaration, Document, NodeId, NodeKind,
};
pub use writer::{NodeWriter, XmlWrite};
