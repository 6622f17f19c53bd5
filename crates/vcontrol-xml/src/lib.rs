//! Load V-Control XML documents into an attributed tree using quick-xml.
//!
//! The tree mirrors what a DOM parser hands out: element, text and comment
//! nodes linked through `first_child` and `next_sibling` only. Nodes carry no
//! parent link, so forward traversal with backtracking goes through
//! [`walk::advance`] and [`walk::Cursor`].

use thiserror::Error;

mod include;
mod parse;
pub mod tree;
pub mod walk;

pub use include::XINCLUDE_NAMESPACE;
pub use tree::{Children, Document, Node, NodeId, NodeKind};
pub use walk::{advance, Cursor, Descendants};

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("xml: {0}")]
    Xml(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid document: {0}")]
    Invalid(String),
    #[error("xinclude: {0}")]
    Include(String),
}
