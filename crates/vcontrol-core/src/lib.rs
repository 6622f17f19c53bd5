//! V-Control catalog: protocols, units, devices, commands and daemon
//! configuration compiled from one document and published as an immutable
//! snapshot.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use vcontrol_xml::{Node, XmlError};

pub mod allow;
pub mod bytes;
pub mod catalog;
pub mod command;
pub mod config;
pub mod device;
pub mod protocol;
pub mod store;
pub mod unit;

pub use allow::{AllowEntry, AllowError, AllowList};
pub use catalog::{Catalog, ROOT_ELEMENT, VCONTROL_NAMESPACE};
pub use command::{Command, CommandOrigin};
pub use config::Config;
pub use device::Device;
pub use protocol::{InitialCommand, Macro, Protocol};
pub use store::CatalogStore;
pub use unit::{EnumEntry, Unit};

/// Error type produced while compiling or reading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A required tag or attribute is missing or malformed.
    #[error("schema error at line {line}: {message}")]
    Schema { line: usize, message: String },
    /// A name refers to a protocol or device that does not exist.
    #[error("line {line}: {kind} '{name}' is not defined")]
    Reference {
        line: usize,
        kind: RefKind,
        name: String,
    },
    /// The document could not be read, parsed or expanded.
    #[error(transparent)]
    Xml(#[from] XmlError),
    /// No catalog has been published yet.
    #[error("no catalog loaded")]
    NotLoaded,
}

impl CatalogError {
    pub(crate) fn schema(node: Node<'_>, message: impl Into<String>) -> Self {
        CatalogError::Schema {
            line: node.line(),
            message: message.into(),
        }
    }

    pub(crate) fn reference(line: usize, kind: RefKind, name: &str) -> Self {
        CatalogError::Reference {
            line,
            kind,
            name: name.to_string(),
        }
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, CatalogError::Schema { .. })
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, CatalogError::Reference { .. })
    }
}

/// Kind of entity an unresolved reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Protocol,
    Device,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefKind::Protocol => f.write_str("protocol"),
            RefKind::Device => f.write_str("device"),
        }
    }
}

fn required_attr<'a>(node: Node<'a>, attr: &str) -> Result<&'a str, CatalogError> {
    node.attribute(attr).ok_or_else(|| {
        CatalogError::schema(node, format!("<{}> without {attr} attribute", node.name()))
    })
}

/// Text content of a field element, `None` when empty.
fn field_text(node: Node<'_>) -> Option<&str> {
    node.text().filter(|text| !text.is_empty())
}

/// Numeric content of a field element, `None` when empty.
fn field_number<T>(node: Node<'_>) -> Result<Option<T>, CatalogError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let Some(text) = field_text(node) else {
        return Ok(None);
    };
    text.parse().map(Some).map_err(|err| {
        CatalogError::schema(node, format!("<{}>: invalid number '{text}': {err}", node.name()))
    })
}

fn unexpected(node: Node<'_>, context: &str) -> CatalogError {
    CatalogError::schema(node, format!("unexpected <{}> in {context}", node.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcontrol_xml::Document;

    #[test]
    fn field_helpers() {
        let doc = Document::parse_str("<r a=\"x\"><len> 12 </len><bit/><bad>1x</bad></r>")
            .expect("parse");
        let root = doc.root().expect("root");
        assert_eq!(required_attr(root, "a").expect("attr"), "x");
        let err = required_attr(root, "name").unwrap_err();
        assert!(err.is_schema());
        assert!(err.to_string().contains("without name attribute"));

        let mut fields = root.children();
        let len = fields.next().expect("len");
        let bit = fields.next().expect("bit");
        let bad = fields.next().expect("bad");
        assert_eq!(field_number::<u32>(len).expect("len"), Some(12));
        assert_eq!(field_number::<u8>(bit).expect("bit"), None);
        assert!(field_number::<u8>(bad).unwrap_err().is_schema());
    }

    #[test]
    fn reference_error_message() {
        let err = CatalogError::reference(7, RefKind::Device, "2098");
        assert!(err.is_reference());
        assert_eq!(err.to_string(), "line 7: device '2098' is not defined");
    }
}
