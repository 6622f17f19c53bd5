//! Aggregator for the V-Control workspace.
//!
//! Re-exports the catalog compiler and the XML tree so applications can
//! depend on a single crate.

pub use vcontrol_core::*;
pub use vcontrol_xml as xml;
