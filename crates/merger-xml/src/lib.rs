//! Position-tracking XML model for the manifest merger.
//!
//! Documents are stored as an arena of nodes addressed by [`NodeId`]. Every
//! element and attribute remembers the file and line/column it was declared
//! at, so merged output can be traced back to its sources.

mod document;
mod error;
mod name;
mod parser;
mod position;
mod writer;

pub use document::{NodeId, NodeKind, XmlAttribute, XmlDocument, XmlElement, XmlNode};
pub use error::XmlError;
pub use name::{XmlName, ANDROID_URI, TOOLS_URI, XML_URI};
pub use parser::{load, parse};
pub use position::{SourceFile, SourceFilePosition, SourcePosition};
pub use writer::canonical_form;
