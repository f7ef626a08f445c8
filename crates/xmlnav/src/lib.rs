//! xmlnav - stateful cursor navigation over XML documents
//!
//! This crate provides:
//! - An XML parser producing an arena [`Document`] that is cheap to share
//! - A [`Cursor`] that walks the document with depth-first, sibling-relative
//!   moves and can save and restore its [`Position`]
//! - An OpenStreetMap loader ([`osm`]) built on top of the cursor
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use xmlnav::{from_xml_str, Cursor};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = from_xml_str(r#"<osm><node id="1"/><way id="2"/></osm>"#)?;
//! let mut cursor = Cursor::new(Arc::new(doc))?;
//! assert_eq!(cursor.name(), "osm");
//! assert!(cursor.enter());
//! assert!(cursor.find("way"));
//! assert_eq!(cursor.attribute("id"), "2");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

use std::path::Path;

use tracing::{debug, instrument};

pub mod error;
pub use error::{CursorError, Error, ErrorKind, Pos, Result, SourceError, Span};

pub mod lexer;

pub mod xml;
pub use xml::{Config, Document, Name, NameInterner, Node, NodeId, Parser};

pub mod cursor;
pub use cursor::{Cursor, Position};

pub mod osm;

/// Parse XML from string
pub fn from_xml_str(s: &str) -> Result<Document> {
    let mut parser = Parser::new(s.as_bytes());
    parser.parse()
}

/// Parse XML from bytes
pub fn from_xml_bytes(bytes: &[u8]) -> Result<Document> {
    let mut parser = Parser::new(bytes);
    parser.parse()
}

/// Parse XML with custom configuration
pub fn from_xml_str_with_config(s: &str, config: Config) -> Result<Document> {
    let mut parser = Parser::with_config(s.as_bytes(), config);
    parser.parse()
}

/// Read and parse the XML file at `path`
pub fn parse_file(path: impl AsRef<Path>) -> std::result::Result<Document, SourceError> {
    parse_file_with_config(path.as_ref(), Config::default())
}

#[instrument(skip_all, fields(path = %path.display()))]
pub fn parse_file_with_config(
    path: &Path,
    config: Config,
) -> std::result::Result<Document, SourceError> {
    let bytes = std::fs::read(path)?;
    debug!(bytes = bytes.len(), "file read, parsing");

    let mut parser = Parser::with_config(&bytes, config);
    let document = parser.parse()?;

    debug!(elements = document.len(), "parsing completed");
    Ok(document)
}
