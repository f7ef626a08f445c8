//! XML document model and parser

pub mod intern;
pub mod model;
pub mod parser;

pub use intern::{Name, NameInterner};
pub use model::{Attributes, Children, Document, Node, NodeId};
pub use parser::{Config, Parser};
