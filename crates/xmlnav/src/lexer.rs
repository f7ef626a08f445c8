//! Byte-level scanning shared by the markup parser

pub mod cursor;

pub use cursor::ByteCursor;
