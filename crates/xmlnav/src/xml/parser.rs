//! XML parser building an arena [`Document`]

use std::borrow::Cow;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Error, ErrorKind, Pos, Result, Span};
use crate::lexer::ByteCursor;
use crate::xml::intern::{Name, NameInterner};
use crate::xml::model::{Document, NodeId};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Limits applied while parsing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Maximum element nesting depth (0 means unlimited)
    pub max_depth: u16,
    /// Maximum input size in bytes (0 means unlimited)
    pub max_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_size: 64 * 1024 * 1024, // 64 MB default
        }
    }
}

impl Config {
    /// Create a new config with unlimited depth and size
    pub const fn unlimited() -> Self {
        Self {
            max_depth: 0,
            max_size: 0,
        }
    }

    /// Create a new config with specific limits
    pub const fn new(max_depth: u16, max_size: usize) -> Self {
        Self {
            max_depth,
            max_size,
        }
    }
}

/// XML parser
#[derive(Debug)]
pub struct Parser<'a> {
    cursor: ByteCursor<'a>,
    config: Config,
    interner: Arc<NameInterner>,
    document: Document,
}

impl<'a> Parser<'a> {
    /// Create a new parser with default configuration
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_config(input, Config::default())
    }

    /// Create a new parser with custom configuration
    pub fn with_config(input: &'a [u8], config: Config) -> Self {
        Self::with_interner(input, config, Arc::new(NameInterner::new()))
    }

    /// Create a parser that stores names through a shared interner
    pub fn with_interner(input: &'a [u8], config: Config, interner: Arc<NameInterner>) -> Self {
        Self {
            cursor: ByteCursor::new(input),
            config,
            interner,
            document: Document::new(),
        }
    }

    /// Parse the input into a document
    ///
    /// Input holding nothing but whitespace, comments, processing
    /// instructions or a DOCTYPE parses to a document without a root.
    pub fn parse(&mut self) -> Result<Document> {
        let size = self.cursor.remaining().len();
        if self.config.max_size > 0 && size > self.config.max_size {
            return Err(Error::at(
                ErrorKind::MaxSizeExceeded {
                    max: self.config.max_size,
                },
                self.cursor.position(),
            ));
        }

        if self.cursor.starts_with(UTF8_BOM) {
            self.cursor.advance_by(UTF8_BOM.len());
        }

        self.skip_misc()?;
        if !self.cursor.is_eof() {
            if self.cursor.current() != Some(b'<') {
                return Err(self.error_here(ErrorKind::InvalidToken, "expected root element"));
            }
            self.parse_tree()?;
            self.skip_misc()?;
            if !self.cursor.is_eof() {
                return Err(self.error_here(
                    ErrorKind::TrailingContent,
                    "unexpected content after the root element",
                ));
            }
        }

        Ok(std::mem::take(&mut self.document))
    }

    fn parse_tree(&mut self) -> Result<()> {
        let (root, closed) = self.parse_start_tag(None)?;
        if closed {
            return Ok(());
        }

        let mut open = vec![root];
        while let Some(&current) = open.last() {
            if self.cursor.starts_with(b"</") {
                self.parse_end_tag(current)?;
                open.pop();
            } else if self.cursor.starts_with(b"<!--") {
                self.skip_comment()?;
            } else if self.cursor.starts_with(b"<![CDATA[") {
                let text = self.parse_cdata()?;
                self.document.append_text(current, text);
            } else if self.cursor.starts_with(b"<?") {
                self.skip_processing_instruction()?;
            } else if self.cursor.current() == Some(b'<') {
                self.check_depth(open.len())?;
                let (child, closed) = self.parse_start_tag(Some(current))?;
                if !closed {
                    open.push(child);
                }
            } else if self.cursor.is_eof() {
                return Err(self.error_here(ErrorKind::UnexpectedEof, "unterminated element"));
            } else {
                let text = self.parse_text()?;
                self.document.append_text(current, &text);
            }
        }

        Ok(())
    }

    fn check_depth(&self, open: usize) -> Result<()> {
        let max = self.config.max_depth;
        if max > 0 && open >= usize::from(max) {
            return Err(self.error_here(
                ErrorKind::MaxDepthExceeded { max },
                "element nesting too deep",
            ));
        }
        Ok(())
    }

    /// Parse `<name attr="value" ...>` or `<name ... />`
    ///
    /// Returns the new element and whether it was self-closing.
    fn parse_start_tag(&mut self, parent: Option<NodeId>) -> Result<(NodeId, bool)> {
        self.expect_byte(b'<')?;
        let name = self.parse_name()?;
        let name = self.interner.intern(name);
        let attributes = self.parse_attributes()?;

        let closed = self.cursor.consume(b'/');
        self.expect_byte(b'>')?;

        let id = self
            .document
            .push_element(parent, name, attributes)
            .ok_or_else(|| self.error_here(ErrorKind::InvalidToken, "misplaced element"))?;
        Ok((id, closed))
    }

    fn parse_end_tag(&mut self, current: NodeId) -> Result<()> {
        let start = self.cursor.position();
        self.cursor.advance_by(2);
        let found = self.parse_name()?;
        let expected = self.document.get(current).map(|node| node.name()).unwrap_or_default();

        if found != expected {
            return Err(Error::at(
                ErrorKind::MismatchedTag {
                    expected: expected.to_string(),
                    found: found.to_string(),
                },
                start,
            ));
        }

        self.cursor.skip_whitespace();
        self.expect_byte(b'>')
    }

    fn parse_attributes(&mut self) -> Result<IndexMap<Name, String>> {
        let mut attrs = IndexMap::new();

        loop {
            let separated = matches!(self.cursor.current(), Some(b' ' | b'\t' | b'\n' | b'\r'));
            self.cursor.skip_whitespace();
            match self.cursor.current() {
                Some(b'/') | Some(b'>') => break,
                Some(_) if !separated => {
                    return Err(self.error_here(
                        ErrorKind::InvalidToken,
                        "expected whitespace before attribute",
                    ))
                }
                Some(_) => {}
                None => return Err(self.error_here(ErrorKind::UnexpectedEof, "unterminated tag")),
            }

            let name_pos = self.cursor.position();
            let name = self.parse_name()?;
            self.cursor.skip_whitespace();
            self.expect_byte(b'=')?;
            self.cursor.skip_whitespace();
            let value = self.parse_attribute_value()?;

            if attrs.contains_key(name) {
                return Err(Error::at(
                    ErrorKind::DuplicateAttribute {
                        name: name.to_string(),
                    },
                    name_pos,
                ));
            }
            attrs.insert(self.interner.intern(name), value);
        }

        Ok(attrs)
    }

    fn parse_attribute_value(&mut self) -> Result<String> {
        let quote = match self.cursor.current() {
            Some(b'"') => b'"',
            Some(b'\'') => b'\'',
            _ => {
                return Err(
                    self.error_here(ErrorKind::InvalidToken, "expected quoted attribute value")
                )
            }
        };
        self.cursor.advance();

        let start_pos = self.cursor.position();
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == quote {
                let raw = self.cursor.slice_from(start);
                self.cursor.advance();
                let text = bytes_to_str(raw, start_pos)?;
                return decode_entities(&normalize_attribute_whitespace(text), start_pos);
            }
            if b == b'<' {
                return Err(self.error_here(ErrorKind::InvalidToken, "'<' in attribute value"));
            }
            self.cursor.advance();
        }

        Err(self.error_here(ErrorKind::UnexpectedEof, "unterminated attribute value"))
    }

    fn parse_text(&mut self) -> Result<String> {
        let start_pos = self.cursor.position();
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == b'<' {
                break;
            }
            self.cursor.advance();
        }

        let raw = self.cursor.slice_from(start);
        let text = bytes_to_str(raw, start_pos)?;
        decode_entities(text, start_pos)
    }

    fn parse_cdata(&mut self) -> Result<&'a str> {
        let start_pos = self.cursor.position();
        self.cursor.advance_by(b"<![CDATA[".len());
        let start = self.cursor.pos();
        while !self.cursor.is_eof() {
            if self.cursor.starts_with(b"]]>") {
                let raw = self.cursor.slice_from(start);
                self.cursor.advance_by(3);
                return bytes_to_str(raw, start_pos);
            }
            self.cursor.advance();
        }
        Err(Error::with_message(
            ErrorKind::UnexpectedEof,
            Span::new(start_pos, self.cursor.position()),
            "unterminated CDATA section",
        ))
    }

    fn parse_name(&mut self) -> Result<&'a str> {
        let start_pos = self.cursor.position();
        let start = self.cursor.pos();

        let Some(first) = self.cursor.current() else {
            return Err(self.error_here(ErrorKind::UnexpectedEof, "expected name"));
        };
        if !is_name_start(first) {
            return Err(Error::with_message(
                ErrorKind::InvalidToken,
                Span::at(start_pos),
                "expected name",
            ));
        }

        self.cursor.advance();
        while let Some(b) = self.cursor.current() {
            if is_name_char(b) {
                self.cursor.advance();
            } else {
                break;
            }
        }

        bytes_to_str(self.cursor.slice_from(start), start_pos)
    }

    /// Skip whitespace, comments, processing instructions and DOCTYPE
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.starts_with(b"<?") {
                self.skip_processing_instruction()?;
            } else if self.cursor.starts_with(b"<!--") {
                self.skip_comment()?;
            } else if self.cursor.starts_with(b"<!DOCTYPE") {
                self.skip_doctype()?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_comment(&mut self) -> Result<()> {
        self.cursor.advance_by(4);
        self.skip_until(b"-->")
    }

    fn skip_processing_instruction(&mut self) -> Result<()> {
        self.cursor.advance_by(2);
        self.skip_until(b"?>")
    }

    fn skip_doctype(&mut self) -> Result<()> {
        let start_pos = self.cursor.position();
        let mut subset_depth = 0usize;
        let mut quote = None;
        while let Some(b) = self.cursor.current() {
            self.cursor.advance();
            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'[') => subset_depth += 1,
                (None, b']') => subset_depth = subset_depth.saturating_sub(1),
                (None, b'>') if subset_depth == 0 => return Ok(()),
                _ => {}
            }
        }
        Err(Error::with_message(
            ErrorKind::UnexpectedEof,
            Span::new(start_pos, self.cursor.position()),
            "unterminated DOCTYPE",
        ))
    }

    fn skip_until(&mut self, pattern: &[u8]) -> Result<()> {
        while !self.cursor.is_eof() {
            if self.cursor.starts_with(pattern) {
                self.cursor.advance_by(pattern.len());
                return Ok(());
            }
            self.cursor.advance();
        }
        Err(self.error_here(ErrorKind::UnexpectedEof, "unterminated markup"))
    }

    fn expect_byte(&mut self, expected: u8) -> Result<()> {
        if self.cursor.consume(expected) {
            Ok(())
        } else if self.cursor.is_eof() {
            Err(self.error_here(ErrorKind::UnexpectedEof, "unexpected end of input"))
        } else {
            Err(self.error_here(
                ErrorKind::InvalidToken,
                &format!("expected '{}'", char::from(expected)),
            ))
        }
    }

    fn error_here(&self, kind: ErrorKind, message: &str) -> Error {
        Error::with_message(kind, Span::at(self.cursor.position()), message)
    }
}

fn bytes_to_str(bytes: &[u8], pos: Pos) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|_| Error::at(ErrorKind::InvalidUtf8, pos))
}

fn is_name_start(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || !b.is_ascii()
}

fn is_name_char(b: u8) -> bool {
    is_name_start(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}

fn normalize_attribute_whitespace(value: &str) -> Cow<'_, str> {
    if value.contains(['\t', '\n', '\r']) {
        Cow::Owned(value.replace(['\t', '\n', '\r'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

fn decode_entities(input: &str, pos: Pos) -> Result<String> {
    if !input.contains('&') {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        let (before, after) = rest.split_at(amp);
        result.push_str(before);

        let Some(end) = after.find(';') else {
            return Err(Error::at(
                ErrorKind::InvalidEntity {
                    entity: after.trim_start_matches('&').to_string(),
                },
                pos,
            ));
        };
        let entity = after.get(1..end).unwrap_or_default();

        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => decode_numeric_entity(entity),
        };

        match decoded {
            Some(ch) => result.push(ch),
            None => {
                return Err(Error::at(
                    ErrorKind::InvalidEntity {
                        entity: entity.to_string(),
                    },
                    pos,
                ));
            }
        }
        rest = after.get(end + 1..).unwrap_or_default();
    }
    result.push_str(rest);

    Ok(result)
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok().and_then(xml_char)
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(xml_char)
    } else {
        None
    }
}

/// Code points allowed by the XML `Char` production
fn xml_char(code: u32) -> Option<char> {
    match code {
        0x9 | 0xA | 0xD | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x1_0000..=0x10_FFFF => {
            char::from_u32(code)
        }
        _ => None,
    }
}
