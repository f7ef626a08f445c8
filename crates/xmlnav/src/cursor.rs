//! Stateful navigation over a parsed [`Document`]
//!
//! A [`Cursor`] points at one element and moves relative to it: down into the
//! first child, back up to the parent, and sideways along the sibling run.
//! Besides its position the cursor tracks whether it is *at rest*, meaning it
//! arrived at the current element through a vertical move (construction,
//! [`reset`](Cursor::reset), [`enter`](Cursor::enter), [`first`](Cursor::first))
//! rather than through a sibling step. [`find`](Cursor::find) tests the
//! current element only when the cursor is at rest, so repeated finds walk
//! through successive matches:
//!
//! ```
//! use std::sync::Arc;
//! use xmlnav::{from_xml_str, Cursor};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = from_xml_str(r#"<a><b x="1"/><b x="2"/><c/></a>"#)?;
//! let mut cursor = Cursor::new(Arc::new(doc))?;
//!
//! assert!(cursor.enter());
//! assert!(cursor.find("b"));
//! assert_eq!(cursor.attribute("x"), "1");
//! assert!(cursor.find("b"));
//! assert_eq!(cursor.attribute("x"), "2");
//! assert!(!cursor.find("b"));
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::CursorError;
use crate::xml::{Config, Document, Node, NodeId};

/// Snapshot of a cursor's position, see [`Cursor::save`]
///
/// A position is only meaningful for cursors over the document it was taken
/// from. Restoring it on a cursor bound to another document is not detected;
/// the cursor then answers queries with empty strings and refuses to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    node: NodeId,
    at_rest: bool,
}

impl Position {
    pub const fn node(self) -> NodeId {
        self.node
    }

    pub const fn is_at_rest(self) -> bool {
        self.at_rest
    }
}

/// Cursor over a shared, immutable document
#[derive(Clone)]
pub struct Cursor {
    document: Arc<Document>,
    root: NodeId,
    current: NodeId,
    at_rest: bool,
}

impl Cursor {
    /// Bind a cursor to the root of an already parsed document
    pub fn new(document: Arc<Document>) -> Result<Self, CursorError> {
        let Some(root) = document.root() else {
            return Err(CursorError::EmptyDocument { path: None });
        };
        Ok(Self {
            document,
            root,
            current: root,
            at_rest: true,
        })
    }

    /// Parse the file at `path` and position a cursor at its root element
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CursorError> {
        Self::open_with_config(path, Config::default())
    }

    /// Like [`open`](Self::open) with explicit parser limits
    pub fn open_with_config(path: impl AsRef<Path>, config: Config) -> Result<Self, CursorError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening document");

        let document = crate::parse_file_with_config(path, config).map_err(|source| {
            CursorError::OpenFailed {
                path: path.to_path_buf(),
                source,
            }
        })?;

        Self::new(Arc::new(document)).map_err(|err| match err {
            CursorError::EmptyDocument { .. } => {
                warn!(path = %path.display(), "document has no root element");
                CursorError::EmptyDocument {
                    path: Some(path.to_path_buf()),
                }
            }
            other => other,
        })
    }

    /// The document this cursor walks
    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    fn element(&self) -> Option<&Node> {
        self.document.get(self.current)
    }

    /// Name of the current element
    pub fn name(&self) -> &str {
        self.element().map_or("", Node::name)
    }

    /// Text content of the current element, empty when it has none
    pub fn value(&self) -> &str {
        self.element().and_then(Node::text).unwrap_or_default()
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.element().is_some_and(|node| node.attribute(key).is_some())
    }

    /// Value of attribute `key`, empty when absent
    ///
    /// Use [`has_attribute`](Self::has_attribute) to tell an absent attribute
    /// from one set to the empty string.
    pub fn attribute(&self, key: &str) -> &str {
        self.element()
            .and_then(|node| node.attribute(key))
            .unwrap_or_default()
    }

    /// Attributes of the current element in document order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.element().into_iter().flat_map(Node::attributes)
    }

    /// Id of the current element
    pub const fn node(&self) -> NodeId {
        self.current
    }

    pub const fn is_at_rest(&self) -> bool {
        self.at_rest
    }

    /// Number of ancestors of the current element (0 at the root)
    pub fn depth(&self) -> usize {
        std::iter::successors(self.element().and_then(Node::parent), |&id| {
            self.document.get(id).and_then(Node::parent)
        })
        .count()
    }

    /// Jump back to the root element
    pub fn reset(&mut self) {
        self.current = self.root;
        self.at_rest = true;
    }

    /// Move to the first child; `false` when the element has none
    pub fn enter(&mut self) -> bool {
        match self.element().and_then(Node::first_child) {
            Some(child) => {
                self.current = child;
                self.at_rest = true;
                true
            }
            None => false,
        }
    }

    /// Move to the parent element
    ///
    /// Fails with [`CursorError::NoParent`] on the root, leaving the cursor
    /// where it was.
    pub fn leave(&mut self) -> Result<(), CursorError> {
        let Some(parent) = self.element().and_then(Node::parent) else {
            trace!(name = self.name(), "leave() on the root element");
            return Err(CursorError::NoParent);
        };
        self.current = parent;
        self.at_rest = false;
        Ok(())
    }

    /// Move to the next sibling; `false` at the end of the run
    ///
    /// The cursor is no longer at rest afterwards, even when it could not
    /// move.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        self.at_rest = false;
        match self.element().and_then(Node::next_sibling) {
            Some(sibling) => {
                self.current = sibling;
                true
            }
            None => false,
        }
    }

    /// Move to the previous sibling; `false` at the start of the run
    ///
    /// A successful step keeps the resting flag as it was. Bumping into the
    /// start of the run puts the cursor at rest, so a following
    /// [`find`](Self::find) tests the first sibling too.
    pub fn previous(&mut self) -> bool {
        match self.element().and_then(Node::prev_sibling) {
            Some(sibling) => {
                self.current = sibling;
                true
            }
            None => {
                self.at_rest = true;
                false
            }
        }
    }

    /// Move to the first element of the current sibling run and rest there
    pub fn first(&mut self) {
        while self.previous() {}
        self.at_rest = true;
    }

    /// Scan forward through the siblings for an element named `tag`
    ///
    /// At rest the scan starts with the current element, otherwise with the
    /// next sibling. When nothing matches the cursor is left on the last
    /// sibling of the run.
    pub fn find(&mut self, tag: &str) -> bool {
        self.find_by(|node| node.name() == tag)
    }

    /// Shorthand for `find_with(tag, "name", name)`
    pub fn find_named(&mut self, tag: &str, name: &str) -> bool {
        self.find_with(tag, "name", name)
    }

    /// Like [`find`](Self::find), also requiring attribute `key` to equal
    /// `value`
    ///
    /// A missing attribute compares as the empty string.
    pub fn find_with(&mut self, tag: &str, key: &str, value: &str) -> bool {
        self.find_by(|node| {
            node.name() == tag && node.attribute(key).unwrap_or_default() == value
        })
    }

    fn find_by(&mut self, matches: impl Fn(&Node) -> bool) -> bool {
        if !self.at_rest && !self.next() {
            return false;
        }

        loop {
            if self.element().is_some_and(&matches) {
                self.at_rest = false;
                return true;
            }
            if !self.next() {
                return false;
            }
        }
    }

    /// Capture the current position and resting flag
    pub const fn save(&self) -> Position {
        Position {
            node: self.current,
            at_rest: self.at_rest,
        }
    }

    /// Return to a position captured with [`save`](Self::save)
    pub fn restore(&mut self, position: Position) {
        self.current = position.node;
        self.at_rest = position.at_rest;
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("name", &self.name())
            .field("node", &self.current)
            .field("at_rest", &self.at_rest)
            .finish_non_exhaustive()
    }
}
