//! Arena-backed XML document
//!
//! Elements live in one `Vec` and refer to each other by [`NodeId`]: every node
//! records its parent, its first and last child and both neighbours in its
//! sibling run. There are no owning links between nodes, so a finished
//! [`Document`] can be shared behind an `Arc` by any number of readers.

use indexmap::IndexMap;

use crate::xml::intern::Name;

/// Index of an element inside its [`Document`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the element in document order
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One element of the document
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    name: Name,
    attributes: IndexMap<Name, String>,
    text: Option<String>,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of `key`, `None` when the element does not carry it
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Attributes in document order
    pub fn attributes(&self) -> Attributes<'_> {
        Attributes {
            inner: self.attributes.iter(),
        }
    }

    /// Concatenated text and CDATA directly inside the element
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub const fn first_child(&self) -> Option<NodeId> {
        self.first_child
    }

    pub const fn last_child(&self) -> Option<NodeId> {
        self.last_child
    }

    pub const fn prev_sibling(&self) -> Option<NodeId> {
        self.prev_sibling
    }

    pub const fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling
    }

    pub const fn has_children(&self) -> bool {
        self.first_child.is_some()
    }
}

/// Iterator over an element's attributes
#[derive(Clone, Debug)]
pub struct Attributes<'a> {
    inner: indexmap::map::Iter<'a, Name, String>,
}

impl<'a> Iterator for Attributes<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(key, value)| (&**key, value.as_str()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Parsed XML document
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root element, `None` when the source held no element at all
    pub const fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Child elements of `id` in document order
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            document: self,
            next: self.get(id).and_then(Node::first_child),
        }
    }

    /// All elements in document order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index), node))
    }

    /// Append an element as the last child of `parent`, or as the root
    ///
    /// Returns `None` when `parent` is unknown, or when no parent is given but
    /// the document already has a root.
    pub(crate) fn push_element(
        &mut self,
        parent: Option<NodeId>,
        name: Name,
        attributes: IndexMap<Name, String>,
    ) -> Option<NodeId> {
        let id = NodeId(self.nodes.len());
        let prev_sibling = match parent {
            Some(parent_id) => {
                let parent_node = self.nodes.get_mut(parent_id.0)?;
                let prev = parent_node.last_child.replace(id);
                if parent_node.first_child.is_none() {
                    parent_node.first_child = Some(id);
                }
                prev
            }
            None => {
                if self.root.is_some() {
                    return None;
                }
                self.root = Some(id);
                None
            }
        };

        if let Some(prev_id) = prev_sibling {
            if let Some(prev) = self.nodes.get_mut(prev_id.0) {
                prev.next_sibling = Some(id);
            }
        }

        self.nodes.push(Node {
            name,
            attributes,
            text: None,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling,
            next_sibling: None,
        });
        Some(id)
    }

    /// Append character data to the element's aggregated text
    pub(crate) fn append_text(&mut self, id: NodeId, text: &str) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.text.get_or_insert_with(String::new).push_str(text);
        }
    }
}

/// Iterator over a sibling run
#[derive(Clone, Debug)]
pub struct Children<'a> {
    document: &'a Document,
    next: Option<NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = self.document.get(id)?;
        self.next = node.next_sibling;
        Some((id, node))
    }
}
