//! Package tree nodes.
//!
//! A [`Node`] is either a leaf holding typed content or a directory holding
//! named children. Directories own their children outright; removing a child
//! drops its whole subtree, and no child holds a reference back to its
//! parent. Every node tracks whether it has diverged from its last loaded or
//! written on-disk state so differential writes can skip clean entries.

use crate::codec::{Codecs, Image, Record};
use crate::content::{Content, ContentCell};
use crate::pathutil::segments;
use crate::tree::naming;
use indexmap::IndexMap;
use tracing::{debug, warn};

/// Divergence from the last loaded or written on-disk state.
///
/// Modeled as an explicit state rather than a timestamp comparison so
/// differential writes stay deterministic and testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyState {
    Clean,
    Dirty,
}

/// A package tree element: content leaf or directory of named children.
///
/// The kind is fixed at construction. Children are kept in insertion order
/// under names that are unique among siblings; the name a child actually
/// received is assigned at insertion time and readable via [`Node::filename`].
#[derive(Debug)]
pub struct Node {
    filename: Option<String>,
    preferred_filename: Option<String>,
    state: DirtyState,
    body: Body,
}

#[derive(Debug)]
enum Body {
    Leaf(ContentCell),
    Directory(IndexMap<String, Node>),
}

/// Structural view handed to the persistence engine.
pub(crate) enum BodyRef<'a> {
    Leaf(&'a ContentCell),
    Directory(&'a mut IndexMap<String, Node>),
}

impl Node {
    /// New empty leaf, dirty until first written.
    pub fn new_leaf() -> Self {
        Node {
            filename: None,
            preferred_filename: None,
            state: DirtyState::Dirty,
            body: Body::Leaf(ContentCell::default()),
        }
    }

    /// New empty directory, dirty until first written.
    pub fn new_directory() -> Self {
        Node {
            filename: None,
            preferred_filename: None,
            state: DirtyState::Dirty,
            body: Body::Directory(IndexMap::new()),
        }
    }

    pub(crate) fn loaded_leaf(bytes: Vec<u8>) -> Self {
        Node {
            filename: None,
            preferred_filename: None,
            state: DirtyState::Clean,
            body: Body::Leaf(ContentCell::new(Content::Bytes(bytes))),
        }
    }

    pub(crate) fn loaded_directory(children: IndexMap<String, Node>) -> Self {
        Node {
            filename: None,
            preferred_filename: None,
            state: DirtyState::Clean,
            body: Body::Directory(children),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.body, Body::Directory(_))
    }

    pub fn is_dirty(&self) -> bool {
        self.state == DirtyState::Dirty
    }

    /// The name assigned by the parent directory at insertion time; `None`
    /// until inserted. Root nodes may remain unnamed forever.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Naming hint used when a node is added without a usable name.
    pub fn preferred_filename(&self) -> Option<&str> {
        self.preferred_filename.as_deref()
    }

    pub fn set_preferred_filename(&mut self, hint: impl Into<String>) {
        self.preferred_filename = Some(naming::sanitize(&hint.into()));
    }

    pub(crate) fn assign_filename(&mut self, name: String) {
        self.filename = Some(name);
    }

    pub(crate) fn mark_clean(&mut self) {
        self.state = DirtyState::Clean;
    }

    pub(crate) fn body_for_persist(&mut self) -> BodyRef<'_> {
        match &mut self.body {
            Body::Leaf(cell) => BodyRef::Leaf(cell),
            Body::Directory(children) => BodyRef::Directory(children),
        }
    }

    // --- Leaf content ---

    /// Replace a leaf's canonical content, invalidating every previously
    /// cached alternate interpretation and marking the node dirty.
    ///
    /// Record and image content refresh the preferred-filename hint with an
    /// extension matching the default codecs. On a directory this is a
    /// reported no-op.
    pub fn update(&mut self, content: Content) {
        match &mut self.body {
            Body::Leaf(cell) => {
                match &content {
                    Content::Record(_) => self.preferred_filename = Some("record.json".to_string()),
                    Content::Image(_) => self.preferred_filename = Some("image.ff".to_string()),
                    Content::Bytes(_) | Content::Text(_) => {}
                }
                cell.update(content);
                self.state = DirtyState::Dirty;
            }
            Body::Directory(_) => warn!("update on a directory node is a no-op"),
        }
    }

    /// Reset a leaf to empty bytes, marking it dirty.
    pub fn clear_content(&mut self) {
        match &mut self.body {
            Body::Leaf(cell) => {
                cell.update(Content::Bytes(Vec::new()));
                self.state = DirtyState::Dirty;
            }
            Body::Directory(_) => warn!("clear_content on a directory node is a no-op"),
        }
    }

    /// Raw bytes, present only while bytes are the canonical content.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.body {
            Body::Leaf(cell) => cell.as_bytes(),
            Body::Directory(_) => None,
        }
    }

    /// Text content, or a cached UTF-8 decode of canonical bytes.
    pub fn as_text(&mut self) -> Option<&str> {
        match &mut self.body {
            Body::Leaf(cell) => cell.as_text(),
            Body::Directory(_) => None,
        }
    }

    /// Structured record content, or a cached decode of canonical bytes.
    pub fn as_record(&mut self, codecs: &Codecs) -> Option<&Record> {
        match &mut self.body {
            Body::Leaf(cell) => cell.as_record(codecs),
            Body::Directory(_) => None,
        }
    }

    /// Image content, or a cached decode of canonical bytes.
    pub fn as_image(&mut self, codecs: &Codecs) -> Option<&Image> {
        match &mut self.body {
            Body::Leaf(cell) => cell.as_image(codecs),
            Body::Directory(_) => None,
        }
    }

    // --- Path lookup ---

    /// Resolve a `/`-delimited relative path against nested children.
    ///
    /// Each non-empty segment descends one directory level; `""` and `"/"`
    /// resolve to the receiver itself. `None` if a segment is missing or the
    /// path crosses a leaf.
    pub fn wrapper(&self, path: &str) -> Option<&Node> {
        let mut current = self;
        for segment in segments(path) {
            match &current.body {
                Body::Directory(children) => current = children.get(segment)?,
                Body::Leaf(_) => return None,
            }
        }
        Some(current)
    }

    /// Mutable variant of [`Node::wrapper`].
    pub fn wrapper_mut(&mut self, path: &str) -> Option<&mut Node> {
        let mut current = self;
        for segment in segments(path) {
            match &mut current.body {
                Body::Directory(children) => current = children.get_mut(segment)?,
                Body::Leaf(_) => return None,
            }
        }
        Some(current)
    }

    /// Resolve like [`Node::wrapper_mut`], creating missing nodes on the way.
    ///
    /// Intermediate segments become directories; the final segment becomes a
    /// directory or leaf per `directory`. Created nodes are dirty and mark
    /// their parent dirty. `None` if the path crosses an existing leaf or the
    /// existing final node has the wrong kind.
    pub fn wrapper_or_create(&mut self, path: &str, directory: bool) -> Option<&mut Node> {
        let parts: Vec<&str> = segments(path).collect();
        let total = parts.len();
        let mut current = self;
        for (i, segment) in parts.into_iter().enumerate() {
            let want_directory = directory || i + 1 < total;
            let created = {
                let Body::Directory(children) = &mut current.body else {
                    return None;
                };
                if children.contains_key(segment) {
                    false
                } else {
                    let mut node = if want_directory {
                        Node::new_directory()
                    } else {
                        Node::new_leaf()
                    };
                    node.filename = Some(segment.to_string());
                    children.insert(segment.to_string(), node);
                    true
                }
            };
            if created {
                current.state = DirtyState::Dirty;
            }
            let Body::Directory(children) = &mut current.body else {
                return None;
            };
            current = children.get_mut(segment)?;
        }
        if current.is_directory() == directory {
            Some(current)
        } else {
            None
        }
    }

    /// Snapshot of the immediate children of the directory at `path`, in
    /// insertion order.
    ///
    /// `""` and `"/"` both list the receiver's own children. Empty when the
    /// path is missing or names a leaf.
    pub fn wrappers(&self, path: &str) -> Vec<&Node> {
        match self.wrapper(path).map(|node| &node.body) {
            Some(Body::Directory(children)) => children.values().collect(),
            _ => Vec::new(),
        }
    }

    // --- Insertion and removal ---

    /// Add a child under `filename`, renaming on collision.
    ///
    /// A taken name gets a space-separated counter before the extension
    /// (`hello.txt`, `hello 1.txt`, ...). An empty proposed name falls back
    /// to the child's preferred filename, then `"untitled"`. Returns the
    /// name actually used, or `None` on a leaf receiver (a reported no-op).
    pub fn add(&mut self, mut child: Node, filename: &str) -> Option<String> {
        let children = match &mut self.body {
            Body::Directory(children) => children,
            Body::Leaf(_) => {
                warn!("add on a leaf node is a no-op");
                return None;
            }
        };
        let mut proposed = naming::sanitize(filename);
        if proposed.is_empty() {
            proposed = naming::sanitize(child.preferred_filename.as_deref().unwrap_or("untitled"));
            if proposed.is_empty() {
                proposed = "untitled".to_string();
            }
        }
        let actual = naming::resolve_collision(&proposed, |name| children.contains_key(name));
        if actual != proposed {
            debug!(%proposed, %actual, "renamed colliding child");
        }
        child.filename = Some(actual.clone());
        children.insert(actual.clone(), child);
        self.state = DirtyState::Dirty;
        Some(actual)
    }

    /// Insert a child under `filename`, replacing any existing child with
    /// that name. No collision renaming.
    pub fn set(&mut self, mut child: Node, filename: &str) {
        match &mut self.body {
            Body::Directory(children) => {
                let name = naming::sanitize(filename);
                if name.is_empty() {
                    warn!("set with an empty filename is a no-op");
                    return;
                }
                child.filename = Some(name.clone());
                children.insert(name, child);
                self.state = DirtyState::Dirty;
            }
            Body::Leaf(_) => warn!("set on a leaf node is a no-op"),
        }
    }

    /// Add a new content leaf, renaming on collision; returns the name
    /// actually used.
    pub fn add_content(&mut self, content: Content, filename: &str) -> Option<String> {
        let mut leaf = Node::new_leaf();
        leaf.update(content);
        self.add(leaf, filename)
    }

    /// Insert a new content leaf under `filename`, replacing any existing
    /// child with that name.
    pub fn set_content(&mut self, content: Content, filename: &str) {
        let mut leaf = Node::new_leaf();
        leaf.update(content);
        self.set(leaf, filename);
    }

    /// Delete a direct child by name, dropping its subtree.
    ///
    /// Removing a child that does not exist is a reported no-op: `false`,
    /// with the tree unchanged.
    pub fn remove_child(&mut self, filename: &str) -> bool {
        match &mut self.body {
            Body::Directory(children) => {
                if children.shift_remove(filename).is_some() {
                    self.state = DirtyState::Dirty;
                    true
                } else {
                    debug!(filename, "remove_child: no such child");
                    false
                }
            }
            Body::Leaf(_) => {
                warn!("remove_child on a leaf node is a no-op");
                false
            }
        }
    }

    /// Delete the node at a `/`-delimited relative path, dropping its
    /// subtree. `false` when the path does not resolve.
    pub fn remove_wrapper(&mut self, path: &str) -> bool {
        let mut parts: Vec<&str> = segments(path).collect();
        let Some(last) = parts.pop() else {
            return false;
        };
        let parent = if parts.is_empty() {
            Some(self)
        } else {
            self.wrapper_mut(&parts.join("/"))
        };
        match parent {
            Some(directory) => directory.remove_child(last),
            None => false,
        }
    }
}
