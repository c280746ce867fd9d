//! Arena-backed tree document
//!
//! Nodes live in a single `Vec` and reference each other through `NodeId`
//! indices. Detaching a node unlinks it from its parent but keeps it in the
//! arena, so ids held by callers stay valid for the life of the document.

use indexmap::IndexMap;

/// Index of a node inside its owning `Document`
///
/// Ids are only minted by a document and must not be used with another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single element of the tree
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    text: Option<String>,
    attributes: IndexMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(name: String) -> Self {
        Node {
            name,
            text: None,
            attributes: IndexMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// An owned, single-rooted element tree
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Create a document containing only a root element
    pub fn new(root_name: impl Into<String>) -> Self {
        Document {
            nodes: vec![Node::new(root_name.into())],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Total nodes in the arena, including detached ones
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.node(id).name
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node(id).text.as_deref()
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).attributes.get(name).map(String::as_str)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        !self.node(id).children.is_empty()
    }

    /// A leaf holds scalar text and no element children
    pub fn is_leaf(&self, id: NodeId) -> bool {
        let node = self.node(id);
        node.children.is_empty() && node.text.is_some()
    }

    /// An empty node has neither children nor text, like `<PONum/>`
    pub fn is_empty(&self, id: NodeId) -> bool {
        let node = self.node(id);
        node.children.is_empty() && node.text.is_none()
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(name.into()));
        id
    }

    /// Create a detached element holding `text`
    pub fn create_leaf(&mut self, name: impl Into<String>, text: impl Into<String>) -> NodeId {
        let id = self.create_element(name);
        self.set_text(id, text);
        id
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) {
        self.node_mut(id).name = name.into();
    }

    /// Set the text content; an empty string clears it
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        let text = text.into();
        self.node_mut(id).text = if text.is_empty() { None } else { Some(text) };
    }

    pub fn set_attribute(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        self.node_mut(id).attributes.insert(name.into(), value.into());
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    /// Insert `child` right before `reference` in `parent`'s children
    ///
    /// Falls back to appending when `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.detach(child);
        let position = self
            .node(parent)
            .children
            .iter()
            .position(|&c| c == reference);
        self.node_mut(child).parent = Some(parent);
        let children = &mut self.node_mut(parent).children;
        match position {
            Some(pos) => children.insert(pos, child),
            None => children.push(child),
        }
    }

    /// Unlink a node from its parent. The root cannot be detached.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.node_mut(parent).children.retain(|&c| c != id);
            self.node_mut(id).parent = None;
        }
    }

    /// Convenience for building trees: append a new element under `parent`
    pub fn append_element(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let id = self.create_element(name);
        self.append_child(parent, id);
        id
    }

    /// Convenience for building trees: append a new leaf under `parent`
    pub fn append_leaf(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> NodeId {
        let id = self.create_leaf(name, text);
        self.append_child(parent, id);
        id
    }

    /// Copy a subtree; the copy is detached
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let source = self.node(id).clone();
        let copy = self.create_element(source.name);
        {
            let node = self.node_mut(copy);
            node.text = source.text;
            node.attributes = source.attributes;
        }
        for child in source.children {
            let child_copy = self.deep_copy(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Concatenated text of the node and all of its descendants
    pub fn inner_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        if let Some(text) = &node.text {
            out.push_str(text);
        }
        for &child in &node.children {
            self.collect_text(child, out);
        }
    }

    /// Depth from the root, which sits at depth 1
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 1;
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.node(parent).parent;
        }
        depth
    }

    /// Whether `ancestor` is a strict ancestor of `node`
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.node(node).parent;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.node(parent).parent;
        }
        false
    }

    /// Whether `node` is `ancestor` itself or lives inside it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.is_ancestor(ancestor, node)
    }

    /// Siblings before `id`, nearest first
    pub fn previous_siblings(&self, id: NodeId) -> Vec<NodeId> {
        match self.sibling_position(id) {
            Some((parent, pos)) => self.children(parent)[..pos].iter().rev().copied().collect(),
            None => Vec::new(),
        }
    }

    /// Siblings after `id`, nearest first
    pub fn next_siblings(&self, id: NodeId) -> Vec<NodeId> {
        match self.sibling_position(id) {
            Some((parent, pos)) => self.children(parent)[pos + 1..].to_vec(),
            None => Vec::new(),
        }
    }

    fn sibling_position(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.node(id).parent?;
        let pos = self.children(parent).iter().position(|&c| c == id)?;
        Some((parent, pos))
    }

    /// Descendants of `id` in document order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Every attached node in document order, root first
    pub fn document_order(&self) -> Vec<NodeId> {
        let mut out = vec![self.root];
        out.extend(self.descendants(self.root));
        out
    }

    /// All attached elements called `name`, root included, in document order
    pub fn elements_by_name(&self, name: &str) -> Vec<NodeId> {
        self.document_order()
            .into_iter()
            .filter(|&id| self.name(id) == name)
            .collect()
    }
}
