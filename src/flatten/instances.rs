use crate::tree::{Document, NodeId};

/// The repeat instances of one flatten call and where they still sit
///
/// Counters are indexed by arena slot and answer "does this subtree hold an
/// instance" without walking the instance list. Nodes created after the
/// index was built (copies, collapsed leaves) never hold an instance.
#[derive(Debug, Clone)]
pub struct RepeatInstances {
    rows: Vec<NodeId>,
    /// Distinct names of the rows before any promotion renamed them
    names: Vec<String>,
    is_row: Vec<bool>,
    pending: Vec<bool>,
    /// Pending rows strictly below each node
    pending_below: Vec<usize>,
}

impl RepeatInstances {
    /// Index `nodes`, keeping only those not nested inside another one
    pub fn new(doc: &Document, nodes: Vec<NodeId>) -> Self {
        let len = doc.arena_len();

        let mut selected = vec![false; len];
        for &node in &nodes {
            selected[node.index()] = true;
        }

        let mut is_row = vec![false; len];
        let mut rows = Vec::with_capacity(nodes.len());
        for node in nodes {
            if is_row[node.index()] || ancestors(doc, node).any(|a| selected[a.index()]) {
                continue;
            }
            is_row[node.index()] = true;
            rows.push(node);
        }

        let mut names: Vec<String> = Vec::new();
        let mut pending_below = vec![0; len];
        for &row in &rows {
            let name = doc.name(row);
            if !names.iter().any(|known| known == name) {
                names.push(name.to_string());
            }
            for ancestor in ancestors(doc, row) {
                pending_below[ancestor.index()] += 1;
            }
        }

        RepeatInstances {
            rows,
            names,
            pending: is_row.clone(),
            is_row,
            pending_below,
        }
    }

    /// Outermost instances in document order
    pub fn rows(&self) -> &[NodeId] {
        &self.rows
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_row(&self, id: NodeId) -> bool {
        self.is_row.get(id.index()).copied().unwrap_or(false)
    }

    pub fn is_pending(&self, id: NodeId) -> bool {
        self.pending.get(id.index()).copied().unwrap_or(false)
    }

    /// Rows still waiting for promotion strictly below `id`
    pub fn pending_below(&self, id: NodeId) -> usize {
        self.pending_below.get(id.index()).copied().unwrap_or(0)
    }

    /// Rows still waiting for promotion in the subtree rooted at `id`
    pub fn pending_within(&self, id: NodeId) -> usize {
        self.pending_below(id) + usize::from(self.is_pending(id))
    }

    /// Whether `id` is a row or has a pending row below it
    pub fn holds_row(&self, id: NodeId) -> bool {
        self.is_row(id) || self.pending_below(id) > 0
    }

    /// A pending row left `from` for `from`'s parent
    pub fn moved_up(&mut self, from: NodeId) {
        if let Some(count) = self.pending_below.get_mut(from.index()) {
            *count = count.saturating_sub(1);
        }
    }

    /// `row` reached its final place
    pub fn finish(&mut self, doc: &Document, row: NodeId) {
        if !self.is_pending(row) {
            return;
        }
        self.pending[row.index()] = false;
        for ancestor in ancestors(doc, row) {
            if let Some(count) = self.pending_below.get_mut(ancestor.index()) {
                *count = count.saturating_sub(1);
            }
        }
    }
}

fn ancestors(doc: &Document, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(doc.parent(node), move |&id| doc.parent(id))
}
