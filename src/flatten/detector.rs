//! Repeated node detection
//!
//! Resolves which nodes become one record each. An explicit selector is tried
//! first as a structural path, then as a bare tag name. Failing both, the
//! repeating unit is inferred in two phases: a collection pass accumulates a
//! frequency table of `(name, depth)` pairs, then a selection pass picks the
//! most repeated pair from the finished table.

use crate::error::KilnError;
use crate::flatten::selector::PathSelector;
use crate::tree::{Document, NodeId};
use indexmap::IndexMap;
use tracing::debug;

/// How the repeat nodes were located
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    Path,
    TagName,
    Inferred,
}

/// The nodes that will each become one record
#[derive(Debug, Clone)]
pub struct Selection {
    /// Effective element name of the repeat nodes
    pub name: String,
    pub nodes: Vec<NodeId>,
    pub source: SelectionSource,
}

/// A winning entry of the frequency table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatCandidate<'a> {
    pub name: &'a str,
    pub depth: usize,
    pub count: usize,
}

/// Occurrences of structured nodes keyed by `(name, depth)`, in the order
/// the keys were first met
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    entries: IndexMap<(String, usize), usize>,
}

impl FrequencyTable {
    /// Count every non-root node that has at least one element child
    pub fn collect(doc: &Document) -> Self {
        let mut entries = IndexMap::new();
        for &child in doc.children(doc.root()) {
            Self::walk(doc, child, 2, &mut entries);
        }
        FrequencyTable { entries }
    }

    fn walk(doc: &Document, id: NodeId, depth: usize, entries: &mut IndexMap<(String, usize), usize>) {
        if !doc.has_children(id) {
            return;
        }
        *entries.entry((doc.name(id).to_string(), depth)).or_insert(0) += 1;
        for &child in doc.children(id) {
            Self::walk(doc, child, depth + 1, entries);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn count(&self, name: &str, depth: usize) -> usize {
        self.entries
            .get(&(name.to_string(), depth))
            .copied()
            .unwrap_or(0)
    }

    /// Highest count wins; equal counts prefer the deeper key, then the key
    /// met first
    pub fn most_repeated(&self) -> Option<RepeatCandidate<'_>> {
        let mut best: Option<RepeatCandidate<'_>> = None;
        for ((name, depth), &count) in &self.entries {
            let candidate = RepeatCandidate {
                name: name.as_str(),
                depth: *depth,
                count,
            };
            best = match best {
                Some(current)
                    if count < current.count
                        || (count == current.count && *depth <= current.depth) =>
                {
                    Some(current)
                }
                _ => Some(candidate),
            };
        }
        best
    }
}

/// Locate the repeat nodes for `selector`, inferring them when needed
pub fn detect(doc: &Document, selector: Option<&str>) -> Result<Selection, KilnError> {
    let selector = selector.map(str::trim).filter(|s| !s.is_empty());

    if let Some(selector) = selector {
        let path = PathSelector::parse(selector)?;

        let nodes = without_root(doc, path.select(doc));
        if let Some(&first) = nodes.first() {
            debug!(selector, matches = nodes.len(), "repeat nodes located by path");
            return Ok(Selection {
                name: doc.name(first).to_string(),
                nodes,
                source: SelectionSource::Path,
            });
        }

        if let Some(name) = path.bare_name() {
            let nodes = by_tag_name(doc, name);
            if !nodes.is_empty() {
                debug!(selector, matches = nodes.len(), "repeat nodes located by tag name");
                return Ok(Selection {
                    name: name.to_string(),
                    nodes,
                    source: SelectionSource::TagName,
                });
            }
        }
    }

    let table = FrequencyTable::collect(doc);
    let candidate = table.most_repeated().ok_or(KilnError::StructureNotFound)?;
    debug!(
        name = candidate.name,
        depth = candidate.depth,
        count = candidate.count,
        "inferred repeat node"
    );

    let nodes = by_tag_name(doc, candidate.name);
    if nodes.is_empty() {
        return Err(KilnError::StructureNotFound);
    }

    Ok(Selection {
        name: candidate.name.to_string(),
        nodes,
        source: SelectionSource::Inferred,
    })
}

fn by_tag_name(doc: &Document, name: &str) -> Vec<NodeId> {
    without_root(doc, doc.elements_by_name(name))
}

fn without_root(doc: &Document, nodes: Vec<NodeId>) -> Vec<NodeId> {
    let root = doc.root();
    nodes.into_iter().filter(|&id| id != root).collect()
}
