//! Structural path selectors
//!
//! A small XPath-like subset:
//!
//! - `item` - children of the root element named `item`
//! - `orders/order` - nested child steps from the root element
//! - `/root/item` - absolute path, the first step matches the root itself
//! - `//item`, `orders//sku` - descendant steps
//! - `*` - any element name
//! - `item[2]` - 1-based position among each context node's matches

use crate::error::KilnError;
use crate::tree::{Document, NodeId};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static STEP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\*|[^\s/\[\]*]+)(?:\[([1-9][0-9]*)\])?$").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NameTest,
    position: Option<usize>,
}

impl Step {
    fn matches(&self, doc: &Document, id: NodeId) -> bool {
        match &self.test {
            NameTest::Any => true,
            NameTest::Name(name) => doc.name(id) == name,
        }
    }

    /// Apply the name test and position predicate to one context's candidates
    fn filter(&self, doc: &Document, candidates: Vec<NodeId>) -> Vec<NodeId> {
        let matched = candidates.into_iter().filter(|&id| self.matches(doc, id));
        match self.position {
            Some(pos) => matched.skip(pos - 1).take(1).collect(),
            None => matched.collect(),
        }
    }
}

/// A parsed structural path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSelector {
    absolute: bool,
    steps: Vec<Step>,
}

impl PathSelector {
    pub fn parse(selector: &str) -> Result<Self, KilnError> {
        let invalid = |reason: &str| KilnError::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = selector.trim();
        if trimmed.is_empty() {
            return Err(invalid("selector is empty"));
        }

        let (absolute, mut axis, rest) = if let Some(rest) = trimmed.strip_prefix("//") {
            (true, Axis::Descendant, rest)
        } else if let Some(rest) = trimmed.strip_prefix('/') {
            (true, Axis::Child, rest)
        } else {
            (false, Axis::Child, trimmed)
        };

        let parts: Vec<&str> = rest.split('/').collect();
        let mut steps = Vec::with_capacity(parts.len());

        for (idx, part) in parts.iter().enumerate() {
            if part.is_empty() {
                if axis == Axis::Descendant || idx == parts.len() - 1 {
                    return Err(invalid("empty path step"));
                }
                axis = Axis::Descendant;
                continue;
            }

            let caps = STEP_REGEX
                .captures(part)
                .ok_or_else(|| invalid(&format!("malformed step '{}'", part)))?;

            let test = match &caps[1] {
                "*" => NameTest::Any,
                name => NameTest::Name(name.to_string()),
            };
            let position = caps
                .get(2)
                .map(|m| m.as_str().parse::<usize>())
                .transpose()
                .map_err(|_| invalid("position predicate is out of range"))?;

            steps.push(Step { axis, test, position });
            axis = Axis::Child;
        }

        if steps.is_empty() {
            return Err(invalid("selector has no steps"));
        }

        Ok(PathSelector { absolute, steps })
    }

    /// The element name when the selector is a single plain name
    pub fn bare_name(&self) -> Option<&str> {
        match self.steps.as_slice() {
            [Step {
                axis: Axis::Child,
                test: NameTest::Name(name),
                position: None,
            }] if !self.absolute => Some(name.as_str()),
            _ => None,
        }
    }

    /// Evaluate against a document, returning matches in document order
    pub fn select(&self, doc: &Document) -> Vec<NodeId> {
        let order = doc.document_order();
        let rank: HashMap<NodeId, usize> = order
            .iter()
            .enumerate()
            .map(|(idx, &id)| (id, idx))
            .collect();

        let mut current: Vec<NodeId> = Vec::new();

        for (idx, step) in self.steps.iter().enumerate() {
            let mut next = Vec::new();

            if idx == 0 && self.absolute {
                let candidates = match step.axis {
                    Axis::Child => vec![doc.root()],
                    Axis::Descendant => order.clone(),
                };
                next.extend(step.filter(doc, candidates));
            } else {
                let contexts = if idx == 0 {
                    vec![doc.root()]
                } else {
                    std::mem::take(&mut current)
                };
                for context in contexts {
                    let candidates = match step.axis {
                        Axis::Child => doc.children(context).to_vec(),
                        Axis::Descendant => doc.descendants(context),
                    };
                    next.extend(step.filter(doc, candidates));
                }
            }

            next.sort_by_key(|id| rank.get(id).copied().unwrap_or(usize::MAX));
            next.dedup();
            current = next;

            if current.is_empty() {
                break;
            }
        }

        current
    }
}
