//! Node promotion
//!
//! Lifts a repeat instance one level at a time until it is a direct child of
//! the document root. At every level the parent's scalar context is handed
//! to the instance and the instance is renamed `parent_instance`.

use crate::flatten::children::flatten_children;
use crate::flatten::instances::RepeatInstances;
use crate::flatten::siblings::merge_siblings;
use crate::flatten::types::FlattenConfig;
use crate::tree::{Document, NodeId};
use tracing::trace;

pub struct NodePromoter<'a> {
    config: &'a FlattenConfig,
    instances: RepeatInstances,
}

impl<'a> NodePromoter<'a> {
    pub fn new(config: &'a FlattenConfig, instances: RepeatInstances) -> Self {
        NodePromoter { config, instances }
    }

    pub fn instances(&self) -> &RepeatInstances {
        &self.instances
    }

    pub fn into_instances(self) -> RepeatInstances {
        self.instances
    }

    /// Promote `target` until its parent is the root; returns the number of
    /// levels climbed
    pub fn promote(&mut self, doc: &mut Document, target: NodeId) -> usize {
        let root = doc.root();
        let mut levels = 0;

        while let Some(parent) = doc.parent(target) {
            if parent == root {
                break;
            }
            let Some(grandparent) = doc.parent(parent) else {
                break;
            };
            self.promote_one_level(doc, target, parent, grandparent);
            levels += 1;
        }

        self.instances.finish(doc, target);
        levels
    }

    fn promote_one_level(&mut self, doc: &mut Document, target: NodeId, parent: NodeId, grandparent: NodeId) {
        let target_name = doc.name(target).to_string();
        let parent_name = doc.name(parent).to_string();
        let promoted_name = self.config.promoted_name(&parent_name, &target_name);

        // Scalar siblings of the parent go to every parent of the same name,
        // unless some instance under the grandparent would miss them
        if self.pending_share_parent_name(doc, parent, grandparent) {
            merge_siblings(doc, parent, &[promoted_name.as_str()]);
        }

        let excluded = self.config.name_parts(&target_name);
        let instances = &self.instances;
        flatten_children(
            doc,
            parent,
            &excluded,
            &|id: NodeId| instances.holds_row(id),
            self.config,
        );

        // Context stays in the parent while other instances still need it;
        // the last instance through takes the originals
        let shared = self.instances.pending_below(parent) > 1;

        for child in doc.children(parent).to_vec() {
            if child == target || self.instances.is_row(child) {
                continue;
            }
            if doc.is_leaf(child) || doc.is_empty(child) {
                if shared {
                    let copy = doc.deep_copy(child);
                    doc.append_child(target, copy);
                } else {
                    doc.append_child(target, child);
                }
            }
        }

        trace!(from = %parent_name, to = %promoted_name, shared, "promoted node");

        doc.set_name(target, promoted_name);
        doc.insert_before(grandparent, target, parent);
        self.instances.moved_up(parent);

        if doc.is_empty(parent) {
            doc.detach(parent);
        }
    }

    /// Whether every instance still waiting to be promoted under
    /// `grandparent` lives inside a child named like `parent`
    fn pending_share_parent_name(&self, doc: &Document, parent: NodeId, grandparent: NodeId) -> bool {
        let parent_name = doc.name(parent);
        let inside: usize = doc
            .children(grandparent)
            .iter()
            .filter(|&&sibling| doc.name(sibling) == parent_name)
            .map(|&sibling| self.instances.pending_within(sibling))
            .sum();
        inside == self.instances.pending_below(grandparent)
    }
}
