use crate::error::KilnError;
use crate::flatten::children::flatten_children;
use crate::flatten::detector::detect;
use crate::flatten::instances::RepeatInstances;
use crate::flatten::promoter::NodePromoter;
use crate::flatten::types::FlattenConfig;
use crate::records::RecordSet;
use crate::tree::{Document, NodeId};
use tracing::debug;

/// Turns a nested document into one whose root children are the records
pub struct Flattener {
    config: FlattenConfig,
}

impl Flattener {
    pub fn new(config: FlattenConfig) -> Self {
        Flattener { config }
    }

    pub fn config(&self) -> &FlattenConfig {
        &self.config
    }

    /// Flatten `doc` around the nodes found by `selector`
    ///
    /// Every repeat instance ends up as a direct child of the root carrying
    /// the scalar context of its ancestors and their siblings. Root children
    /// that are not rows are folded into every row and removed.
    pub fn flatten(&self, mut doc: Document, selector: Option<&str>) -> Result<Document, KilnError> {
        self.config.validate()?;

        let selection = detect(&doc, selector)?;
        let instances = RepeatInstances::new(&doc, selection.nodes);
        let rows = instances.rows().to_vec();

        let mut promoter = NodePromoter::new(&self.config, instances);
        let mut levels = 0;
        for &row in &rows {
            let instances = promoter.instances();
            flatten_children(
                &mut doc,
                row,
                &[],
                &|id: NodeId| instances.holds_row(id),
                &self.config,
            );
            levels += promoter.promote(&mut doc, row);
        }

        let folded = self.fold_root_context(&mut doc, &promoter.into_instances());

        debug!(
            repeat = %selection.name,
            source = ?selection.source,
            rows = rows.len(),
            levels,
            folded,
            "flattened document"
        );

        Ok(doc)
    }

    /// Flatten and project the rows into a record set
    pub fn flatten_to_records(&self, doc: Document, selector: Option<&str>) -> Result<RecordSet, KilnError> {
        let flat = self.flatten(doc, selector)?;
        RecordSet::from_document(&flat, None, self.config.collision_policy)
    }

    /// Move root-level context into every row
    ///
    /// Leaves become `base-name`, structured nodes become one `name-child`
    /// leaf per child. Empty nodes carry nothing and are dropped. Nodes named
    /// after any row's original name are left alone.
    fn fold_root_context(&self, doc: &mut Document, instances: &RepeatInstances) -> usize {
        let root = doc.root();
        let rows = instances.rows();
        let context: Vec<NodeId> = doc
            .children(root)
            .iter()
            .copied()
            .filter(|&child| !instances.is_row(child))
            .filter(|&child| {
                !instances
                    .names()
                    .iter()
                    .any(|name| self.config.is_related(doc.name(child), name))
            })
            .collect();

        let mut folded = 0;
        for node in context {
            if doc.is_leaf(node) {
                let name = self.config.base_name(doc.name(node));
                let value = doc.inner_text(node);
                for &row in rows {
                    doc.append_leaf(row, name.as_str(), value.as_str());
                }
            } else if doc.has_children(node) {
                flatten_children(doc, node, &[], &|_: NodeId| false, &self.config);

                let prefix = doc.name(node).to_string();
                let fields: Vec<(String, String)> = doc
                    .children(node)
                    .iter()
                    .map(|&child| {
                        (
                            self.config.lateral_name(&prefix, doc.name(child)),
                            doc.inner_text(child),
                        )
                    })
                    .collect();

                for &row in rows {
                    for (name, value) in &fields {
                        doc.append_leaf(row, name.as_str(), value.as_str());
                    }
                }
            }

            doc.detach(node);
            folded += 1;
        }

        folded
    }
}

impl Default for Flattener {
    fn default() -> Self {
        Flattener::new(FlattenConfig::default())
    }
}
