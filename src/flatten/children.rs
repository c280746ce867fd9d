use crate::flatten::types::FlattenConfig;
use crate::tree::{Document, NodeId};

/// Collapse the descendant structure of `container` into direct leaves
///
/// Every structured child `C` is flattened recursively and then replaced in
/// place by its children renamed `C-child`. Children whose name shares a
/// component (split on the vertical separator) with `excluded_names` are
/// left alone at the top level, as is any child for which `is_protected`
/// holds (a repeat instance, or a node with one below it). Returns the number
/// of collapsed containers.
pub fn flatten_children<P>(
    doc: &mut Document,
    container: NodeId,
    excluded_names: &[&str],
    is_protected: &P,
    config: &FlattenConfig,
) -> usize
where
    P: Fn(NodeId) -> bool,
{
    let candidates: Vec<NodeId> = doc
        .children(container)
        .iter()
        .copied()
        .filter(|&child| {
            doc.has_children(child)
                && !config
                    .name_parts(doc.name(child))
                    .iter()
                    .any(|part| excluded_names.iter().any(|excluded| excluded == part))
                && !is_protected(child)
        })
        .collect();

    let mut collapsed = 0;
    for child in candidates {
        collapsed += flatten_children(doc, child, &[], is_protected, config);

        let prefix = doc.name(child).to_string();
        for grandchild in doc.children(child).to_vec() {
            let name = config.lateral_name(&prefix, doc.name(grandchild));
            doc.set_name(grandchild, name);
            doc.insert_before(container, grandchild, child);
        }
        doc.detach(child);
        collapsed += 1;
    }

    collapsed
}
