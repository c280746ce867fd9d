use crate::tree::{Document, NodeId};
use indexmap::IndexMap;

/// Copy scalar siblings of `node` into every same-named sibling of `node`
///
/// Previous siblings are scanned nearest first, then next siblings. The
/// first leaf met for each name is collected unless its name matches
/// `node`'s or appears in `exclude`. Each node under the same parent that
/// shares `node`'s name receives one copy of every collected leaf, and the
/// originals are removed. Returns the number of merged leaves.
pub fn merge_siblings(doc: &mut Document, node: NodeId, exclude: &[&str]) -> usize {
    let Some(parent) = doc.parent(node) else {
        return 0;
    };
    let node_name = doc.name(node).to_string();

    let mut collected: IndexMap<String, NodeId> = IndexMap::new();
    let siblings = doc
        .previous_siblings(node)
        .into_iter()
        .chain(doc.next_siblings(node));

    for sibling in siblings {
        let name = doc.name(sibling);
        if name != node_name
            && !exclude.iter().any(|excluded| *excluded == name)
            && doc.is_leaf(sibling)
            && !collected.contains_key(name)
        {
            collected.insert(name.to_string(), sibling);
        }
    }

    if collected.is_empty() {
        return 0;
    }

    let targets: Vec<NodeId> = doc
        .children(parent)
        .iter()
        .copied()
        .filter(|&child| doc.name(child) == node_name)
        .collect();

    for target in targets {
        for &leaf in collected.values() {
            let copy = doc.deep_copy(leaf);
            doc.append_child(target, copy);
        }
    }

    for &leaf in collected.values() {
        doc.detach(leaf);
    }

    collected.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(doc: &Document, id: NodeId) -> Vec<(String, String)> {
        doc.children(id)
            .iter()
            .map(|&c| (doc.name(c).to_string(), doc.inner_text(c)))
            .collect()
    }

    #[test]
    fn test_merges_into_every_same_named_sibling() {
        let mut doc = Document::new("root");
        let root = doc.root();
        doc.append_leaf(root, "currency", "USD");
        let first = doc.append_element(root, "order");
        doc.append_leaf(first, "no", "1");
        doc.append_leaf(root, "region", "EU");
        let second = doc.append_element(root, "order");
        doc.append_leaf(second, "no", "2");

        let merged = merge_siblings(&mut doc, first, &[]);
        assert_eq!(merged, 2);

        let expected_tail = vec![
            ("currency".to_string(), "USD".to_string()),
            ("region".to_string(), "EU".to_string()),
        ];
        assert_eq!(texts(&doc, first)[1..], expected_tail[..]);
        assert_eq!(texts(&doc, second)[1..], expected_tail[..]);

        // Originals are gone from the parent
        assert_eq!(doc.children(root), &[first, second]);
    }

    #[test]
    fn test_first_instance_per_name_and_exclusions() {
        let mut doc = Document::new("root");
        let root = doc.root();
        doc.append_leaf(root, "note", "far");
        doc.append_leaf(root, "note", "near");
        doc.append_leaf(root, "order_item", "skip");
        let order = doc.append_element(root, "order");
        doc.append_leaf(order, "no", "1");
        doc.append_leaf(root, "note", "after");
        doc.append_element(root, "structured");

        let merged = merge_siblings(&mut doc, order, &["order_item"]);
        assert_eq!(merged, 1);

        // Nearest previous sibling wins
        let fields = texts(&doc, order);
        assert_eq!(fields.last().unwrap(), &("note".to_string(), "near".to_string()));

        // Excluded, duplicate and structured siblings stay in place
        let remaining: Vec<&str> = doc.children(root).iter().map(|&c| doc.name(c)).collect();
        assert_eq!(remaining, vec!["note", "order_item", "order", "note", "structured"]);
    }

    #[test]
    fn test_root_and_lonely_nodes_are_untouched() {
        let mut doc = Document::new("root");
        let root = doc.root();
        let order = doc.append_element(root, "order");
        doc.append_leaf(order, "no", "1");

        assert_eq!(merge_siblings(&mut doc, root, &[]), 0);
        assert_eq!(merge_siblings(&mut doc, order, &[]), 0);
        assert_eq!(doc.children(order).len(), 1);
    }
}
