//! Lexical containment for flat node lists.
//!
//! Query captures come back as a flat list. Parents are recovered from byte
//! ranges: the nearest preceding node whose range strictly contains a node is
//! its parent.

use crate::types::{Node, NodeKind};
use std::collections::HashMap;

/// Assign `parent_id` / `children_ids` from byte ranges.
///
/// Nodes are reordered by `(start_byte, end_byte descending)` so that an
/// enclosing node always precedes the nodes it contains, even when both
/// start at the same byte. Nodes without byte offsets get no parent.
pub fn build_hierarchy(nodes: &mut Vec<Node>) {
    nodes.sort_by(|a, b| {
        let ka = (a.location.start_byte, std::cmp::Reverse(a.location.end_byte));
        let kb = (b.location.start_byte, std::cmp::Reverse(b.location.end_byte));
        ka.cmp(&kb)
    });

    for node in nodes.iter_mut() {
        node.parent_id = None;
        node.children_ids.clear();
    }

    for i in 0..nodes.len() {
        if nodes[i].location.start_byte.is_none() {
            continue;
        }
        let parent = (0..i)
            .rev()
            .find(|&j| nodes[j].location.strictly_contains_bytes(&nodes[i].location));
        if let Some(j) = parent {
            nodes[i].parent_id = Some(nodes[j].id.clone());
        }
    }

    link_children(nodes);
}

/// Fill `children_ids` from `parent_id`, in node order.
pub fn link_children(nodes: &mut [Node]) {
    let index: HashMap<String, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.clone(), i))
        .collect();
    let links: Vec<(usize, String)> = nodes
        .iter()
        .filter_map(|n| {
            let parent = n.parent_id.as_ref()?;
            Some((*index.get(parent)?, n.id.clone()))
        })
        .collect();
    for (parent, child) in links {
        if !nodes[parent].children_ids.contains(&child) {
            nodes[parent].children_ids.push(child);
        }
    }
}

const CONSTRUCTOR_NAMES: &[&str] = &["__init__", "constructor"];

/// Functions owned by a class-like node become methods or constructors.
pub fn refine_member_kinds(nodes: &mut [Node]) {
    let kinds: HashMap<String, NodeKind> =
        nodes.iter().map(|n| (n.id.clone(), n.kind)).collect();
    for node in nodes.iter_mut() {
        if !matches!(node.kind, NodeKind::Function | NodeKind::Method) {
            continue;
        }
        let owner = node.parent_id.as_ref().and_then(|p| kinds.get(p));
        if !owner.is_some_and(|k| k.is_class_like()) {
            continue;
        }
        node.kind = if node.name().is_some_and(|n| CONSTRUCTOR_NAMES.contains(&n)) {
            NodeKind::Constructor
        } else {
            NodeKind::Method
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Language, SourceLocation};

    fn node(id: &str, kind: NodeKind, name: &str, start: usize, end: usize) -> Node {
        Node::new(
            id.to_string(),
            kind,
            Some(name.to_string()),
            Language::Python,
            SourceLocation::new("a.py", 1, 0, 1, 0).with_bytes(start, end),
        )
    }

    #[test]
    fn test_nearest_strictly_containing_range_wins() {
        let mut nodes = vec![
            node("n3", NodeKind::Function, "c", 20, 30),
            node("n1", NodeKind::Class, "a", 0, 100),
            node("n2", NodeKind::Function, "b", 10, 50),
        ];
        build_hierarchy(&mut nodes);

        let by_id: HashMap<_, _> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        assert_eq!(by_id["n1"].parent_id, None);
        assert_eq!(by_id["n2"].parent_id.as_deref(), Some("n1"));
        assert_eq!(by_id["n3"].parent_id.as_deref(), Some("n2"));
        assert_eq!(by_id["n1"].children_ids, vec!["n2".to_string()]);
        assert_eq!(by_id["n2"].children_ids, vec!["n3".to_string()]);
    }

    #[test]
    fn test_shared_start_byte() {
        let mut nodes = vec![
            node("inner", NodeKind::Function, "f", 0, 50),
            node("outer", NodeKind::Module, "m", 0, 100),
        ];
        build_hierarchy(&mut nodes);
        assert_eq!(nodes[0].id, "outer");
        assert_eq!(nodes[1].parent_id.as_deref(), Some("outer"));
    }

    #[test]
    fn test_identical_ranges_are_not_parents() {
        let mut nodes = vec![
            node("a", NodeKind::Variable, "x", 5, 9),
            node("b", NodeKind::Export, "x", 5, 9),
        ];
        build_hierarchy(&mut nodes);
        assert!(nodes.iter().all(|n| n.parent_id.is_none()));
    }

    #[test]
    fn test_sibling_after_nested_child() {
        let mut nodes = vec![
            node("a", NodeKind::Class, "A", 0, 100),
            node("b", NodeKind::Function, "b", 10, 50),
            node("c", NodeKind::Variable, "c", 20, 30),
            node("d", NodeKind::Function, "d", 60, 70),
        ];
        build_hierarchy(&mut nodes);
        assert_eq!(nodes[3].parent_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_refine_member_kinds() {
        let mut nodes = vec![
            node("c", NodeKind::Class, "Service", 0, 100),
            node("i", NodeKind::Function, "__init__", 10, 20),
            node("m", NodeKind::Function, "run", 30, 40),
            node("f", NodeKind::Function, "free", 200, 210),
        ];
        build_hierarchy(&mut nodes);
        refine_member_kinds(&mut nodes);
        let kinds: HashMap<_, _> = nodes.iter().map(|n| (n.id.as_str(), n.kind)).collect();
        assert_eq!(kinds["i"], NodeKind::Constructor);
        assert_eq!(kinds["m"], NodeKind::Method);
        assert_eq!(kinds["f"], NodeKind::Function);
    }
}
