//! Path reconstruction properties over whole trees.
//!
//! For every node in a tree, the breadcrumb path must start at the root, end
//! at the node, contain no duplicate ids and never skip an ancestor.

use std::collections::HashSet;

use plantmon_core::{builtin_hierarchy, Hierarchy, HierarchyNode, NodeType};

fn assert_paths_well_formed(tree: &Hierarchy) {
    for node in tree.iter() {
        let path = tree
            .path_to(&node.id)
            .unwrap_or_else(|| panic!("no path for {}", node.id));

        assert_eq!(path.first().map(|n| n.id.as_str()), Some(tree.root().id.as_str()));
        assert_eq!(path.last().map(|n| n.id.as_str()), Some(node.id.as_str()));

        let unique: HashSet<&str> = path.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(unique.len(), path.len(), "duplicate id in path to {}", node.id);

        for pair in path.windows(2) {
            let (parent, child) = (pair[0], pair[1]);
            assert!(
                parent.children.iter().any(|c| c.id == child.id),
                "{} is not a direct child of {}",
                child.id,
                parent.id
            );
        }
    }
}

/// Build a tree `depth` levels deep with `fanout` children per node.
fn generated(depth: usize, fanout: usize) -> HierarchyNode {
    fn build(prefix: &str, level: usize, depth: usize, fanout: usize) -> HierarchyNode {
        let node_type = match level {
            0 => NodeType::Company,
            1 => NodeType::Location,
            2 => NodeType::Building,
            _ => NodeType::Sensor,
        };
        let mut node = HierarchyNode::new(prefix, format!("Node {prefix}"), node_type);
        if level < depth {
            for i in 0..fanout {
                node = node.with_child(build(&format!("{prefix}.{i}"), level + 1, depth, fanout));
            }
        }
        node
    }
    build("n", 0, depth, fanout)
}

#[test]
fn test_builtin_paths_well_formed() {
    let tree = builtin_hierarchy().expect("builtin hierarchy");
    assert_paths_well_formed(&tree);
}

#[test]
fn test_generated_paths_well_formed() {
    for (depth, fanout) in [(0, 0), (1, 3), (3, 2), (5, 2)] {
        let tree = Hierarchy::new(generated(depth, fanout)).expect("generated hierarchy");
        assert_paths_well_formed(&tree);
    }
}

#[test]
fn test_breadcrumb_for_builtin_sensor() {
    let tree = builtin_hierarchy().expect("builtin hierarchy");
    let names: Vec<&str> = tree
        .path_to("sensor-3")
        .expect("sensor-3 path")
        .iter()
        .map(|n| n.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["EcoTech Solutions", "London", "LDN-B45", "Environment Sensors"]
    );
}

#[test]
fn test_path_absent_for_unknown_id() {
    let tree = builtin_hierarchy().expect("builtin hierarchy");
    assert!(tree.path_to("sensor-99").is_none());
}
