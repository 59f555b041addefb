//! Validated hierarchy and the traversal utilities shared by every consumer.
//!
//! The tree is immutable once built. An id index (id → child-index route from
//! the root) is computed at construction, so lookups do not re-walk the tree.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::node::HierarchyNode;

/// Immutable, id-validated hierarchy.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    root: HierarchyNode,
    /// id → child indices from the root (empty for the root itself).
    routes: HashMap<String, Vec<usize>>,
}

impl Hierarchy {
    /// Build a hierarchy, rejecting empty and duplicate ids.
    pub fn new(root: HierarchyNode) -> Result<Self> {
        let mut routes = HashMap::new();
        let mut route = Vec::new();
        index_node(&root, "", &mut route, &mut routes)?;
        Ok(Self { root, routes })
    }

    /// Parse a hierarchy from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let root: HierarchyNode = serde_json::from_str(json)?;
        Self::new(root)
    }

    /// Load a hierarchy from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn root(&self) -> &HierarchyNode {
        &self.root
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.routes.contains_key(id)
    }

    /// Find a node by id.
    pub fn find(&self, id: &str) -> Option<&HierarchyNode> {
        let route = self.routes.get(id)?;
        let mut node = &self.root;
        for &idx in route {
            node = node.children.get(idx)?;
        }
        Some(node)
    }

    /// Ancestors from the root to `id`, both inclusive.
    ///
    /// Ids are unique, so the first depth-first match in document order is
    /// the only match.
    pub fn path_to(&self, id: &str) -> Option<Vec<&HierarchyNode>> {
        let route = self.routes.get(id)?;
        let mut path = Vec::with_capacity(route.len() + 1);
        let mut node = &self.root;
        path.push(node);
        for &idx in route {
            node = node.children.get(idx)?;
            path.push(node);
        }
        Some(path)
    }

    /// Parent of `id`; `None` for the root or unknown ids.
    pub fn parent_of(&self, id: &str) -> Option<&HierarchyNode> {
        let path = self.path_to(id)?;
        let len = path.len();
        if len < 2 {
            return None;
        }
        Some(path[len - 2])
    }

    /// Depth of `id` (root = 0).
    pub fn depth_of(&self, id: &str) -> Option<usize> {
        self.routes.get(id).map(Vec::len)
    }

    /// Pre-order iterator over all nodes.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder {
            stack: vec![&self.root],
        }
    }

    /// All nodes matching `predicate`, in pre-order.
    pub fn filter<F>(&self, mut predicate: F) -> Vec<&HierarchyNode>
    where
        F: FnMut(&HierarchyNode) -> bool,
    {
        self.iter().filter(|n| predicate(n)).collect()
    }

    /// Case-insensitive substring match on node names. A blank query matches
    /// nothing.
    pub fn search(&self, query: &str) -> Vec<&HierarchyNode> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.filter(|n| n.name.to_lowercase().contains(&needle))
    }

    /// `(node id, topic)` for every node carrying a topic, in pre-order.
    pub fn topics(&self) -> Vec<(&str, &str)> {
        self.iter()
            .filter_map(|n| n.topic.as_deref().map(|t| (n.id.as_str(), t)))
            .collect()
    }
}

fn index_node(
    node: &HierarchyNode,
    parent_id: &str,
    route: &mut Vec<usize>,
    routes: &mut HashMap<String, Vec<usize>>,
) -> Result<()> {
    if node.id.is_empty() {
        return Err(CoreError::EmptyId {
            parent: parent_id.to_string(),
        });
    }
    if routes.insert(node.id.clone(), route.clone()).is_some() {
        return Err(CoreError::DuplicateId(node.id.clone()));
    }
    for (idx, child) in node.children.iter().enumerate() {
        route.push(idx);
        index_node(child, &node.id, route, routes)?;
        route.pop();
    }
    Ok(())
}

/// Pre-order (document order) traversal.
pub struct PreOrder<'a> {
    stack: Vec<&'a HierarchyNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a HierarchyNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeType;

    fn sample() -> HierarchyNode {
        HierarchyNode::new("root", "Root", NodeType::Company)
            .with_child(
                HierarchyNode::new("loc-a", "Alpha", NodeType::Location).with_child(
                    HierarchyNode::new("bld-a1", "Alpha One", NodeType::Building).with_child(
                        HierarchyNode::new("sen-a1", "Temp", NodeType::Sensor)
                            .with_topic("Root/Alpha/One/TEMPERATURE"),
                    ),
                ),
            )
            .with_child(HierarchyNode::new("loc-b", "Beta", NodeType::Location))
    }

    #[test]
    fn test_find_and_len() {
        let tree = Hierarchy::new(sample()).unwrap();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.find("bld-a1").map(|n| n.name.as_str()), Some("Alpha One"));
        assert!(tree.find("missing").is_none());
        assert!(tree.contains("root"));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let root = HierarchyNode::new("root", "Root", NodeType::Company)
            .with_child(HierarchyNode::new("dup", "A", NodeType::Location))
            .with_child(
                HierarchyNode::new("loc", "B", NodeType::Location)
                    .with_child(HierarchyNode::new("dup", "C", NodeType::Building)),
            );
        match Hierarchy::new(root) {
            Err(CoreError::DuplicateId(id)) => assert_eq!(id, "dup"),
            other => panic!("expected DuplicateId, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_id_rejected() {
        let root = HierarchyNode::new("root", "Root", NodeType::Company)
            .with_child(HierarchyNode::new("", "Nameless", NodeType::Location));
        assert!(matches!(
            Hierarchy::new(root),
            Err(CoreError::EmptyId { parent }) if parent == "root"
        ));
    }

    #[test]
    fn test_path_to_root_is_single_element() {
        let tree = Hierarchy::new(sample()).unwrap();
        let path = tree.path_to("root").unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].id, "root");
    }

    #[test]
    fn test_path_to_leaf() {
        let tree = Hierarchy::new(sample()).unwrap();
        let ids: Vec<&str> = tree
            .path_to("sen-a1")
            .unwrap()
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec!["root", "loc-a", "bld-a1", "sen-a1"]);
        assert!(tree.path_to("nope").is_none());
    }

    #[test]
    fn test_parent_and_depth() {
        let tree = Hierarchy::new(sample()).unwrap();
        assert_eq!(tree.parent_of("bld-a1").map(|n| n.id.as_str()), Some("loc-a"));
        assert!(tree.parent_of("root").is_none());
        assert_eq!(tree.depth_of("sen-a1"), Some(3));
        assert_eq!(tree.depth_of("root"), Some(0));
    }

    #[test]
    fn test_iter_is_document_order() {
        let tree = Hierarchy::new(sample()).unwrap();
        let ids: Vec<&str> = tree.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["root", "loc-a", "bld-a1", "sen-a1", "loc-b"]);
    }

    #[test]
    fn test_filter_and_search() {
        let tree = Hierarchy::new(sample()).unwrap();
        let locations = tree.filter(|n| n.node_type == NodeType::Location);
        assert_eq!(locations.len(), 2);

        let hits: Vec<&str> = tree.search("alpha").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(hits, vec!["loc-a", "bld-a1"]);
        assert!(tree.search("   ").is_empty());
    }

    #[test]
    fn test_topics() {
        let tree = Hierarchy::new(sample()).unwrap();
        assert_eq!(tree.topics(), vec![("sen-a1", "Root/Alpha/One/TEMPERATURE")]);
    }
}
