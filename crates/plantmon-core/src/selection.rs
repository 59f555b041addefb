//! Current-node selection.

use crate::node::HierarchyNode;
use crate::tree::Hierarchy;

/// The currently focused node, held by id.
///
/// Replaced wholesale on every interaction; no validation against the tree is
/// performed here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    current: Option<String>,
}

impl Selection {
    /// Selection initialized to the tree root.
    pub fn new(hierarchy: &Hierarchy) -> Self {
        Self {
            current: Some(hierarchy.root().id.clone()),
        }
    }

    /// Empty selection.
    pub fn none() -> Self {
        Self { current: None }
    }

    /// Replace the selection unconditionally.
    pub fn select(&mut self, node: &HierarchyNode) {
        self.current = Some(node.id.clone());
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Selected node id.
    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Resolve the selection against a hierarchy.
    pub fn resolve<'a>(&self, hierarchy: &'a Hierarchy) -> Option<&'a HierarchyNode> {
        self.current.as_deref().and_then(|id| hierarchy.find(id))
    }

    /// Breadcrumb path for the current selection.
    pub fn breadcrumb<'a>(&self, hierarchy: &'a Hierarchy) -> Vec<&'a HierarchyNode> {
        self.current
            .as_deref()
            .and_then(|id| hierarchy.path_to(id))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeType;

    fn tree() -> Hierarchy {
        Hierarchy::new(
            HierarchyNode::new("c", "Company", NodeType::Company).with_child(
                HierarchyNode::new("l", "Location", NodeType::Location)
                    .with_child(HierarchyNode::new("b", "Building", NodeType::Building)),
            ),
        )
        .unwrap()
    }

    #[test]
    fn test_initialized_to_root() {
        let tree = tree();
        let selection = Selection::new(&tree);
        assert_eq!(selection.current_id(), Some("c"));
        assert_eq!(selection.resolve(&tree).map(|n| n.id.as_str()), Some("c"));
    }

    #[test]
    fn test_select_replaces() {
        let tree = tree();
        let mut selection = Selection::new(&tree);
        let building = tree.find("b").unwrap();
        selection.select(building);
        assert_eq!(selection.current_id(), Some("b"));

        let crumbs: Vec<&str> = selection
            .breadcrumb(&tree)
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(crumbs, vec!["Company", "Location", "Building"]);
    }

    #[test]
    fn test_select_foreign_node_is_accepted() {
        let tree = tree();
        let mut selection = Selection::new(&tree);
        let stranger = HierarchyNode::new("x", "Elsewhere", NodeType::Data);
        selection.select(&stranger);
        assert_eq!(selection.current_id(), Some("x"));
        assert!(selection.resolve(&tree).is_none());
        assert!(selection.breadcrumb(&tree).is_empty());
    }

    #[test]
    fn test_clear() {
        let tree = tree();
        let mut selection = Selection::new(&tree);
        selection.clear();
        assert_eq!(selection, Selection::none());
    }
}
