//! Presentation lookups per node type.

use serde::Serialize;

use crate::node::NodeType;

/// Label, icon and accent color for a node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeStyle {
    pub label: &'static str,
    /// lucide icon name.
    pub icon: &'static str,
    /// CSS color used for accents and gradients.
    pub color: &'static str,
}

impl NodeStyle {
    pub fn for_type(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Company => Self {
                label: "Company",
                icon: "building-2",
                color: "#2563eb",
            },
            NodeType::Location => Self {
                label: "Location",
                icon: "globe",
                color: "#4f46e5",
            },
            NodeType::Building => Self {
                label: "Building",
                icon: "building",
                color: "#9333ea",
            },
            NodeType::Sensor => Self {
                label: "Sensor Network",
                icon: "cpu",
                color: "#16a34a",
            },
            NodeType::Dashboard => Self {
                label: "Dashboard",
                icon: "layout-dashboard",
                color: "#ea580c",
            },
            NodeType::PlantHead => Self {
                label: "Plant Health",
                icon: "flower-2",
                color: "#059669",
            },
            NodeType::Data => Self {
                label: "Data",
                icon: "database",
                color: "#4b5563",
            },
        }
    }
}

/// "1 Child" / "3 Children".
pub fn children_label(count: usize) -> String {
    if count == 1 {
        "1 Child".to_string()
    } else {
        format!("{count} Children")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(NodeStyle::for_type(NodeType::Sensor).label, "Sensor Network");
        assert_eq!(NodeStyle::for_type(NodeType::PlantHead).label, "Plant Health");
        assert_eq!(NodeStyle::for_type(NodeType::Data).icon, "database");
    }

    #[test]
    fn test_children_label() {
        assert_eq!(children_label(1), "1 Child");
        assert_eq!(children_label(0), "0 Children");
        assert_eq!(children_label(4), "4 Children");
    }
}
