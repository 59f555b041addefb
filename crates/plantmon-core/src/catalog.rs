//! Built-in hierarchy shipped with the binary.

use crate::error::Result;
use crate::tree::Hierarchy;

const BUILTIN_HIERARCHY: &str = include_str!("../data/hierarchy.json");

/// The EcoTech Solutions hierarchy bundled at build time.
pub fn builtin_hierarchy() -> Result<Hierarchy> {
    Hierarchy::from_json(BUILTIN_HIERARCHY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeType;

    #[test]
    fn test_builtin_loads() {
        let tree = builtin_hierarchy().unwrap();
        assert_eq!(tree.root().id, "company-1");
        assert_eq!(tree.root().node_type, NodeType::Company);
        assert_eq!(tree.root().children.len(), 4);
        assert_eq!(tree.len(), 16);
    }

    #[test]
    fn test_builtin_sensor_topics() {
        let tree = builtin_hierarchy().unwrap();
        let topics = tree.topics();
        assert!(topics.contains(&("sensor-1", "EcoTech/London/LDN-A12/TEMPERATURE")));
        assert!(topics.contains(&("sensor-3", "EcoTech/London/LDN-B45/ENVIRONMENT")));
        // company and locations carry no topic
        assert!(tree.root().topic.is_none());
        assert!(tree.find("location-1").unwrap().topic.is_none());
    }
}
