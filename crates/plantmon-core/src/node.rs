//! Hierarchy node types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered metric name → value map.
///
/// Backed by `serde_json::Map` with `preserve_order`, so metrics keep the
/// order they were authored in.
pub type MetricMap = Map<String, Value>;

/// Node type (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Company,
    Location,
    Building,
    Sensor,
    Dashboard,
    #[serde(rename = "planthead")]
    PlantHead,
    Data,
}

impl NodeType {
    /// Wire name, as used in JSON and topic rules.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Location => "location",
            Self::Building => "building",
            Self::Sensor => "sensor",
            Self::Dashboard => "dashboard",
            Self::PlantHead => "planthead",
            Self::Data => "data",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    Offline,
    Warning,
}

impl NodeStatus {
    /// Capitalized label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::Offline => "Offline",
            Self::Warning => "Warning",
        }
    }
}

/// Static detail block attached to a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-text last activity ("Active now", "2 minutes ago").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<String>,
    #[serde(default)]
    pub metrics: MetricMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A node in the organizational hierarchy.
///
/// Children are owned exclusively by their parent, so the tree is acyclic by
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Live-data topic, e.g. `EcoTech/London/LDN-A12/TEMPERATURE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default)]
    pub children: Vec<HierarchyNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<NodeDetails>,
}

impl HierarchyNode {
    /// Create a bare node with no topic, children or details.
    pub fn new(id: impl Into<String>, name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type,
            topic: None,
            children: Vec::new(),
            details: None,
        }
    }

    /// Builder: set the live-data topic.
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Builder: append a child.
    #[must_use]
    pub fn with_child(mut self, child: HierarchyNode) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: set the detail block.
    #[must_use]
    pub fn with_details(mut self, details: NodeDetails) -> Self {
        self.details = Some(details);
        self
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn status(&self) -> Option<NodeStatus> {
        self.details.as_ref().and_then(|d| d.status)
    }

    /// Static metrics, empty if the node has no detail block.
    pub fn static_metrics(&self) -> Option<&MetricMap> {
        self.details.as_ref().map(|d| &d.metrics)
    }

    /// Last slash-delimited segment of the topic (`TEMPERATURE` for
    /// `EcoTech/London/LDN-A12/TEMPERATURE`).
    pub fn topic_suffix(&self) -> Option<&str> {
        self.topic
            .as_deref()
            .and_then(|t| t.rsplit('/').next())
            .filter(|s| !s.is_empty())
    }
}
