//! Dashboard API types.
//!
//! These types are used for JSON serialization in REST and WebSocket APIs.

use chrono::{DateTime, Utc};
use plantmon_core::style::children_label;
use plantmon_core::{HierarchyNode, MetricMap, NodeStatus, NodeStyle, NodeType};
use plantmon_mqtt::{BrokerConfig, ConnectionState, Notification};
use serde::{Deserialize, Serialize};

/// Compact node description used in search results and child cards.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub style: NodeStyle,
    pub status: Option<NodeStatus>,
    pub topic: Option<String>,
    pub child_count: usize,
    pub children_label: String,
}

impl NodeSummary {
    pub fn from_node(node: &HierarchyNode) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            node_type: node.node_type,
            style: NodeStyle::for_type(node.node_type),
            status: node.status(),
            topic: node.topic.clone(),
            child_count: node.children.len(),
            children_label: children_label(node.children.len()),
        }
    }
}

/// Recursive tree for the sidebar.
#[derive(Debug, Clone, Serialize)]
pub struct TreeNodeView {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub icon: &'static str,
    pub color: &'static str,
    pub status: Option<NodeStatus>,
    pub topic: Option<String>,
    pub children: Vec<TreeNodeView>,
}

impl TreeNodeView {
    pub fn from_node(node: &HierarchyNode) -> Self {
        let style = NodeStyle::for_type(node.node_type);
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            node_type: node.node_type,
            icon: style.icon,
            color: style.color,
            status: node.status(),
            topic: node.topic.clone(),
            children: node.children.iter().map(Self::from_node).collect(),
        }
    }
}

/// One breadcrumb entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    pub id: String,
    pub name: String,
}

/// Detail panel for one node: static details merged with live values.
#[derive(Debug, Clone, Serialize)]
pub struct NodeView {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub style: NodeStyle,
    pub status: Option<NodeStatus>,
    pub status_label: Option<&'static str>,
    pub description: Option<String>,
    pub last_active: Option<String>,
    pub image: Option<String>,
    pub topic: Option<String>,
    /// Static metrics with live values overlaid.
    pub metrics: MetricMap,
    /// Metric keys whose value is live.
    pub live_keys: Vec<String>,
    /// Whether a live payload exists for this node's topic.
    pub live: bool,
    pub live_received_at: Option<DateTime<Utc>>,
    pub breadcrumb: Vec<Crumb>,
    pub children: Vec<NodeSummary>,
    pub children_label: String,
}

/// Broker connection indicator.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionView {
    pub state: ConnectionState,
    pub connected: bool,
    pub label: &'static str,
    pub broker_url: Option<String>,
    pub focused_topic: Option<String>,
    pub subscriptions: Vec<String>,
}

/// Full dashboard state snapshot (sent on initial connection and via REST).
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    /// Timestamp when snapshot was taken (Unix milliseconds).
    pub timestamp_ms: i64,
    pub connection: ConnectionView,
    pub selected: Option<NodeView>,
    /// Topics with live data, most recent first.
    pub live_topics: Vec<String>,
}

/// WebSocket message sent to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardMessage {
    /// Full state (sent on connect).
    Snapshot(DashboardSnapshot),
    /// Periodic refresh.
    Update(DashboardSnapshot),
    /// Toast notification.
    Notification(Notification),
}

/// Broker settings as shown to clients. The password is never echoed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokerView {
    pub url: String,
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub has_password: bool,
}

impl BrokerView {
    pub fn from_config(config: &BrokerConfig) -> Self {
        Self {
            url: config.url(),
            host: config.host.clone(),
            port: config.port,
            client_id: config.client_id.clone(),
            username: config.username.clone(),
            has_password: config.password.is_some(),
        }
    }
}

/// `POST /api/broker` body. Absent fields keep their current value; blank
/// credentials clear them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrokerRequest {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub client_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl BrokerRequest {
    pub fn apply(self, mut config: BrokerConfig) -> BrokerConfig {
        if let Some(host) = self.host {
            config.host = host.trim().to_string();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(client_id) = self.client_id.filter(|id| !id.trim().is_empty()) {
            config.client_id = client_id;
        }
        if let Some(username) = self.username {
            config.username = Some(username).filter(|u| !u.is_empty());
        }
        if let Some(password) = self.password {
            config.password = Some(password).filter(|p| !p.is_empty());
        }
        config
    }
}

/// `POST /api/selection` body.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectRequest {
    pub id: String,
}

/// `GET /api/search` query.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}
