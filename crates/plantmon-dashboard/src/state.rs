//! Dashboard state management.
//!
//! `DashboardState` joins the static hierarchy, the current selection and the
//! live overlay into the views served over REST and WebSocket.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use plantmon_core::style::children_label;
use plantmon_core::{merge_for_node, Hierarchy, HierarchyNode, NodeStyle, Selection, UnitTable};
use plantmon_mqtt::{BrokerConfig, LiveOverlay, SessionHandle};

use crate::error::{DashboardError, DashboardResult};
use crate::types::{
    BrokerRequest, BrokerView, ConnectionView, Crumb, DashboardSnapshot, NodeSummary, NodeView,
    TreeNodeView,
};

#[derive(Clone)]
pub struct DashboardState {
    hierarchy: Arc<Hierarchy>,
    overlay: Arc<LiveOverlay>,
    selection: Arc<RwLock<Selection>>,
    units: Arc<UnitTable>,
    session: Option<SessionHandle>,
}

impl DashboardState {
    /// Selection starts at the hierarchy root.
    pub fn new(hierarchy: Arc<Hierarchy>, overlay: Arc<LiveOverlay>, units: UnitTable) -> Self {
        let selection = Selection::new(&hierarchy);
        Self {
            hierarchy,
            overlay,
            selection: Arc::new(RwLock::new(selection)),
            units: Arc::new(units),
            session: None,
        }
    }

    /// Allow the broker connection to be managed through the API.
    #[must_use]
    pub fn with_session(mut self, session: SessionHandle) -> Self {
        self.session = Some(session);
        self
    }

    pub fn hierarchy(&self) -> &Arc<Hierarchy> {
        &self.hierarchy
    }

    pub fn overlay(&self) -> &Arc<LiveOverlay> {
        &self.overlay
    }

    pub fn tree_view(&self) -> TreeNodeView {
        TreeNodeView::from_node(self.hierarchy.root())
    }

    pub fn breadcrumb(&self, id: &str) -> Option<Vec<Crumb>> {
        self.hierarchy.path_to(id).map(|path| {
            path.into_iter()
                .map(|n| Crumb {
                    id: n.id.clone(),
                    name: n.name.clone(),
                })
                .collect()
        })
    }

    pub fn node_view(&self, id: &str) -> Option<NodeView> {
        self.hierarchy.find(id).map(|node| self.build_node_view(node))
    }

    fn build_node_view(&self, node: &HierarchyNode) -> NodeView {
        let live = node
            .topic
            .as_deref()
            .and_then(|topic| self.overlay.live_entry(topic));
        let merged = merge_for_node(node, live.as_ref().map(|e| &e.values), &self.units);
        let details = node.details.as_ref();

        NodeView {
            id: node.id.clone(),
            name: node.name.clone(),
            node_type: node.node_type,
            style: NodeStyle::for_type(node.node_type),
            status: node.status(),
            status_label: node.status().map(|s| s.label()),
            description: details.and_then(|d| d.description.clone()),
            last_active: details.and_then(|d| d.last_active.clone()),
            image: details.and_then(|d| d.image.clone()),
            topic: node.topic.clone(),
            metrics: merged.values,
            live_keys: merged.live_keys,
            live: live.is_some(),
            live_received_at: live.map(|e| e.received_at),
            breadcrumb: self.breadcrumb(&node.id).unwrap_or_default(),
            children: node.children.iter().map(NodeSummary::from_node).collect(),
            children_label: children_label(node.children.len()),
        }
    }

    /// Case-insensitive name search.
    pub fn search(&self, query: &str) -> Vec<NodeSummary> {
        self.hierarchy
            .search(query)
            .into_iter()
            .map(NodeSummary::from_node)
            .collect()
    }

    pub fn selected_id(&self) -> Option<String> {
        self.selection.read().current_id().map(str::to_string)
    }

    pub fn selected_view(&self) -> Option<NodeView> {
        let id = self.selected_id()?;
        self.node_view(&id)
    }

    /// Replace the selection and move the live focus to the node's topic.
    ///
    /// A failed subscribe is reported through the overlay's notifications;
    /// the selection still changes.
    pub async fn select(&self, id: &str) -> DashboardResult<NodeView> {
        let node = self
            .hierarchy
            .find(id)
            .ok_or_else(|| DashboardError::NodeNotFound(id.to_string()))?;
        self.selection.write().select(node);
        info!(node = %node.id, topic = ?node.topic, "Selection changed");

        if let Err(e) = self.overlay.focus(node.topic.as_deref()).await {
            warn!(node = %node.id, error = %e, "Failed to focus live topic");
        }
        Ok(self.build_node_view(node))
    }

    pub fn connection_view(&self) -> ConnectionView {
        let state = self.overlay.state();
        ConnectionView {
            state,
            connected: state.is_connected(),
            label: state.label(),
            broker_url: self.broker_config().map(|c| c.url()),
            focused_topic: self.overlay.focused_topic(),
            subscriptions: self.overlay.subscriptions(),
        }
    }

    fn broker_config(&self) -> Option<BrokerConfig> {
        self.session.as_ref().and_then(SessionHandle::current_config)
    }

    /// Settings of the open session.
    pub fn broker_view(&self) -> DashboardResult<BrokerView> {
        let session = self.session.as_ref().ok_or(DashboardError::BrokerUnmanaged)?;
        session
            .current_config()
            .as_ref()
            .map(BrokerView::from_config)
            .ok_or(DashboardError::BrokerNotConnected)
    }

    /// Connect (or reconnect) the broker with `request` applied on top of the
    /// current settings.
    pub async fn connect_broker(&self, request: BrokerRequest) -> DashboardResult<BrokerView> {
        let session = self.session.as_ref().ok_or(DashboardError::BrokerUnmanaged)?;
        let config = request.apply(session.current_config().unwrap_or_default());
        session.connect(config.clone()).await?;
        Ok(BrokerView::from_config(&config))
    }

    /// Close the broker connection. Returns `false` when none was open.
    pub async fn disconnect_broker(&self) -> DashboardResult<bool> {
        let session = self.session.as_ref().ok_or(DashboardError::BrokerUnmanaged)?;
        Ok(session.disconnect().await)
    }

    pub fn collect_snapshot(&self) -> DashboardSnapshot {
        let snapshot = DashboardSnapshot {
            timestamp_ms: Utc::now().timestamp_millis(),
            connection: self.connection_view(),
            selected: self.selected_view(),
            live_topics: self.overlay.live_topics(),
        };
        debug!(live_topics = snapshot.live_topics.len(), "Snapshot collected");
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plantmon_core::builtin_hierarchy;
    use crate::types::BrokerRequest;
    use plantmon_mqtt::{BrokerEvent, MockBroker, MockConnector};
    use serde_json::json;

    async fn connected_state() -> (DashboardState, Arc<MockBroker>) {
        let overlay = Arc::new(LiveOverlay::default());
        let broker = Arc::new(MockBroker::new());
        overlay.attach(broker.clone());
        overlay.handle_event(BrokerEvent::Connected).await;
        let state = DashboardState::new(
            Arc::new(builtin_hierarchy().unwrap()),
            overlay,
            UnitTable::builtin(),
        );
        (state, broker)
    }

    #[tokio::test]
    async fn test_initial_selection_is_root() {
        let (state, _) = connected_state().await;
        assert_eq!(state.selected_id().as_deref(), Some("company-1"));
        let view = state.selected_view().unwrap();
        assert_eq!(view.breadcrumb.len(), 1);
        assert_eq!(view.children_label, "4 Children");
    }

    #[tokio::test]
    async fn test_select_sensor_merges_live_values() {
        let (state, broker) = connected_state().await;
        let topic = "EcoTech/London/LDN-A12/TEMPERATURE";

        let view = state.select("sensor-1").await.unwrap();
        assert!(!view.live);
        assert_eq!(broker.subscribe_calls(), vec![topic.to_string()]);

        assert!(state.overlay().on_message(topic, br#"{"temp": 19}"#));
        let view = state.node_view("sensor-1").unwrap();
        assert!(view.live);
        assert_eq!(view.metrics.get("temp"), Some(&json!("19°C")));
        assert_eq!(view.live_keys, vec!["temp".to_string()]);
    }

    #[tokio::test]
    async fn test_select_unknown_node() {
        let (state, broker) = connected_state().await;
        assert!(matches!(
            state.select("nope").await,
            Err(DashboardError::NodeNotFound(id)) if id == "nope"
        ));
        assert_eq!(state.selected_id().as_deref(), Some("company-1"));
        assert!(broker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_connection_view() {
        let (state, _) = connected_state().await;
        let view = state.connection_view();
        assert!(view.connected);
        assert_eq!(view.label, "Connected");
        assert!(view.broker_url.is_none());
    }

    #[tokio::test]
    async fn test_broker_management() {
        let overlay = Arc::new(LiveOverlay::default());
        let connector = Arc::new(MockConnector::new());
        let state = DashboardState::new(
            Arc::new(builtin_hierarchy().unwrap()),
            overlay.clone(),
            UnitTable::builtin(),
        )
        .with_session(SessionHandle::new(connector.clone(), overlay));

        let view = state
            .connect_broker(BrokerRequest {
                host: Some("broker.local".to_string()),
                port: Some(9001),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(view.url, "ws://broker.local:9001/mqtt");
        assert_eq!(
            state.connection_view().broker_url.as_deref(),
            Some("ws://broker.local:9001/mqtt")
        );
        assert_eq!(connector.connections().len(), 1);

        assert!(state.disconnect_broker().await.unwrap());
        assert!(matches!(
            state.broker_view(),
            Err(DashboardError::BrokerNotConnected)
        ));
    }

    #[tokio::test]
    async fn test_broker_unmanaged() {
        let (state, _) = connected_state().await;
        assert!(matches!(
            state.disconnect_broker().await,
            Err(DashboardError::BrokerUnmanaged)
        ));
        assert!(matches!(
            state.broker_view(),
            Err(DashboardError::BrokerUnmanaged)
        ));
    }
}
