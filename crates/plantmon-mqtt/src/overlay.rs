//! Live-data overlay.
//!
//! Owns the connection state, the set of subscribed topics, the focused topic
//! and the per-topic payload map. Broker traffic arrives through
//! [`LiveOverlay::handle_event`]; the dashboard drives [`LiveOverlay::focus`].
//!
//! The internal lock is never held across an `.await`: client calls are made
//! on a cloned `Arc<dyn BrokerClient>` after the bookkeeping is done.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use plantmon_core::MetricMap;
use plantmon_telemetry::Metrics;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::BrokerClient;
use crate::error::MqttResult;
use crate::event::BrokerEvent;
use crate::live::{LiveEntry, TopicPayloadMap};
use crate::notify::Notifier;
use crate::payload::decode_payload;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }

    /// Indicator text shown in the dashboard header.
    pub fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "Not connected",
            Self::Connecting => "Connecting…",
            Self::Connected => "Connected",
        }
    }

    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

/// Result of [`LiveOverlay::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Subscribed,
    /// Already subscribed or a subscribe is in flight; the client was not called.
    AlreadySubscribed,
    /// Not connected; nothing happened.
    Ignored,
}

/// Result of [`LiveOverlay::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsubscribeOutcome {
    Unsubscribed,
    /// The topic was not subscribed; only its live entry (if any) was dropped.
    NotSubscribed,
    /// Not connected; nothing happened.
    Ignored,
}

struct OverlayInner {
    state: ConnectionState,
    client: Option<Arc<dyn BrokerClient>>,
    subscriptions: HashSet<String>,
    /// Topics with a subscribe call in flight.
    pending: HashSet<String>,
    focus: Option<String>,
    live: TopicPayloadMap,
}

impl OverlayInner {
    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            debug!(from = self.state.as_str(), to = state.as_str(), "Connection state change");
        }
        self.state = state;
        Metrics::mqtt_state_set(state.as_str());
    }
}

/// Live-data overlay shared between the session pump and the dashboard.
pub struct LiveOverlay {
    inner: RwLock<OverlayInner>,
    notifier: Notifier,
}

impl LiveOverlay {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            inner: RwLock::new(OverlayInner {
                state: ConnectionState::Disconnected,
                client: None,
                subscriptions: HashSet::new(),
                pending: HashSet::new(),
                focus: None,
                live: TopicPayloadMap::new(),
            }),
            notifier,
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.read().state
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.read().client.is_some()
    }

    /// Bind a freshly opened client. State becomes `Connecting`; topics left
    /// over from a previous connection are dropped, the focus is kept.
    pub fn attach(&self, client: Arc<dyn BrokerClient>) {
        let mut inner = self.inner.write();
        inner.client = Some(client);
        inner.subscriptions.clear();
        inner.pending.clear();
        inner.live.clear();
        inner.set_state(ConnectionState::Connecting);
        Metrics::subscriptions_active(0);
    }

    /// Unbind the client, clearing subscriptions and live data.
    pub fn detach(&self) -> Option<Arc<dyn BrokerClient>> {
        let mut inner = self.inner.write();
        let client = inner.client.take();
        inner.subscriptions.clear();
        inner.pending.clear();
        inner.live.clear();
        inner.set_state(ConnectionState::Disconnected);
        Metrics::subscriptions_active(0);
        client
    }

    /// Apply one broker event.
    pub async fn handle_event(&self, event: BrokerEvent) {
        if !self.is_attached() {
            debug!(kind = event.kind(), "Ignoring event without an attached client");
            return;
        }
        match event {
            BrokerEvent::Connecting => {
                self.inner.write().set_state(ConnectionState::Connecting);
            }
            BrokerEvent::Connected => self.on_connected().await,
            BrokerEvent::Disconnected { reason } => {
                warn!(%reason, "Disconnected from MQTT broker");
                self.inner.write().set_state(ConnectionState::Disconnected);
                self.notifier.info("Disconnected from MQTT broker");
            }
            BrokerEvent::ConnectFailed { reason } => {
                warn!(%reason, "MQTT connection attempt failed");
                self.inner.write().set_state(ConnectionState::Disconnected);
                Metrics::mqtt_connect_failed();
                self.notifier.error("Failed to connect to MQTT broker");
            }
            BrokerEvent::SubscribeRejected { topic } => {
                let removed = {
                    let mut inner = self.inner.write();
                    let removed = inner.subscriptions.remove(&topic);
                    inner.live.remove(&topic);
                    Metrics::subscriptions_active(inner.subscriptions.len());
                    removed
                };
                warn!(%topic, was_subscribed = removed, "Broker rejected subscription");
                Metrics::subscribe_outcome("rejected");
                self.notifier.error(format!("Failed to subscribe to {topic}"));
            }
            BrokerEvent::Message { topic, payload } => {
                self.on_message(&topic, &payload);
            }
        }
    }

    async fn on_connected(&self) {
        let to_restore: Vec<String> = {
            let mut inner = self.inner.write();
            inner.set_state(ConnectionState::Connected);
            let mut topics: Vec<String> = inner.subscriptions.drain().collect();
            topics.sort();
            if let Some(focus) = &inner.focus {
                if !topics.contains(focus) {
                    topics.push(focus.clone());
                }
            }
            Metrics::subscriptions_active(0);
            topics
        };
        info!(restore = to_restore.len(), "Connected to MQTT broker");
        self.notifier.success("Connected to MQTT broker");

        for topic in to_restore {
            if let Err(e) = self.subscribe(&topic).await {
                warn!(%topic, error = %e, "Failed to restore subscription");
            }
        }
    }

    /// Fold an inbound message into the live map.
    ///
    /// Returns `true` when the payload was stored. Payloads for topics that
    /// are not subscribed, and payloads that fail to decode, are dropped.
    pub fn on_message(&self, topic: &str, payload: &[u8]) -> bool {
        if !self.inner.read().subscriptions.contains(topic) {
            debug!(%topic, "Dropping message for unsubscribed topic");
            Metrics::message_dropped("unsubscribed");
            return false;
        }
        let values = match decode_payload(topic, payload) {
            Ok(values) => values,
            Err(e) => {
                warn!(error = %e, bytes = payload.len(), "Dropping undecodable payload");
                Metrics::message_dropped("decode");
                return false;
            }
        };

        let mut inner = self.inner.write();
        // unsubscribed while decoding
        if !inner.subscriptions.contains(topic) {
            Metrics::message_dropped("unsubscribed");
            return false;
        }
        let sequence = inner.live.apply(topic, values);
        drop(inner);
        debug!(%topic, sequence, "Live payload applied");
        Metrics::message_received(topic);
        true
    }

    /// Subscribe to `topic`. Ignored unless connected; idempotent.
    pub async fn subscribe(&self, topic: &str) -> MqttResult<SubscribeOutcome> {
        let client = {
            let mut inner = self.inner.write();
            if !inner.state.is_connected() {
                debug!(%topic, "Subscribe ignored while not connected");
                Metrics::subscribe_outcome("ignored");
                return Ok(SubscribeOutcome::Ignored);
            }
            if inner.subscriptions.contains(topic) || inner.pending.contains(topic) {
                Metrics::subscribe_outcome("already");
                return Ok(SubscribeOutcome::AlreadySubscribed);
            }
            let Some(client) = inner.client.clone() else {
                Metrics::subscribe_outcome("ignored");
                return Ok(SubscribeOutcome::Ignored);
            };
            inner.pending.insert(topic.to_string());
            client
        };

        let result = client.subscribe(topic.to_string()).await;

        let mut inner = self.inner.write();
        inner.pending.remove(topic);
        match result {
            Ok(()) => {
                inner.subscriptions.insert(topic.to_string());
                Metrics::subscriptions_active(inner.subscriptions.len());
                drop(inner);
                info!(%topic, "Subscribed");
                Metrics::subscribe_outcome("subscribed");
                self.notifier.success(format!("Subscribed to {topic}"));
                Ok(SubscribeOutcome::Subscribed)
            }
            Err(e) => {
                drop(inner);
                warn!(%topic, error = %e, "Subscribe failed");
                Metrics::subscribe_outcome("failed");
                self.notifier.error(format!("Failed to subscribe to {topic}"));
                Err(e)
            }
        }
    }

    /// Unsubscribe from `topic`. Ignored unless connected.
    ///
    /// The live entry is removed immediately; the client is only called when
    /// the topic was actually subscribed.
    pub async fn unsubscribe(&self, topic: &str) -> MqttResult<UnsubscribeOutcome> {
        let client = {
            let mut inner = self.inner.write();
            if !inner.state.is_connected() {
                debug!(%topic, "Unsubscribe ignored while not connected");
                return Ok(UnsubscribeOutcome::Ignored);
            }
            inner.live.remove(topic);
            if !inner.subscriptions.remove(topic) {
                return Ok(UnsubscribeOutcome::NotSubscribed);
            }
            Metrics::subscriptions_active(inner.subscriptions.len());
            inner.client.clone()
        };

        let Some(client) = client else {
            return Ok(UnsubscribeOutcome::Unsubscribed);
        };
        match client.unsubscribe(topic.to_string()).await {
            Ok(()) => {
                info!(%topic, "Unsubscribed");
                Ok(UnsubscribeOutcome::Unsubscribed)
            }
            Err(e) => {
                warn!(%topic, error = %e, "Unsubscribe failed");
                self.notifier
                    .error(format!("Failed to unsubscribe from {topic}"));
                Err(e)
            }
        }
    }

    /// Move the focus to `topic`: unsubscribe the previous focus, subscribe
    /// the new one. The focus is remembered while disconnected and subscribed
    /// once the connection comes up.
    pub async fn focus(&self, topic: Option<&str>) -> MqttResult<()> {
        let previous = {
            let mut inner = self.inner.write();
            if inner.focus.as_deref() == topic {
                return Ok(());
            }
            let previous = std::mem::replace(&mut inner.focus, topic.map(str::to_string));
            match previous {
                // Not restored on the next Connected; the broker session that
                // held it is gone.
                Some(previous) if !inner.state.is_connected() => {
                    inner.subscriptions.remove(&previous);
                    inner.live.remove(&previous);
                    Metrics::subscriptions_active(inner.subscriptions.len());
                    None
                }
                previous => previous,
            }
        };

        if let Some(previous) = previous {
            if let Err(e) = self.unsubscribe(&previous).await {
                warn!(topic = %previous, error = %e, "Failed to release previous focus");
            }
        }
        if let Some(next) = topic {
            self.subscribe(next).await?;
        }
        Ok(())
    }

    pub fn focused_topic(&self) -> Option<String> {
        self.inner.read().focus.clone()
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.inner.read().subscriptions.contains(topic)
    }

    /// Subscribed topics, sorted.
    pub fn subscriptions(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.inner.read().subscriptions.iter().cloned().collect();
        topics.sort();
        topics
    }

    pub fn live_values(&self, topic: &str) -> Option<MetricMap> {
        self.inner.read().live.values(topic).cloned()
    }

    pub fn live_entry(&self, topic: &str) -> Option<LiveEntry> {
        self.inner.read().live.get(topic).cloned()
    }

    /// Topics with live data, most recent first.
    pub fn live_topics(&self) -> Vec<String> {
        self.inner.read().live.topics()
    }

    pub fn live_snapshot(&self) -> BTreeMap<String, LiveEntry> {
        self.inner.read().live.snapshot()
    }
}

impl Default for LiveOverlay {
    fn default() -> Self {
        Self::new(Notifier::default())
    }
}
