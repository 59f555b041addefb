//! Prometheus metrics for plantmon.
//!
//! Covers the broker connection, topic subscriptions, live payload traffic,
//! user notifications and dashboard clients.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error surfaced on first use.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_int_counter, register_int_gauge, register_int_gauge_vec,
    CounterVec, Encoder, IntCounter, IntGauge, IntGaugeVec, TextEncoder,
};

use crate::error::TelemetryResult;

/// Broker connection state (1 = connected, 0 = otherwise).
pub static MQTT_CONNECTED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "plantmon_mqtt_connected",
        "MQTT broker connection state (1=connected)"
    )
    .unwrap()
});

/// Connection state machine current state.
/// Labels: state (disconnected/connecting/connected)
pub static MQTT_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "plantmon_mqtt_state",
        "MQTT connection state machine current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Failed connection attempts.
pub static MQTT_CONNECT_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "plantmon_mqtt_connect_failures_total",
        "Total failed MQTT connection attempts"
    )
    .unwrap()
});

/// Number of topics currently subscribed.
pub static SUBSCRIPTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "plantmon_subscriptions_active",
        "Number of topics currently subscribed"
    )
    .unwrap()
});

/// Subscribe attempts by outcome.
pub static SUBSCRIBE_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "plantmon_subscribe_total",
        "Total subscribe attempts",
        &["outcome"]
    )
    .unwrap()
});

/// Live payloads applied to the topic map.
pub static MESSAGES_RECEIVED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "plantmon_messages_received_total",
        "Total live payloads applied",
        &["topic"]
    )
    .unwrap()
});

/// Payloads dropped before reaching the topic map.
pub static MESSAGES_DROPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "plantmon_messages_dropped_total",
        "Total live payloads dropped",
        &["reason"]
    )
    .unwrap()
});

/// User-visible notifications by level.
pub static NOTIFICATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "plantmon_notifications_total",
        "Total user notifications emitted",
        &["level"]
    )
    .unwrap()
});

/// Connected dashboard WebSocket clients.
pub static DASHBOARD_CLIENTS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "plantmon_dashboard_clients",
        "Connected dashboard WebSocket clients"
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Set the connection state machine state.
    /// Only the active state is set to 1.
    pub fn mqtt_state_set(state: &str) {
        for s in &["disconnected", "connecting", "connected"] {
            MQTT_STATE.with_label_values(&[s]).set(0);
        }
        MQTT_STATE.with_label_values(&[state]).set(1);
        MQTT_CONNECTED.set(i64::from(state == "connected"));
    }

    pub fn mqtt_connect_failed() {
        MQTT_CONNECT_FAILURES_TOTAL.inc();
    }

    pub fn subscriptions_active(count: usize) {
        SUBSCRIPTIONS_ACTIVE.set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Record a subscribe attempt (`subscribed`, `already`, `ignored`, `failed`, `rejected`).
    pub fn subscribe_outcome(outcome: &str) {
        SUBSCRIBE_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn message_received(topic: &str) {
        MESSAGES_RECEIVED_TOTAL.with_label_values(&[topic]).inc();
    }

    /// Record a dropped payload (`decode`, `unsubscribed`).
    pub fn message_dropped(reason: &str) {
        MESSAGES_DROPPED_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn notification(level: &str) {
        NOTIFICATIONS_TOTAL.with_label_values(&[level]).inc();
    }

    pub fn dashboard_client_connected() {
        DASHBOARD_CLIENTS.inc();
    }

    pub fn dashboard_client_disconnected() {
        DASHBOARD_CLIENTS.dec();
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
