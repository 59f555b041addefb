//! MQTT live-data overlay for plantmon.
//!
//! Provides:
//! - Broker configuration with protocol auto-selection
//! - A transport seam (`BrokerClient` / `BrokerConnector`) with an rumqttc
//!   implementation and a recording mock
//! - The live overlay: subscription bookkeeping, focus tracking and the
//!   per-topic payload map
//! - Connection sessions with teardown and reconfiguration
//! - User-visible notifications

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod live;
pub mod notify;
pub mod overlay;
pub mod payload;
pub mod rumqtt;
pub mod session;

pub use client::{
    BoxFuture, BrokerCall, BrokerClient, BrokerConnector, BrokerLink, MockBroker, MockConnector,
};
pub use config::{BrokerConfig, Protocol};
pub use error::{MqttError, MqttResult};
pub use event::BrokerEvent;
pub use live::{LiveEntry, TopicPayloadMap};
pub use notify::{Notification, NotificationLevel, Notifier};
pub use overlay::{ConnectionState, LiveOverlay, SubscribeOutcome, UnsubscribeOutcome};
pub use payload::decode_payload;
pub use rumqtt::RumqttConnector;
pub use session::{OverlaySession, SessionHandle};
