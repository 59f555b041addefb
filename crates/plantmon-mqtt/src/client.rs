//! Broker client seam.
//!
//! The overlay talks to the broker only through [`BrokerClient`], and sessions
//! obtain a client plus its event stream through [`BrokerConnector`]. This
//! keeps the rumqttc transport swappable and lets tests drive the overlay with
//! [`MockBroker`] / [`MockConnector`].

use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::BrokerConfig;
use crate::error::{MqttError, MqttResult};
use crate::event::BrokerEvent;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Operations the overlay issues against a connected broker.
pub trait BrokerClient: Send + Sync {
    fn subscribe(&self, topic: String) -> BoxFuture<'_, MqttResult<()>>;

    fn unsubscribe(&self, topic: String) -> BoxFuture<'_, MqttResult<()>>;

    fn disconnect(&self) -> BoxFuture<'_, MqttResult<()>>;
}

/// A freshly opened connection.
pub struct BrokerLink {
    pub client: Arc<dyn BrokerClient>,
    pub events: mpsc::Receiver<BrokerEvent>,
    /// Background task driving the transport, if any.
    pub driver: Option<JoinHandle<()>>,
}

/// Opens broker connections.
///
/// `cancel` stops the transport driver when the owning session is released.
pub trait BrokerConnector: Send + Sync {
    fn connect(&self, config: &BrokerConfig, cancel: CancellationToken) -> MqttResult<BrokerLink>;
}

/// A call recorded by [`MockBroker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerCall {
    Subscribe(String),
    Unsubscribe(String),
    Disconnect,
}

/// Recording broker client for tests.
#[derive(Debug, Default)]
pub struct MockBroker {
    calls: Mutex<Vec<BrokerCall>>,
    failing_topics: Mutex<HashSet<String>>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subscribe and unsubscribe fail for `topic`.
    pub fn fail_topic(&self, topic: &str) {
        self.failing_topics.lock().insert(topic.to_string());
    }

    pub fn calls(&self) -> Vec<BrokerCall> {
        self.calls.lock().clone()
    }

    pub fn subscribe_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                BrokerCall::Subscribe(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn unsubscribe_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                BrokerCall::Unsubscribe(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: BrokerCall) {
        self.calls.lock().push(call);
    }

    fn fails(&self, topic: &str) -> bool {
        self.failing_topics.lock().contains(topic)
    }
}

impl BrokerClient for MockBroker {
    fn subscribe(&self, topic: String) -> BoxFuture<'_, MqttResult<()>> {
        Box::pin(async move {
            self.record(BrokerCall::Subscribe(topic.clone()));
            if self.fails(&topic) {
                return Err(MqttError::SubscribeFailed {
                    topic,
                    reason: "mock failure".to_string(),
                });
            }
            Ok(())
        })
    }

    fn unsubscribe(&self, topic: String) -> BoxFuture<'_, MqttResult<()>> {
        Box::pin(async move {
            self.record(BrokerCall::Unsubscribe(topic.clone()));
            if self.fails(&topic) {
                return Err(MqttError::UnsubscribeFailed {
                    topic,
                    reason: "mock failure".to_string(),
                });
            }
            Ok(())
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, MqttResult<()>> {
        Box::pin(async move {
            self.record(BrokerCall::Disconnect);
            Ok(())
        })
    }
}

/// Connector handing out a shared [`MockBroker`]; tests inject events through
/// [`MockConnector::emit`].
#[derive(Default)]
pub struct MockConnector {
    broker: Arc<MockBroker>,
    events: Mutex<Option<mpsc::Sender<BrokerEvent>>>,
    configs: Mutex<Vec<BrokerConfig>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broker(&self) -> Arc<MockBroker> {
        self.broker.clone()
    }

    /// Configs passed to `connect`, oldest first.
    pub fn connections(&self) -> Vec<BrokerConfig> {
        self.configs.lock().clone()
    }

    /// Deliver an event on the most recent connection.
    /// Returns `false` when no connection is open or its pump has stopped.
    pub async fn emit(&self, event: BrokerEvent) -> bool {
        let sender = self.events.lock().clone();
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }
}

impl BrokerConnector for MockConnector {
    fn connect(&self, config: &BrokerConfig, _cancel: CancellationToken) -> MqttResult<BrokerLink> {
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        *self.events.lock() = Some(tx);
        self.configs.lock().push(config.clone());
        Ok(BrokerLink {
            client: self.broker.clone(),
            events: rx,
            driver: None,
        })
    }
}
