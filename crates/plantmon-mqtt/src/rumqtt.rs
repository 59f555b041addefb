//! rumqttc transport.
//!
//! A driver task polls the rumqttc event loop and translates its packets into
//! [`BrokerEvent`]s. Subscribe acknowledgements are correlated to topics by
//! [`SubscribeTracker`].

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rumqttc::{
    AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, SubscribeReasonCode,
    Transport,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{BoxFuture, BrokerClient, BrokerConnector, BrokerLink};
use crate::config::{BrokerConfig, Protocol};
use crate::error::{MqttError, MqttResult};
use crate::event::BrokerEvent;

/// Opens connections with rumqttc.
#[derive(Debug, Clone, Copy, Default)]
pub struct RumqttConnector;

impl BrokerConnector for RumqttConnector {
    fn connect(&self, config: &BrokerConfig, cancel: CancellationToken) -> MqttResult<BrokerLink> {
        let options = mqtt_options(config);
        let (client, eventloop) = AsyncClient::new(options, config.channel_capacity);
        let tracker = Arc::new(Mutex::new(SubscribeTracker::default()));
        let (tx, rx) = mpsc::channel(config.channel_capacity);

        let driver = tokio::spawn(drive_event_loop(
            eventloop,
            tx,
            tracker.clone(),
            Duration::from_millis(config.reconnect_delay_ms),
            cancel,
        ));

        Ok(BrokerLink {
            client: Arc::new(RumqttClient { client, tracker }),
            events: rx,
            driver: Some(driver),
        })
    }
}

pub(crate) fn mqtt_options(config: &BrokerConfig) -> MqttOptions {
    let protocol = config.effective_protocol();
    // websocket transports take the full URL as the host
    let host = if protocol.is_websocket() {
        config.url()
    } else {
        config.host.clone()
    };

    let mut options = MqttOptions::new(config.client_id.clone(), host, config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
    options.set_clean_session(true);
    if let Some(username) = &config.username {
        options.set_credentials(username.clone(), config.password.clone().unwrap_or_default());
    }
    match protocol {
        Protocol::Mqtt => {}
        Protocol::Mqtts => {
            options.set_transport(Transport::tls_with_default_config());
        }
        Protocol::Ws => {
            options.set_transport(Transport::Ws);
        }
        Protocol::Wss => {
            options.set_transport(Transport::wss_with_default_config());
        }
    }
    options
}

/// Maps SUBSCRIBE packet ids back to topics.
///
/// `queued` mirrors the rumqttc request channel: a topic enters when its
/// request is handed to the client and leaves when the event loop reports the
/// outgoing packet. Requests still in the channel survive a reconnect, so the
/// queue does too; packets already on the wire are not resent and their ids
/// are dropped when the connection is lost.
#[derive(Debug, Default)]
pub(crate) struct SubscribeTracker {
    queued: VecDeque<String>,
    in_flight: HashMap<u16, String>,
}

impl SubscribeTracker {
    pub(crate) fn queue(&mut self, topic: &str) {
        self.queued.push_back(topic.to_string());
    }

    /// Undo the last `queue` when the request never reached the channel.
    pub(crate) fn unqueue(&mut self) {
        self.queued.pop_back();
    }

    pub(crate) fn sent(&mut self, pkid: u16) {
        if let Some(topic) = self.queued.pop_front() {
            self.in_flight.insert(pkid, topic);
        }
    }

    pub(crate) fn acked(&mut self, pkid: u16) -> Option<String> {
        self.in_flight.remove(&pkid)
    }

    pub(crate) fn connection_lost(&mut self) {
        self.in_flight.clear();
    }
}

/// `BrokerClient` over an rumqttc `AsyncClient`.
struct RumqttClient {
    client: AsyncClient,
    tracker: Arc<Mutex<SubscribeTracker>>,
}

impl RumqttClient {
    fn enqueue_subscribe(&self, topic: &str) -> MqttResult<()> {
        // queue order must match request order, so hold the lock across the send
        let mut tracker = self.tracker.lock();
        tracker.queue(topic);
        if let Err(e) = self.client.try_subscribe(topic, QoS::AtLeastOnce) {
            tracker.unqueue();
            return Err(MqttError::SubscribeFailed {
                topic: topic.to_string(),
                reason: e.to_string(),
            });
        }
        Ok(())
    }
}

impl BrokerClient for RumqttClient {
    fn subscribe(&self, topic: String) -> BoxFuture<'_, MqttResult<()>> {
        let result = self.enqueue_subscribe(&topic);
        Box::pin(std::future::ready(result))
    }

    fn unsubscribe(&self, topic: String) -> BoxFuture<'_, MqttResult<()>> {
        let result = self
            .client
            .try_unsubscribe(topic.clone())
            .map_err(|e| MqttError::UnsubscribeFailed {
                topic,
                reason: e.to_string(),
            });
        Box::pin(std::future::ready(result))
    }

    fn disconnect(&self) -> BoxFuture<'_, MqttResult<()>> {
        Box::pin(async move {
            self.client.disconnect().await?;
            Ok(())
        })
    }
}

async fn drive_event_loop(
    mut eventloop: EventLoop,
    tx: mpsc::Sender<BrokerEvent>,
    tracker: Arc<Mutex<SubscribeTracker>>,
    reconnect_delay: Duration,
    cancel: CancellationToken,
) {
    let mut connected = false;

    if tx.send(BrokerEvent::Connecting).await.is_err() {
        return;
    }

    loop {
        let polled = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("MQTT driver cancelled");
                return;
            }
            polled = eventloop.poll() => polled,
        };

        let event = match polled {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!(session_present = ack.session_present, "MQTT broker acknowledged connection");
                connected = true;
                Some(BrokerEvent::Connected)
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => Some(BrokerEvent::Message {
                topic: publish.topic,
                payload: publish.payload.to_vec(),
            }),
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                let topic = tracker.lock().acked(ack.pkid);
                let refused = ack
                    .return_codes
                    .iter()
                    .any(|code| matches!(code, SubscribeReasonCode::Failure));
                match topic {
                    Some(topic) if refused => Some(BrokerEvent::SubscribeRejected { topic }),
                    _ => None,
                }
            }
            Ok(Event::Outgoing(Outgoing::Subscribe(pkid))) => {
                tracker.lock().sent(pkid);
                None
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                connected = false;
                Some(BrokerEvent::Disconnected {
                    reason: "broker sent DISCONNECT".to_string(),
                })
            }
            Ok(_) => None,
            Err(e) => {
                let reason = e.to_string();
                let event = if connected {
                    BrokerEvent::Disconnected { reason }
                } else {
                    BrokerEvent::ConnectFailed { reason }
                };
                connected = false;
                tracker.lock().connection_lost();
                if tx.send(event).await.is_err() {
                    return;
                }

                warn!(delay_ms = reconnect_delay.as_millis() as u64, "MQTT connection error, retrying");
                tokio::select! {
                    () = tokio::time::sleep(reconnect_delay) => {}
                    () = cancel.cancelled() => {
                        debug!("MQTT driver cancelled during reconnect delay");
                        return;
                    }
                }
                Some(BrokerEvent::Connecting)
            }
        };

        if let Some(event) = event {
            if tx.send(event).await.is_err() {
                debug!("Event receiver dropped, stopping MQTT driver");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_matches_packet_ids_in_request_order() {
        let mut tracker = SubscribeTracker::default();
        tracker.queue("a/1");
        tracker.queue("a/2");
        tracker.sent(1);
        tracker.sent(2);
        assert_eq!(tracker.acked(2).as_deref(), Some("a/2"));
        assert_eq!(tracker.acked(1).as_deref(), Some("a/1"));
        assert_eq!(tracker.acked(1), None);
    }

    #[test]
    fn test_tracker_keeps_queued_requests_across_reconnect() {
        let mut tracker = SubscribeTracker::default();
        tracker.queue("x/sent");
        tracker.sent(1);
        // still in the client channel when the connection drops
        tracker.queue("x/queued");
        tracker.connection_lost();
        assert_eq!(tracker.acked(1), None);

        // restore after reconnect queues behind the surviving request
        tracker.queue("y/restored");
        tracker.sent(1);
        tracker.sent(2);
        assert_eq!(tracker.acked(1).as_deref(), Some("x/queued"));
        assert_eq!(tracker.acked(2).as_deref(), Some("y/restored"));
    }

    #[test]
    fn test_tracker_unqueue_after_failed_send() {
        let mut tracker = SubscribeTracker::default();
        tracker.queue("a/1");
        tracker.queue("a/2");
        tracker.unqueue();
        tracker.sent(7);
        assert_eq!(tracker.acked(7).as_deref(), Some("a/1"));
    }

    #[test]
    fn test_options_for_websocket() {
        let config = BrokerConfig::new("broker.local", 8083, "plantmon-test");
        let options = mqtt_options(&config);
        let (host, port) = options.broker_address();
        assert_eq!(host, "ws://broker.local:8083/mqtt");
        assert_eq!(port, 8083);
        assert_eq!(options.client_id(), "plantmon-test");
        assert_eq!(options.keep_alive(), Duration::from_secs(60));
    }

    #[test]
    fn test_options_for_tcp_with_credentials() {
        let config = BrokerConfig::new("broker.local", 1883, "c1")
            .with_protocol(Protocol::Mqtt)
            .with_credentials("user", Some("pass"));
        let options = mqtt_options(&config);
        assert_eq!(options.broker_address(), ("broker.local".to_string(), 1883));
        assert_eq!(
            options.credentials(),
            Some(("user".to_string(), "pass".to_string()))
        );
    }
}
