//! End-to-end: application served on a local port, driven through a mock
//! broker, observed through the dashboard WebSocket.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_tungstenite::connect_async;

use plantmon_app::{AppConfig, Application};
use plantmon_mqtt::{BrokerEvent, MockConnector};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

fn app_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.broker.client_id = "plantmon-it".to_string();
    config.dashboard.update_interval_ms = 50;
    config
}

async fn next_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .expect("websocket error");
        if msg.is_text() {
            return serde_json::from_str(&msg.into_text().unwrap()).unwrap();
        }
    }
}

/// Read until `predicate` matches, skipping other messages.
async fn wait_for(ws: &mut WsStream, predicate: impl Fn(&Value) -> bool) -> Value {
    for _ in 0..200 {
        let msg = next_json(ws).await;
        if predicate(&msg) {
            return msg;
        }
    }
    panic!("expected message never arrived");
}

#[tokio::test]
async fn test_websocket_follows_connection_and_live_data() {
    let connector = Arc::new(MockConnector::new());
    let app = Application::with_connector(app_config(), connector.clone()).unwrap();
    let dashboard = app.dashboard_state().clone();
    let shutdown = app.shutdown_token();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(app.run_on(listener));

    let (mut ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();

    let snapshot = next_json(&mut ws).await;
    assert_eq!(snapshot["type"], "snapshot");
    assert_eq!(snapshot["selected"]["id"], "company-1");
    assert_eq!(snapshot["connection"]["connected"], false);

    assert!(connector.emit(BrokerEvent::Connected).await);
    let toast = wait_for(&mut ws, |m| m["type"] == "notification").await;
    assert_eq!(toast["level"], "success");
    assert_eq!(toast["message"], "Connected to MQTT broker");

    dashboard.select("sensor-1").await.unwrap();
    let topic = "EcoTech/London/LDN-A12/TEMPERATURE";
    let toast = wait_for(&mut ws, |m| m["type"] == "notification").await;
    assert_eq!(toast["message"], format!("Subscribed to {topic}"));
    assert_eq!(connector.broker().subscribe_calls(), vec![topic.to_string()]);

    assert!(
        connector
            .emit(BrokerEvent::Message {
                topic: topic.to_string(),
                payload: br#"{"temp": 21}"#.to_vec(),
            })
            .await
    );
    let update = wait_for(&mut ws, |m| {
        m["type"] == "update" && m["selected"]["live"] == true
    })
    .await;
    assert_eq!(update["selected"]["metrics"]["temp"], "21°C");
    assert_eq!(update["connection"]["focused_topic"], topic);
    assert_eq!(update["live_topics"][0], topic);

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(connector.broker().calls().len() >= 2);
}
