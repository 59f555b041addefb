//! MQTT overlay error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MqttError {
    #[error("Invalid broker configuration: {0}")]
    InvalidConfig(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Subscribe to {topic} failed: {reason}")]
    SubscribeFailed { topic: String, reason: String },

    #[error("Unsubscribe from {topic} failed: {reason}")]
    UnsubscribeFailed { topic: String, reason: String },

    #[error("Payload decode error on {topic}: {reason}")]
    Decode { topic: String, reason: String },

    #[error("Client error: {0}")]
    Client(#[from] rumqttc::ClientError),
}

pub type MqttResult<T> = Result<T, MqttError>;
