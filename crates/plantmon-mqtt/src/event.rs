//! Events emitted by a broker connection.

/// Connection lifecycle and inbound traffic, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    /// A connection attempt has started.
    Connecting,
    /// The broker acknowledged the connection.
    Connected,
    /// An established connection was lost.
    Disconnected { reason: String },
    /// A connection attempt failed before the broker acknowledged it.
    ConnectFailed { reason: String },
    /// The broker refused a subscription.
    SubscribeRejected { topic: String },
    /// A publish arrived on `topic`.
    Message { topic: String, payload: Vec<u8> },
}

impl BrokerEvent {
    /// Short name for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected { .. } => "disconnected",
            Self::ConnectFailed { .. } => "connect_failed",
            Self::SubscribeRejected { .. } => "subscribe_rejected",
            Self::Message { .. } => "message",
        }
    }
}
