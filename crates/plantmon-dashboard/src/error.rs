//! Dashboard error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Broker connection is not managed by this dashboard")]
    BrokerUnmanaged,

    #[error("No broker session is open")]
    BrokerNotConnected,

    #[error("Broker error: {0}")]
    Broker(#[from] plantmon_mqtt::MqttError),

    #[error("Invalid bind address {address}: {source}")]
    InvalidAddress {
        address: String,
        source: std::net::AddrParseError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DashboardResult<T> = Result<T, DashboardError>;

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NodeNotFound(_) => StatusCode::NOT_FOUND,
            Self::BrokerNotConnected => StatusCode::NOT_FOUND,
            Self::BrokerUnmanaged => StatusCode::CONFLICT,
            Self::Broker(plantmon_mqtt::MqttError::InvalidConfig(_)) => StatusCode::BAD_REQUEST,
            Self::Broker(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
