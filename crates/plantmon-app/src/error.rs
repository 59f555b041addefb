//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Hierarchy error: {0}")]
    Hierarchy(#[from] plantmon_core::CoreError),

    #[error("MQTT error: {0}")]
    Mqtt(#[from] plantmon_mqtt::MqttError),

    #[error("Dashboard error: {0}")]
    Dashboard(#[from] plantmon_dashboard::DashboardError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] plantmon_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
