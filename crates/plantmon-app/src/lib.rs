//! plantmon server.
//!
//! Wires the components together:
//! - hierarchy loading (file or built-in catalog)
//! - broker session feeding the live overlay
//! - dashboard HTTP/WebSocket server
//! - layered configuration (TOML file + `PLANTMON__*` environment)

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::{AppConfig, TelemetryConfig, DEFAULT_CONFIG_PATH};
pub use error::{AppError, AppResult};
