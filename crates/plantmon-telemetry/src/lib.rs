//! Prometheus metrics and structured logging for plantmon.
//!
//! - Structured logging with tracing (pretty for development, JSON for production)
//! - Prometheus metrics for the broker connection, subscriptions and payloads
//! - Text exposition for the dashboard's `/metrics` route

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, LogFormat};
pub use metrics::Metrics;
