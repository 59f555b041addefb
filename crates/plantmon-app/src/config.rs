//! Application configuration.
//!
//! Loaded from a TOML file, then overridden by `PLANTMON__SECTION__KEY`
//! environment variables (e.g. `PLANTMON__BROKER__PASSWORD`).

use std::path::Path;

use serde::{Deserialize, Serialize};

use plantmon_core::{UnitRule, UnitTable};
use plantmon_dashboard::DashboardConfig;
use plantmon_mqtt::BrokerConfig;
use plantmon_telemetry::LogFormat;

use crate::error::{AppError, AppResult};

/// Default config location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "PLANTMON";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// JSON hierarchy file. The built-in catalog is used when unset.
    #[serde(default)]
    pub hierarchy_path: Option<String>,
    /// Open the broker session at startup.
    #[serde(default = "default_connect_on_start")]
    pub connect_on_start: bool,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Extra unit rules, consulted before the built-in ones.
    #[serde(default)]
    pub units: Vec<UnitRule>,
}

fn default_connect_on_start() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            hierarchy_path: None,
            connect_on_start: default_connect_on_start(),
            broker: BrokerConfig::default(),
            dashboard: DashboardConfig::default(),
            telemetry: TelemetryConfig::default(),
            units: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default `EnvFilter` directive; `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Output format. Picked from `RUST_ENV` when unset.
    #[serde(default)]
    pub log_format: Option<LogFormat>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: None,
        }
    }
}

impl AppConfig {
    /// Load `path` (if it exists) plus environment overrides.
    pub fn load(path: &str) -> AppResult<Self> {
        let mut builder = config::Config::builder();
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::new(path, config::FileFormat::Toml));
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| AppError::Config(format!("Failed to load config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific file, without environment overrides.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.connect_on_start {
            self.broker
                .validate()
                .map_err(|e| AppError::Config(e.to_string()))?;
        }
        if self.dashboard.enabled && self.dashboard.max_connections == 0 {
            return Err(AppError::Config(
                "dashboard.max_connections must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Configured unit rules followed by the built-in table.
    pub fn unit_table(&self) -> UnitTable {
        let mut rules = self.units.clone();
        rules.extend(UnitTable::builtin().rules().iter().cloned());
        UnitTable::new(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plantmon_core::{HierarchyNode, NodeType};
    use plantmon_mqtt::Protocol;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.connect_on_start);
        assert!(config.hierarchy_path.is_none());
        assert_eq!(config.broker.port, 8083);
        assert_eq!(config.dashboard.port, 8080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_sections() {
        let config = AppConfig::from_toml(
            r#"
            hierarchy_path = "plant.json"

            [broker]
            host = "broker.hivemq.com"
            port = 8884
            client_id = "plantmon-test"
            secure_origin = true

            [dashboard]
            port = 9000
            update_interval_ms = 250

            [telemetry]
            log_level = "debug"
            log_format = "json"

            [[units]]
            node_type = "sensor"
            metric = "pressure"
            unit = "hPa"
            "#,
        )
        .unwrap();

        assert_eq!(config.hierarchy_path.as_deref(), Some("plant.json"));
        assert_eq!(config.broker.effective_protocol(), Protocol::Wss);
        assert_eq!(config.broker.url(), "wss://broker.hivemq.com:8884/mqtt");
        assert_eq!(config.dashboard.port, 9000);
        assert_eq!(config.telemetry.log_format, Some(LogFormat::Json));

        let sensor = HierarchyNode::new("s", "Sensor", NodeType::Sensor);
        assert_eq!(config.unit_table().unit_for(&sensor, "pressure"), Some("hPa"));
        assert_eq!(config.unit_table().unit_for(&sensor, "humidity"), Some("%"));
    }

    #[test]
    fn test_invalid_broker_rejected() {
        let result = AppConfig::from_toml(
            r#"
            [broker]
            host = ""
            "#,
        );
        assert!(matches!(result, Err(AppError::Config(_))));

        // not validated when the session is not opened at startup
        let result = AppConfig::from_toml(
            r#"
            connect_on_start = false
            [broker]
            host = ""
            "#,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[broker]"));
        assert!(toml_str.contains("[dashboard]"));
    }

    #[test]
    fn test_shipped_config_parses() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/default.toml");
        let config = AppConfig::from_file(path).unwrap();
        assert_eq!(config.broker.host, "localhost");
    }
}
