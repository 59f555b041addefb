//! Broker connection configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MqttError, MqttResult};

/// Transport protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Mqtt,
    Mqtts,
    Ws,
    Wss,
}

impl Protocol {
    /// Pick a protocol from transport family and page origin security.
    pub fn select(websocket: bool, secure: bool) -> Self {
        match (websocket, secure) {
            (true, true) => Self::Wss,
            (true, false) => Self::Ws,
            (false, true) => Self::Mqtts,
            (false, false) => Self::Mqtt,
        }
    }

    pub fn scheme(self) -> &'static str {
        match self {
            Self::Mqtt => "mqtt",
            Self::Mqtts => "mqtts",
            Self::Ws => "ws",
            Self::Wss => "wss",
        }
    }

    pub fn is_websocket(self) -> bool {
        matches!(self, Self::Ws | Self::Wss)
    }

    pub fn is_secure(self) -> bool {
        matches!(self, Self::Mqtts | Self::Wss)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Broker connection parameters.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Explicit protocol. Chosen from `websocket` and `secure_origin` when absent.
    #[serde(default)]
    pub protocol: Option<Protocol>,
    #[serde(default = "default_websocket")]
    pub websocket: bool,
    /// Whether the dashboard is served from a secure origin.
    #[serde(default)]
    pub secure_origin: bool,
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// Delay between reconnect attempts made by the client driver.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Capacity of the client request queue and event channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8083
}

/// `plantmon-<8 hex chars>`, unique per process start.
pub fn default_client_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("plantmon-{}", &id[..8])
}

fn default_websocket() -> bool {
    true
}

fn default_ws_path() -> String {
    "/mqtt".to_string()
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_channel_capacity() -> usize {
    100
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_id: default_client_id(),
            username: None,
            password: None,
            protocol: None,
            websocket: default_websocket(),
            secure_origin: false,
            ws_path: default_ws_path(),
            keep_alive_secs: default_keep_alive_secs(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl BrokerConfig {
    pub fn new(host: &str, port: u16, client_id: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            client_id: client_id.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, username: &str, password: Option<&str>) -> Self {
        self.username = Some(username.to_string());
        self.password = password.map(str::to_string);
        self
    }

    #[must_use]
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Explicit protocol, or the one implied by `websocket` and `secure_origin`.
    pub fn effective_protocol(&self) -> Protocol {
        self.protocol
            .unwrap_or_else(|| Protocol::select(self.websocket, self.secure_origin))
    }

    /// Broker URL, e.g. `ws://localhost:8083/mqtt` or `mqtt://localhost:1883`.
    pub fn url(&self) -> String {
        let protocol = self.effective_protocol();
        if protocol.is_websocket() {
            let path = if self.ws_path.starts_with('/') {
                self.ws_path.clone()
            } else {
                format!("/{}", self.ws_path)
            };
            format!("{}://{}:{}{}", protocol, self.host, self.port, path)
        } else {
            format!("{}://{}:{}", protocol, self.host, self.port)
        }
    }

    pub fn validate(&self) -> MqttResult<()> {
        if self.host.trim().is_empty() {
            return Err(MqttError::InvalidConfig("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(MqttError::InvalidConfig("port must be non-zero".to_string()));
        }
        if self.client_id.trim().is_empty() {
            return Err(MqttError::InvalidConfig(
                "client_id must not be empty".to_string(),
            ));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(MqttError::InvalidConfig(
                "password requires a username".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(MqttError::InvalidConfig(
                "channel_capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("url", &self.url())
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("keep_alive_secs", &self.keep_alive_secs)
            .field("reconnect_delay_ms", &self.reconnect_delay_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BrokerConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8083);
        assert!(config.client_id.starts_with("plantmon-"));
        assert_eq!(config.client_id.len(), "plantmon-".len() + 8);
        assert_eq!(config.effective_protocol(), Protocol::Ws);
        assert_eq!(config.url(), "ws://localhost:8083/mqtt");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_client_ids_are_unique() {
        assert_ne!(default_client_id(), default_client_id());
    }

    #[test]
    fn test_protocol_selection() {
        let mut config = BrokerConfig::new("broker", 8084, "c1");
        config.secure_origin = true;
        assert_eq!(config.effective_protocol(), Protocol::Wss);
        assert_eq!(config.url(), "wss://broker:8084/mqtt");

        config.websocket = false;
        assert_eq!(config.effective_protocol(), Protocol::Mqtts);
        assert_eq!(config.url(), "mqtts://broker:8084");

        let explicit = BrokerConfig::new("broker", 1883, "c1").with_protocol(Protocol::Mqtt);
        assert_eq!(explicit.url(), "mqtt://broker:1883");
    }

    #[test]
    fn test_ws_path_normalized() {
        let mut config = BrokerConfig::new("broker", 8083, "c1");
        config.ws_path = "ws".to_string();
        assert_eq!(config.url(), "ws://broker:8083/ws");
    }

    #[test]
    fn test_validate_rejects() {
        assert!(BrokerConfig::new("", 1, "t1").validate().is_err());
        assert!(BrokerConfig::new("test", 0, "t1").validate().is_err());
        assert!(BrokerConfig::new("test", 1, " ").validate().is_err());

        let mut orphan_password = BrokerConfig::new("test", 1, "t1");
        orphan_password.password = Some("secret".to_string());
        assert!(matches!(
            orphan_password.validate(),
            Err(MqttError::InvalidConfig(_))
        ));

        let with_user = BrokerConfig::new("test", 1, "t1").with_credentials("u", Some("p"));
        assert!(with_user.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = BrokerConfig::new("test", 1, "t1").with_credentials("u", Some("hunter2"));
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
