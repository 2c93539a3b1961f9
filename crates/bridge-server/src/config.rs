//! Server configuration.

use std::time::Duration;

use bridge_settings::BridgeSettings;
use serde::{Deserialize, Serialize};

/// Configuration for the bridge server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Shared secret; empty disables authentication.
    pub auth_token: String,
    /// Log every payload and delivery at debug level.
    pub debug: bool,
    /// Heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Heartbeat timeout in seconds (close after this long without a pong).
    pub heartbeat_timeout_secs: u64,
    /// Outbound queue depth per connection.
    pub send_queue_capacity: usize,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            auth_token: String::new(),
            debug: false,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            send_queue_capacity: 256,
            max_message_size: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether clients must present the shared secret.
    pub fn auth_enabled(&self) -> bool {
        !self.auth_token.is_empty()
    }

    /// Heartbeat ping interval.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Heartbeat timeout.
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }
}

impl From<&BridgeSettings> for ServerConfig {
    fn from(settings: &BridgeSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            auth_token: settings.auth_token.clone(),
            debug: settings.debug,
            heartbeat_interval_secs: settings.heartbeat_interval_secs,
            heartbeat_timeout_secs: settings.heartbeat_timeout_secs,
            send_queue_capacity: settings.send_queue_capacity,
            max_message_size: settings.max_message_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 0);
        assert!(!cfg.auth_enabled());
        assert!(!cfg.debug);
        assert_eq!(cfg.heartbeat_interval(), Duration::from_secs(30));
        assert_eq!(cfg.heartbeat_timeout(), Duration::from_secs(90));
        assert_eq!(cfg.send_queue_capacity, 256);
        assert_eq!(cfg.max_message_size, 16 * 1024 * 1024);
    }

    #[test]
    fn bind_address_format() {
        let cfg = ServerConfig {
            host: "0.0.0.0".into(),
            port: 9696,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.bind_address(), "0.0.0.0:9696");
    }

    #[test]
    fn from_settings() {
        let settings = BridgeSettings {
            host: "example.local".into(),
            port: 1234,
            auth_token: "pw".into(),
            debug: true,
            heartbeat_interval_secs: 5,
            heartbeat_timeout_secs: 15,
            send_queue_capacity: 8,
            max_message_size: 1024,
            shutdown_timeout_secs: 1,
        };
        let cfg = ServerConfig::from(&settings);
        assert_eq!(cfg.host, "example.local");
        assert_eq!(cfg.port, 1234);
        assert!(cfg.auth_enabled());
        assert!(cfg.debug);
        assert_eq!(cfg.heartbeat_interval_secs, 5);
        assert_eq!(cfg.heartbeat_timeout_secs, 15);
        assert_eq!(cfg.send_queue_capacity, 8);
        assert_eq!(cfg.max_message_size, 1024);
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = ServerConfig {
            auth_token: "secret".into(),
            ..ServerConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.host, cfg.host);
        assert_eq!(back.auth_token, "secret");
        assert_eq!(back.max_message_size, cfg.max_message_size);
    }
}
