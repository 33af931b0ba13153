//! Bridge configuration: the single initialization structure from §6
//! (transport options plus `topicPrefix`, `deviceId`, the publisher
//! intervals, and `commandTimeoutSeconds` carried for parity with the
//! session-side config surface even though the bridge itself never
//! consumes it). Loaded from an optional YAML file with `AMORA_*`
//! environment overrides, mirroring the teacher's
//! `ServerConfig::load`/`apply_env_overrides`.

use std::env;
use std::path::Path;
use std::time::Duration;

use amora_core::envelope::{encode, ConnectionEnvelope, Envelope};
use amora_core::topic::{DeviceTopics, TopicKind, DEFAULT_TOPIC_PREFIX};
use amora_core::transport::{LastWillConfig, QoS, TlsConfig, TransportOptions};
use serde::{Deserialize, Serialize};

use crate::publisher::PublisherIntervals;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, source: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    pub broker_url: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
    pub ca_path: Option<String>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
    pub keep_alive_seconds: u64,
    pub clean_session: bool,
    pub reconnect_on_failure: bool,
    pub default_qos: u8,
    pub max_reconnect_delay_seconds: u64,

    pub topic_prefix: String,
    pub device_id: String,

    pub command_timeout_seconds: u64,

    pub position_update_interval_seconds: f64,
    pub update_interval_seconds: f64,
    pub full_update_interval_seconds: f64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        use amora_core::protocol_constants as defaults;
        Self {
            broker_url: "localhost:1883".to_string(),
            client_id: "amora-bridge".to_string(),
            username: None,
            password: None,
            use_tls: false,
            ca_path: None,
            cert_path: None,
            key_path: None,
            keep_alive_seconds: defaults::DEFAULT_KEEP_ALIVE.as_secs(),
            clean_session: true,
            reconnect_on_failure: true,
            default_qos: defaults::DEFAULT_QOS,
            max_reconnect_delay_seconds: defaults::DEFAULT_MAX_RECONNECT_DELAY.as_secs(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            device_id: "device".to_string(),
            command_timeout_seconds: defaults::DEFAULT_COMMAND_TIMEOUT.as_secs(),
            position_update_interval_seconds: defaults::DEFAULT_POSITION_UPDATE_INTERVAL.as_secs_f64(),
            update_interval_seconds: defaults::DEFAULT_UPDATE_INTERVAL.as_secs_f64(),
            full_update_interval_seconds: defaults::DEFAULT_FULL_UPDATE_INTERVAL.as_secs_f64(),
        }
    }
}

impl BridgeConfig {
    /// Loads config from `path` if given, falling back to defaults, then
    /// applies any `AMORA_*` environment variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => {
                let contents = std::fs::read_to_string(p).map_err(|source| ConfigError::Io {
                    path: p.display().to_string(),
                    source,
                })?;
                serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: p.display().to_string(),
                    source: source.to_string(),
                })?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("AMORA_BROKER_URL") {
            self.broker_url = v;
        }
        if let Ok(v) = env::var("AMORA_CLIENT_ID") {
            self.client_id = v;
        }
        if let Ok(v) = env::var("AMORA_USERNAME") {
            self.username = Some(v);
        }
        if let Ok(v) = env::var("AMORA_PASSWORD") {
            self.password = Some(v);
        }
        if let Ok(v) = env::var("AMORA_DEVICE_ID") {
            self.device_id = v;
        }
        if let Ok(v) = env::var("AMORA_TOPIC_PREFIX") {
            self.topic_prefix = v;
        }
        if let Ok(v) = env::var("AMORA_USE_TLS") {
            self.use_tls = v == "1" || v.eq_ignore_ascii_case("true");
        }
    }

    #[must_use]
    pub fn qos(&self) -> QoS {
        match self.default_qos {
            0 => QoS::AtMostOnce,
            2 => QoS::ExactlyOnce,
            _ => QoS::AtLeastOnce,
        }
    }

    #[must_use]
    pub fn device_topics(&self) -> DeviceTopics {
        DeviceTopics::new(self.topic_prefix.clone(), self.device_id.clone())
    }

    fn last_will(&self) -> LastWillConfig {
        let topics = self.device_topics();
        LastWillConfig {
            topic: topics.build(TopicKind::Connection),
            payload: encode(&Envelope::Connection(ConnectionEnvelope::offline())),
            qos: self.qos(),
            retain: true,
        }
    }

    /// Builds the [`TransportOptions`] this config describes, including
    /// the retained-offline last-will per §4.8's startup ordering.
    #[must_use]
    pub fn transport_options(&self) -> TransportOptions {
        let mut options = TransportOptions::new(self.broker_url.clone(), self.client_id.clone());
        options.username = self.username.clone();
        options.password = self.password.clone();
        options.use_tls = self.use_tls;
        if self.use_tls {
            options.tls = Some(TlsConfig {
                ca_path: self.ca_path.clone(),
                cert_path: self.cert_path.clone(),
                key_path: self.key_path.clone(),
            });
        }
        options.keep_alive = Duration::from_secs(self.keep_alive_seconds);
        options.clean_session = self.clean_session;
        options.reconnect_on_failure = self.reconnect_on_failure;
        options.default_qos = self.qos();
        options.max_reconnect_delay = Duration::from_secs(self.max_reconnect_delay_seconds);
        options.last_will = Some(self.last_will());
        options
    }

    #[must_use]
    pub fn publisher_intervals(&self) -> PublisherIntervals {
        PublisherIntervals {
            position_update: Duration::from_secs_f64(self.position_update_interval_seconds),
            update: Duration::from_secs_f64(self.update_interval_seconds),
            full_update: Duration::from_secs_f64(self.full_update_interval_seconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_uses_spec_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.topic_prefix, "amora/devices");
        assert_eq!(config.default_qos, 1);
        assert_eq!(config.full_update_interval_seconds, 5.0);
    }

    #[test]
    fn last_will_decodes_to_offline_connection_envelope() {
        let config = BridgeConfig::default();
        let will = config.last_will();
        assert!(will.retain);
        match amora_core::envelope::decode(&will.payload).unwrap() {
            Envelope::Connection(c) => assert!(!c.is_online()),
            other => panic!("expected Connection, got {other:?}"),
        }
    }

    #[test]
    fn parses_yaml_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.yaml");
        std::fs::write(&path, "brokerUrl: \"broker.example.com:1883\"\ndeviceId: \"kitchen-pi\"\n").unwrap();
        let config = BridgeConfig::load(Some(&path)).unwrap();
        assert_eq!(config.broker_url, "broker.example.com:1883");
        assert_eq!(config.device_id, "kitchen-pi");
        // Unspecified fields keep their defaults.
        assert_eq!(config.topic_prefix, "amora/devices");
    }

    #[test]
    fn missing_config_file_is_an_io_error() {
        let err = BridgeConfig::load(Some(Path::new("/nonexistent/bridge.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
