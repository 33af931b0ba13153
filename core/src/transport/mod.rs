//! Transport adapter (C3): the capability seam between the protocol
//! layer and a concrete pub/sub broker connection.
//!
//! [`Transport`] is broker-agnostic; [`mqtt::MqttTransport`] is the one
//! concrete implementation, built on `rumqttc`. Keeping the trait
//! separate from the MQTT specifics lets the dispatcher, publisher and
//! session client depend only on the capability, mirroring how the
//! reference crate's `SonosClient` trait sits in front of its concrete
//! SOAP/GENA client.

pub mod mqtt;

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;

pub use mqtt::MqttTransport;

/// Quality of service level for a publish or subscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl QoS {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::AtMostOnce => 0,
            Self::AtLeastOnce => 1,
            Self::ExactlyOnce => 2,
        }
    }
}

/// Observable connection lifecycle states, broadcast over a
/// [`tokio::sync::watch`] channel so callers can react without polling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// A message arriving on a subscribed topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// A last-will message the broker publishes on this client's behalf if
/// the connection drops uncleanly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LastWillConfig {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

/// TLS material for a [`Transport`] connection.
#[derive(Clone, Debug)]
pub struct TlsConfig {
    pub ca_path: Option<String>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Connection-time options for a [`Transport`], matching the full option
/// table in §4.3.
#[derive(Clone, Debug)]
pub struct TransportOptions {
    pub broker_url: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
    pub tls: Option<TlsConfig>,
    pub keep_alive: Duration,
    /// Whether server-side subscription state persists across reconnects.
    /// When `false`, the transport resubscribes everything on reconnect
    /// regardless of what the broker remembers.
    pub clean_session: bool,
    /// Enables the automatic reconnect-with-backoff loop on connection
    /// loss.
    pub reconnect_on_failure: bool,
    /// QoS used when a publish/subscribe call doesn't specify one.
    pub default_qos: QoS,
    pub last_will: Option<LastWillConfig>,
    /// Base delay for reconnect backoff before jitter is applied.
    pub reconnect_base_delay: Duration,
    /// Upper bound the backoff delay is capped at (`maxReconnectDelaySeconds`).
    pub max_reconnect_delay: Duration,
}

impl TransportOptions {
    #[must_use]
    pub fn new(broker_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            broker_url: broker_url.into(),
            client_id: client_id.into(),
            username: None,
            password: None,
            use_tls: false,
            tls: None,
            keep_alive: crate::protocol_constants::DEFAULT_KEEP_ALIVE,
            clean_session: true,
            reconnect_on_failure: true,
            default_qos: QoS::AtLeastOnce,
            last_will: None,
            reconnect_base_delay: crate::protocol_constants::RECONNECT_BASE_DELAY,
            max_reconnect_delay: crate::protocol_constants::DEFAULT_MAX_RECONNECT_DELAY,
        }
    }
}

/// Errors raised by a [`Transport`] implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    #[error("not connected")]
    NotConnected,
}

/// Convenience alias for transport results.
pub type TransportResult<T> = Result<T, TransportError>;

/// The broker capability consumed by the bridge and the client session.
///
/// Implementations own their reconnect policy; callers only see the
/// resulting [`ConnectionState`] transitions and inbound messages.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Starts connecting in the background. Returns once the initial
    /// connection attempt has been dispatched, not once it succeeds —
    /// watch [`Transport::connection_state`] for the outcome.
    async fn connect(&self) -> TransportResult<()>;

    /// Requests a clean disconnect, publishing any configured will-less
    /// shutdown notice first if the caller does so explicitly via
    /// `publish`.
    async fn disconnect(&self) -> TransportResult<()>;

    /// Publishes `payload` to `topic`.
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> TransportResult<()>;

    /// Subscribes to `topic`. Implementations must remember subscribed
    /// topics and resubscribe automatically after a reconnect.
    async fn subscribe(&self, topic: &str, qos: QoS) -> TransportResult<()>;

    /// Unsubscribes from `topic`.
    async fn unsubscribe(&self, topic: &str) -> TransportResult<()>;

    /// A receiver of connection-state transitions. Every clone observes
    /// the same underlying state.
    fn connection_state(&self) -> watch::Receiver<ConnectionState>;

    /// Returns a fresh receiver of inbound messages on subscribed topics.
    /// Each call returns an independent `broadcast` subscription.
    fn inbound(&self) -> tokio::sync::broadcast::Receiver<InboundMessage>;
}
