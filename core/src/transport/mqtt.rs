//! Concrete [`Transport`] backed by `rumqttc`.
//!
//! Reconnection is handled by driving `rumqttc`'s `EventLoop` in a
//! background task: a poll error moves the connection state to `Error`,
//! waits out an exponential backoff with jitter (grounded on the
//! `with_retry` backoff helper in the reference crate), then lets the
//! next `poll()` attempt the reconnect. A successful `ConnAck` resets the
//! backoff counter and resubscribes every topic this transport has ever
//! been asked to subscribe to, since `rumqttc` does not remember
//! subscriptions across a dropped session.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use rumqttc::{
    AsyncClient, Event, Incoming, LastWill, MqttOptions, QoS as MqttQoS, TlsConfiguration,
    Transport as RumqttcTransport,
};
use tokio::sync::{broadcast, watch};

use super::{
    ConnectionState, InboundMessage, QoS, TlsConfig, Transport, TransportError, TransportOptions,
    TransportResult,
};
use crate::runtime::TaskSpawner;

const INBOUND_CHANNEL_CAPACITY: usize = 256;

fn to_mqtt_qos(qos: QoS) -> MqttQoS {
    match qos {
        QoS::AtMostOnce => MqttQoS::AtMostOnce,
        QoS::AtLeastOnce => MqttQoS::AtLeastOnce,
        QoS::ExactlyOnce => MqttQoS::ExactlyOnce,
    }
}

/// Splits a `host:port` or `scheme://host:port` broker URL. Defaults to
/// port 1883 when no port is given.
fn parse_broker_url(url: &str) -> (String, u16) {
    let stripped = url.rsplit("://").next().unwrap_or(url);
    match stripped.rsplit_once(':') {
        Some((host, port)) => (host.to_string(), port.parse().unwrap_or(1883)),
        None => (stripped.to_string(), 1883),
    }
}

/// Builds a rumqttc TLS transport from the configured cert paths,
/// reading each file best-effort: a missing or unreadable path is logged
/// and treated as absent rather than failing construction, matching the
/// "best effort" posture the spec takes toward auxiliary I/O elsewhere.
fn build_tls_transport(tls: Option<&TlsConfig>) -> RumqttcTransport {
    let read = |path: &Option<String>| -> Vec<u8> {
        path.as_ref()
            .and_then(|p| match std::fs::read(p) {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    log::warn!("failed to read TLS file {p}: {err}");
                    None
                }
            })
            .unwrap_or_default()
    };

    let ca = tls.map(|t| read(&t.ca_path)).unwrap_or_default();
    let client_auth = tls.and_then(|t| {
        if t.cert_path.is_some() && t.key_path.is_some() {
            Some((read(&t.cert_path), read(&t.key_path)))
        } else {
            None
        }
    });

    RumqttcTransport::Tls(TlsConfiguration::Simple {
        ca,
        alpn: None,
        client_auth,
    })
}

/// Doubles `base` per attempt up to `max`, then jitters by up to 20% so
/// many devices reconnecting at once don't hammer the broker in lockstep.
fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let capped_attempt = attempt.min(16);
    let exp = base.saturating_mul(1u32 << capped_attempt);
    let capped = exp.min(max);
    let jitter_frac = rand::thread_rng().gen_range(0.0..0.2);
    capped.mul_f64(1.0 + jitter_frac)
}

/// An MQTT-backed [`Transport`].
pub struct MqttTransport {
    client: AsyncClient,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    inbound_tx: broadcast::Sender<InboundMessage>,
    subscriptions: Arc<Mutex<HashSet<(String, QoS)>>>,
}

impl MqttTransport {
    /// Builds a transport and immediately spawns its event loop driver
    /// via `spawner`. The connection itself isn't attempted until
    /// [`Transport::connect`] is called.
    #[must_use]
    pub fn new(options: TransportOptions, spawner: Arc<dyn TaskSpawner>) -> Self {
        let (host, port) = parse_broker_url(&options.broker_url);
        let mut mqtt_options = MqttOptions::new(options.client_id.clone(), host, port);
        mqtt_options.set_keep_alive(options.keep_alive);
        mqtt_options.set_clean_session(options.clean_session);
        if let (Some(username), Some(password)) = (&options.username, &options.password) {
            mqtt_options.set_credentials(username.clone(), password.clone());
        }
        if options.use_tls {
            mqtt_options.set_transport(build_tls_transport(options.tls.as_ref()));
        }
        if let Some(will) = &options.last_will {
            mqtt_options.set_last_will(LastWill::new(
                &will.topic,
                will.payload.clone(),
                to_mqtt_qos(will.qos),
                will.retain,
            ));
        }

        let (client, eventloop) = AsyncClient::new(mqtt_options, 64);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (inbound_tx, _) = broadcast::channel(INBOUND_CHANNEL_CAPACITY);
        let subscriptions = Arc::new(Mutex::new(HashSet::new()));

        let transport = Self {
            client,
            state_tx,
            state_rx,
            inbound_tx,
            subscriptions,
        };

        transport.spawn_event_loop(
            eventloop,
            options.reconnect_base_delay,
            options.max_reconnect_delay,
            options.reconnect_on_failure,
            spawner,
        );
        transport
    }

    fn spawn_event_loop(
        &self,
        mut eventloop: rumqttc::EventLoop,
        base_delay: Duration,
        max_delay: Duration,
        reconnect_on_failure: bool,
        spawner: Arc<dyn TaskSpawner>,
    ) {
        let state_tx = self.state_tx.clone();
        let inbound_tx = self.inbound_tx.clone();
        let subscriptions = self.subscriptions.clone();
        let client = self.client.clone();

        spawner.spawn(Box::pin(async move {
            let mut attempt: u32 = 0;
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        attempt = 0;
                        let _ = state_tx.send(ConnectionState::Connected);
                        let subs: Vec<(String, QoS)> =
                            subscriptions.lock().iter().cloned().collect();
                        for (topic, qos) in subs {
                            if let Err(err) = client.subscribe(&topic, to_mqtt_qos(qos)).await {
                                log::warn!("resubscribe to {topic} failed: {err}");
                            }
                        }
                    }
                    Ok(Event::Incoming(Incoming::Publish(publish))) => {
                        let _ = inbound_tx.send(InboundMessage {
                            topic: publish.topic,
                            payload: publish.payload.to_vec(),
                        });
                    }
                    Ok(_) => {}
                    Err(err) => {
                        log::warn!("mqtt event loop error: {err}");
                        let _ = state_tx.send(ConnectionState::Error);
                        if !reconnect_on_failure {
                            let _ = state_tx.send(ConnectionState::Disconnected);
                            break;
                        }
                        let delay = backoff_delay(attempt, base_delay, max_delay);
                        attempt = attempt.saturating_add(1);
                        tokio::time::sleep(delay).await;
                        let _ = state_tx.send(ConnectionState::Connecting);
                    }
                }
            }
        }));
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn connect(&self) -> TransportResult<()> {
        let _ = self.state_tx.send(ConnectionState::Connecting);
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        self.client
            .disconnect()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;
        let _ = self.state_tx.send(ConnectionState::Disconnected);
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> TransportResult<()> {
        if *self.state_rx.borrow() != ConnectionState::Connected {
            return Err(TransportError::NotConnected);
        }
        self.client
            .publish(topic, to_mqtt_qos(qos), retain, payload.to_vec())
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))
    }

    async fn subscribe(&self, topic: &str, qos: QoS) -> TransportResult<()> {
        if *self.state_rx.borrow() != ConnectionState::Connected {
            return Err(TransportError::NotConnected);
        }
        self.subscriptions.lock().insert((topic.to_string(), qos));
        self.client
            .subscribe(topic, to_mqtt_qos(qos))
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))
    }

    async fn unsubscribe(&self, topic: &str) -> TransportResult<()> {
        self.subscriptions.lock().retain(|(t, _)| t != topic);
        self.client
            .unsubscribe(topic)
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))
    }

    fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    fn inbound(&self) -> broadcast::Receiver<InboundMessage> {
        self.inbound_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_bare_host_port() {
        assert_eq!(parse_broker_url("localhost:1883"), ("localhost".to_string(), 1883));
    }

    #[test]
    fn parses_scheme_prefixed_url() {
        assert_eq!(parse_broker_url("mqtt://broker.local:8883"), ("broker.local".to_string(), 8883));
    }

    #[test]
    fn defaults_missing_port_to_1883() {
        assert_eq!(parse_broker_url("broker.local"), ("broker.local".to_string(), 1883));
    }

    #[test]
    fn backoff_grows_then_caps_at_max() {
        let base = Duration::from_millis(500);
        let max = Duration::from_secs(10);
        let first = backoff_delay(0, base, max);
        let later = backoff_delay(20, base, max);
        assert!(first >= base && first <= base.mul_f64(1.2));
        assert!(later <= max.mul_f64(1.2));
    }
}
