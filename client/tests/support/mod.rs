//! An in-memory [`Transport`] double for client-side integration tests,
//! duplicated per-crate per SPEC_FULL.md's test-tooling convention rather
//! than shared across crates, matching how the teacher keeps test doubles
//! local to the crate under test.

use amora_core::transport::{ConnectionState, InboundMessage, QoS, Transport, TransportError, TransportResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};

pub struct FakeTransport {
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    inbound_tx: broadcast::Sender<InboundMessage>,
    published: Mutex<Vec<(String, Vec<u8>, QoS, bool)>>,
    subscriptions: Mutex<Vec<String>>,
    fail_publish: Mutex<bool>,
}

impl FakeTransport {
    #[must_use]
    pub fn new() -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (inbound_tx, _) = broadcast::channel(256);
        Self {
            state_tx,
            state_rx,
            inbound_tx,
            published: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
            fail_publish: Mutex::new(false),
        }
    }

    pub fn set_connected(&self) {
        let _ = self.state_tx.send(ConnectionState::Connected);
    }

    pub fn set_disconnected(&self) {
        let _ = self.state_tx.send(ConnectionState::Disconnected);
    }

    pub fn set_fail_publish(&self, fail: bool) {
        *self.fail_publish.lock() = fail;
    }

    /// Injects an inbound message as if it had just arrived on the wire.
    pub fn deliver(&self, topic: impl Into<String>, payload: Vec<u8>) {
        let _ = self.inbound_tx.send(InboundMessage {
            topic: topic.into(),
            payload,
        });
    }

    pub fn published_messages(&self) -> Vec<(String, Vec<u8>, QoS, bool)> {
        self.published.lock().clone()
    }

    pub fn is_subscribed_to(&self, topic: &str) -> bool {
        self.subscriptions.lock().iter().any(|t| t == topic)
    }
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self) -> TransportResult<()> {
        let _ = self.state_tx.send(ConnectionState::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        let _ = self.state_tx.send(ConnectionState::Disconnected);
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> TransportResult<()> {
        if *self.fail_publish.lock() {
            return Err(TransportError::NotConnected);
        }
        if *self.state_rx.borrow() != ConnectionState::Connected {
            return Err(TransportError::NotConnected);
        }
        self.published.lock().push((topic.to_string(), payload.to_vec(), qos, retain));
        Ok(())
    }

    async fn subscribe(&self, topic: &str, _qos: QoS) -> TransportResult<()> {
        self.subscriptions.lock().push(topic.to_string());
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> TransportResult<()> {
        self.subscriptions.lock().retain(|t| t != topic);
        Ok(())
    }

    fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    fn inbound(&self) -> broadcast::Receiver<InboundMessage> {
        self.inbound_tx.subscribe()
    }
}
