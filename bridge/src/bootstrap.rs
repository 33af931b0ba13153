//! Lifecycle & supervision (C8), device side.
//!
//! `bootstrap_bridge` is the composition root: it wires C1-C6 together in
//! the startup order §4.8 specifies and returns a [`BridgeHandle`] whose
//! `shutdown` reverses it. Grounded on the teacher's
//! `bootstrap_services` function.

use std::sync::Arc;
use std::time::Duration;

use amora_core::envelope::{self, Envelope};
use amora_core::error::{AmoraError, AmoraResult};
use amora_core::player::Player;
use amora_core::runtime::TaskSpawner;
use amora_core::topic::{DeviceTopics, TopicKind};
use amora_core::transport::{ConnectionState, MqttTransport, Transport};
use tokio_util::sync::CancellationToken;

use crate::config::BridgeConfig;
use crate::dispatcher::Dispatcher;
use crate::lifecycle::{Lifecycle, ServerLifecycle};
use crate::publisher::Publisher;

/// A running bridge instance. Dropping this does not stop the
/// background tasks — call [`BridgeHandle::shutdown`] explicitly so the
/// offline announcement and LWT race is handled deterministically.
pub struct BridgeHandle {
    transport: Arc<dyn Transport>,
    lifecycle: Arc<ServerLifecycle>,
    topics: DeviceTopics,
}

impl BridgeHandle {
    #[must_use]
    pub fn lifecycle(&self) -> Arc<dyn Lifecycle> {
        self.lifecycle.clone()
    }

    #[must_use]
    pub fn topics(&self) -> &DeviceTopics {
        &self.topics
    }

    /// Reverses the startup order: cancels the dispatcher/publisher
    /// tasks (the publisher best-effort publishes Connection `offline`
    /// as it exits), then disconnects the transport.
    pub async fn shutdown(&self) {
        self.lifecycle.request_shutdown();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = self.transport.disconnect().await;
    }
}

/// Waits for `transport` to reach [`ConnectionState::Connected`],
/// following however many `connecting`/`error` transitions the backoff
/// loop produces along the way.
async fn wait_for_connected(transport: &Arc<dyn Transport>) -> AmoraResult<()> {
    let mut state_rx = transport.connection_state();
    if *state_rx.borrow() == ConnectionState::Connected {
        return Ok(());
    }
    loop {
        state_rx
            .changed()
            .await
            .map_err(|_| AmoraError::TransportUnavailable("connection watch closed".into()))?;
        if *state_rx.borrow() == ConnectionState::Connected {
            return Ok(());
        }
    }
}

/// Wires together C1-C6 for one device namespace and starts the
/// dispatcher and publisher background tasks.
///
/// Startup order per §4.8: construct the transport with LWT set (done by
/// [`BridgeConfig::transport_options`]), connect, subscribe to the
/// commands topic, start the dispatcher loop, start the publisher (which
/// announces Connection `online`).
pub async fn bootstrap_bridge(
    config: BridgeConfig,
    player: Arc<dyn Player>,
    spawner: Arc<dyn TaskSpawner>,
) -> AmoraResult<BridgeHandle> {
    let topics = config.device_topics();
    let qos = config.qos();

    let transport: Arc<dyn Transport> =
        Arc::new(MqttTransport::new(config.transport_options(), spawner.clone()));
    transport.connect().await?;
    wait_for_connected(&transport).await?;

    transport.subscribe(&topics.build(TopicKind::Commands), qos).await?;

    let cancellation = CancellationToken::new();
    let dispatcher = Arc::new(Dispatcher::new(player.clone()));

    spawn_dispatcher_loop(
        dispatcher,
        transport.clone(),
        topics.clone(),
        qos,
        cancellation.clone(),
        spawner.as_ref(),
    );

    let publisher = Arc::new(Publisher::new(
        player,
        transport.clone(),
        topics.clone(),
        config.publisher_intervals(),
        qos,
    ));
    let publisher_cancellation = cancellation.clone();
    spawner.spawn(Box::pin(async move {
        publisher.run(publisher_cancellation).await;
    }));

    Ok(BridgeHandle {
        transport,
        lifecycle: Arc::new(ServerLifecycle::new(cancellation)),
        topics,
    })
}

fn spawn_dispatcher_loop(
    dispatcher: Arc<Dispatcher>,
    transport: Arc<dyn Transport>,
    topics: DeviceTopics,
    qos: amora_core::transport::QoS,
    cancellation: CancellationToken,
    spawner: &dyn TaskSpawner,
) {
    let commands_topic = topics.build(TopicKind::Commands);
    let responses_topic = topics.build(TopicKind::Responses);
    let mut inbound = transport.inbound();

    spawner.spawn(Box::pin(async move {
        loop {
            tokio::select! {
                () = cancellation.cancelled() => break,
                message = inbound.recv() => {
                    let message = match message {
                        Ok(message) => message,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    };
                    if message.topic != commands_topic {
                        continue;
                    }
                    let response = dispatcher.dispatch(&message.payload).await;
                    let bytes = envelope::encode(&Envelope::Response(response));
                    if let Err(err) = transport.publish(&responses_topic, &bytes, qos, false).await {
                        log::warn!("failed to publish response: {err}");
                    }
                }
            }
        }
    }));
}
