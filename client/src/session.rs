//! Session client (C7): client-side state cache, command correlation,
//! and event source built on top of a [`Transport`].
//!
//! Grounded on the teacher's `SonosClient` for the "single shared handle
//! guarding its own cached state, a background task reacting to
//! transport events" shape. Command correlation is modeled on
//! `GenaSubscriptionStore`'s guarded-map-plus-sweep pattern
//! ([`crate::pending::PendingCommands`]); event delivery is modeled on
//! `BroadcastEventBridge` ([`crate::events::SessionEventBridge`]).

use std::sync::Arc;
use std::time::Duration;

use amora_core::envelope::{self, CommandEnvelope, Envelope, ResponseEnvelope};
use amora_core::error::{AmoraError, AmoraResult};
use amora_core::player::PlaylistInfo;
use amora_core::player_state::PlayerState;
use amora_core::protocol_constants::PENDING_SWEEP_INTERVAL;
use amora_core::topic::{DeviceTopics, TopicKind};
use amora_core::transport::{ConnectionState, InboundMessage, QoS, Transport};
use parking_lot::RwLock;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::events::{SessionConnectionStatus, SessionEvent, SessionEventBridge};
use crate::pending::{PendingCommands, PendingOutcome};

/// The client-side half of the protocol (C7): caches last-known state and
/// playlists, issues commands with response correlation and timeouts, and
/// emits [`SessionEvent`]s as things change.
pub struct SessionClient {
    transport: Arc<dyn Transport>,
    topics: DeviceTopics,
    qos: QoS,
    clean_session: bool,
    command_timeout: Duration,
    last_state: RwLock<Option<PlayerState>>,
    playlists: RwLock<Option<Vec<PlaylistInfo>>>,
    pending: PendingCommands,
    events: SessionEventBridge,
}

impl SessionClient {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        topics: DeviceTopics,
        qos: QoS,
        clean_session: bool,
        command_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            topics,
            qos,
            clean_session,
            command_timeout,
            last_state: RwLock::new(None),
            playlists: RwLock::new(None),
            pending: PendingCommands::new(),
            events: SessionEventBridge::default(),
        }
    }

    #[must_use]
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn get_connection_status(&self) -> SessionConnectionStatus {
        match *self.transport.connection_state().borrow() {
            ConnectionState::Connected => SessionConnectionStatus::Connected,
            ConnectionState::Connecting => SessionConnectionStatus::Connecting,
            ConnectionState::Disconnected | ConnectionState::Error => SessionConnectionStatus::Disconnected,
        }
    }

    #[must_use]
    pub fn get_cached_player_state(&self) -> Option<PlayerState> {
        self.last_state.read().clone()
    }

    #[must_use]
    pub fn get_cached_playlists(&self) -> Option<Vec<PlaylistInfo>> {
        self.playlists.read().clone()
    }

    /// Connects the transport, subscribes to this device's state and
    /// responses topics, and primes `lastState` via `getStatus`, per
    /// §4.7's connect sequence.
    pub async fn connect(&self) -> AmoraResult<()> {
        self.transport.connect().await?;
        self.subscribe_topics().await?;
        self.prime_state().await;
        Ok(())
    }

    async fn subscribe_topics(&self) -> AmoraResult<()> {
        self.transport
            .subscribe(&self.topics.build(TopicKind::State), self.qos)
            .await?;
        self.transport
            .subscribe(&self.topics.build(TopicKind::Responses), self.qos)
            .await?;
        Ok(())
    }

    async fn prime_state(&self) {
        match self.get_status().await {
            Ok(state) => *self.last_state.write() = Some(state),
            Err(err) => log::warn!("session: failed to prime state: {err}"),
        }
    }

    /// Rejects every pending command with `Disconnected`, then
    /// disconnects the transport, per §4.7 point 5.
    pub async fn disconnect(&self) -> AmoraResult<()> {
        self.pending.reject_all();
        self.transport.disconnect().await?;
        Ok(())
    }

    /// Runs until `cancellation` fires: routes inbound messages, reacts to
    /// reconnects (re-subscribing and re-priming state), and sweeps
    /// expired pending commands at 1 Hz (§4.7 point 4).
    pub async fn run(&self, cancellation: CancellationToken) {
        let mut inbound = self.transport.inbound();
        let mut connection_rx = self.transport.connection_state();
        let mut was_connected = *connection_rx.borrow() == ConnectionState::Connected;
        let mut sweep = tokio::time::interval(PENDING_SWEEP_INTERVAL);

        loop {
            tokio::select! {
                () = cancellation.cancelled() => {
                    self.pending.reject_all();
                    break;
                }
                message = inbound.recv() => {
                    match message {
                        Ok(message) => self.handle_inbound(message),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
                changed = connection_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let now_connected = *connection_rx.borrow() == ConnectionState::Connected;
                    if now_connected && !was_connected {
                        self.handle_reconnect().await;
                    } else if !now_connected && was_connected {
                        self.events.emit(SessionEvent::ConnectionChange(SessionConnectionStatus::Disconnected));
                    }
                    was_connected = now_connected;
                }
                _ = sweep.tick() => {
                    for command_id in self.pending.sweep_expired(self.command_timeout) {
                        log::debug!("session: command {command_id} timed out");
                        self.events.emit(SessionEvent::Error(format!("command {command_id} timed out")));
                    }
                }
            }
        }
    }

    async fn handle_reconnect(&self) {
        if self.clean_session {
            if let Err(err) = self.subscribe_topics().await {
                log::warn!("session: resubscribe after reconnect failed: {err}");
            }
        }
        self.prime_state().await;
        self.events
            .emit(SessionEvent::ConnectionChange(SessionConnectionStatus::Connected));
    }

    fn handle_inbound(&self, message: InboundMessage) {
        match envelope::decode(&message.payload) {
            Ok(Envelope::State(state_envelope)) => self.handle_state(state_envelope.state),
            Ok(Envelope::Response(response)) => self.handle_response(response),
            Ok(Envelope::Connection(_) | Envelope::Command(_)) => {
                // Not consumed by the session per §4.7 — Connection
                // presence is read off the transport's own connection
                // state, and devices never receive Command envelopes.
            }
            Err(err) => log::debug!("session: dropping malformed message on {}: {err}", message.topic),
        }
    }

    fn handle_state(&self, next: PlayerState) {
        let previous = self.last_state.write().replace(next.clone());
        let next_position = next.current_song.as_ref().map(|s| s.position_seconds);

        match previous {
            None => {
                self.events.emit(SessionEvent::StateChange(next.state));
                if let Some(position) = next_position {
                    self.events.emit(SessionEvent::PositionChange(position));
                }
                self.events.emit(SessionEvent::VolumeChange(next.volume));
            }
            Some(prev) => {
                if prev.state != next.state {
                    self.events.emit(SessionEvent::StateChange(next.state));
                }
                let prev_position = prev.current_song.as_ref().map(|s| s.position_seconds);
                if prev_position != next_position {
                    if let Some(position) = next_position {
                        self.events.emit(SessionEvent::PositionChange(position));
                    }
                }
                if prev.volume != next.volume {
                    self.events.emit(SessionEvent::VolumeChange(next.volume));
                }
            }
        }
    }

    fn handle_response(&self, response: ResponseEnvelope) {
        if let Some(playlists_value) = response.data.as_ref().and_then(|d| d.get("playlists")) {
            match serde_json::from_value::<Vec<PlaylistInfo>>(playlists_value.clone()) {
                Ok(playlists) => {
                    *self.playlists.write() = Some(playlists.clone());
                    self.events.emit(SessionEvent::PlaylistChange(playlists));
                }
                Err(err) => log::debug!("session: response carried unparseable playlists: {err}"),
            }
        }

        let matched = self.pending.resolve(response.clone());
        if !matched {
            log::debug!("session: response for command {} has no pending entry, discarding", response.command_id);
        }
        self.events.emit(SessionEvent::CommandResponse(response));
    }

    /// Issues `command` with `params`, following §4.7's command-issuing
    /// protocol: register, publish, await the correlated Response, racing
    /// it against `commandTimeout`.
    ///
    /// The per-call race (rather than relying solely on `run`'s 1 Hz
    /// sweep) is deliberate: `prime_state` calls this from inside the
    /// reconnect handler in `run`'s own select loop, and that loop also
    /// owns the sweep timer — waiting only on the sweep to resolve this
    /// future would deadlock the loop against itself. The sweep still
    /// runs to reclaim entries whose caller dropped the future without
    /// polling it to completion.
    pub(crate) async fn send_command(&self, command: &str, params: Option<Value>) -> AmoraResult<Option<Value>> {
        let mut envelope = CommandEnvelope::new(command, params);
        let command_id = Uuid::new_v4().to_string();
        envelope.command_id = command_id.clone();

        let receiver = self.pending.register(command_id.clone());
        let bytes = envelope::encode(&Envelope::Command(envelope));

        if let Err(err) = self
            .transport
            .publish(&self.topics.build(TopicKind::Commands), &bytes, self.qos, false)
            .await
        {
            self.pending.remove(&command_id);
            return Err(err.into());
        }

        tokio::select! {
            outcome = receiver => match outcome {
                Ok(Ok(response)) => {
                    if response.result {
                        Ok(response.data)
                    } else {
                        Err(AmoraError::HandlerFailure(response.message))
                    }
                }
                Ok(Err(PendingOutcome::Disconnected)) => Err(AmoraError::Disconnected),
                Err(_) => Err(AmoraError::Timeout),
            },
            () = tokio::time::sleep(self.command_timeout) => {
                self.pending.remove(&command_id);
                Err(AmoraError::Timeout)
            }
        }
    }
}
