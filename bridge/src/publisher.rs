//! Status publisher (C6).
//!
//! A single timer drives three threshold comparisons per §4.6 — the
//! "two overlapping timers" reading in the Design Notes is explicitly
//! rejected. Runs until cancelled via a [`CancellationToken`], at which
//! point it best-effort publishes Connection `offline` and stops.

use std::sync::Arc;
use std::time::{Duration, Instant};

use amora_core::envelope::{self, ConnectionEnvelope, Envelope, StateEnvelope};
use amora_core::player::Player;
use amora_core::player_state::{PlaybackState, PlayerState};
use amora_core::topic::{DeviceTopics, TopicKind};
use amora_core::transport::{ConnectionState, QoS, Transport, TransportResult};
use tokio_util::sync::CancellationToken;

/// Tunable cadence for the status publisher, matching §4.6's three
/// intervals.
#[derive(Clone, Copy, Debug)]
pub struct PublisherIntervals {
    pub position_update: Duration,
    pub update: Duration,
    pub full_update: Duration,
}

impl Default for PublisherIntervals {
    fn default() -> Self {
        Self {
            position_update: amora_core::protocol_constants::DEFAULT_POSITION_UPDATE_INTERVAL,
            update: amora_core::protocol_constants::DEFAULT_UPDATE_INTERVAL,
            full_update: amora_core::protocol_constants::DEFAULT_FULL_UPDATE_INTERVAL,
        }
    }
}

/// Returns whether two snapshots differ in any of the fields that force
/// an immediate full-state publish, per §4.6.
fn full_state_changed(prev: &PlayerState, next: &PlayerState) -> bool {
    prev.state != next.state
        || prev.current_song.as_ref().map(|s| &s.file) != next.current_song.as_ref().map(|s| &s.file)
        || prev.volume != next.volume
        || prev.repeat != next.repeat
        || prev.random != next.random
        || prev.playlist != next.playlist
}

/// The device-side status publisher (C6).
pub struct Publisher {
    player: Arc<dyn Player>,
    transport: Arc<dyn Transport>,
    topics: DeviceTopics,
    intervals: PublisherIntervals,
    qos: QoS,
}

impl Publisher {
    #[must_use]
    pub fn new(
        player: Arc<dyn Player>,
        transport: Arc<dyn Transport>,
        topics: DeviceTopics,
        intervals: PublisherIntervals,
        qos: QoS,
    ) -> Self {
        Self {
            player,
            transport,
            topics,
            intervals,
            qos,
        }
    }

    fn tick_interval(&self) -> Duration {
        self.intervals.position_update.min(self.intervals.update)
    }

    /// Publishes the initial full state and Connection `online`, then
    /// runs the tick loop until `cancellation` fires, publishing
    /// Connection `offline` on the way out.
    pub async fn run(&self, cancellation: CancellationToken) {
        self.publish_startup().await;

        let mut last_published: Option<PlayerState> = None;
        let mut last_publish_at: Option<Instant> = None;
        let mut ticker = tokio::time::interval(self.tick_interval());

        loop {
            tokio::select! {
                () = cancellation.cancelled() => {
                    self.publish_shutdown().await;
                    break;
                }
                _ = ticker.tick() => {
                    self.tick(&mut last_published, &mut last_publish_at).await;
                }
            }
        }
    }

    async fn tick(&self, last_published: &mut Option<PlayerState>, last_publish_at: &mut Option<Instant>) {
        if *self.transport.connection_state().borrow() != ConnectionState::Connected {
            return;
        }

        let status = match self.player.get_status().await {
            Ok(status) => status,
            Err(err) => {
                log::warn!("status publisher: getStatus failed, skipping tick: {err}");
                return;
            }
        };

        let now = Instant::now();
        let should_publish = match last_published.as_ref() {
            None => true,
            Some(prev) => {
                let position_trigger = status.state == PlaybackState::Playing
                    && last_publish_at.map_or(true, |t| now.duration_since(t) >= self.intervals.position_update);
                let periodic_trigger =
                    last_publish_at.map_or(true, |t| now.duration_since(t) >= self.intervals.full_update);
                full_state_changed(prev, &status) || position_trigger || periodic_trigger
            }
        };

        if !should_publish {
            return;
        }

        match self.publish_state(&status).await {
            Ok(()) => {
                *last_published = Some(status);
                *last_publish_at = Some(now);
            }
            Err(err) => log::warn!("status publisher: publish failed: {err}"),
        }
    }

    async fn publish_startup(&self) {
        match self.player.get_status().await {
            Ok(status) => {
                if let Err(err) = self.publish_state(&status).await {
                    log::warn!("status publisher: initial publish failed: {err}");
                }
            }
            Err(err) => log::warn!("status publisher: initial getStatus failed: {err}"),
        }
        if let Err(err) = self.publish_connection(ConnectionEnvelope::online()).await {
            log::warn!("status publisher: online announcement failed: {err}");
        }
    }

    async fn publish_shutdown(&self) {
        if let Err(err) = self.publish_connection(ConnectionEnvelope::offline()).await {
            log::warn!("status publisher: offline announcement failed: {err}");
        }
    }

    async fn publish_state(&self, state: &PlayerState) -> TransportResult<()> {
        let envelope = StateEnvelope::new(state.clone());
        let bytes = envelope::encode(&Envelope::State(envelope));
        self.transport
            .publish(&self.topics.build(TopicKind::State), &bytes, self.qos, true)
            .await
    }

    async fn publish_connection(&self, envelope: ConnectionEnvelope) -> TransportResult<()> {
        let bytes = envelope::encode(&Envelope::Connection(envelope));
        self.transport
            .publish(&self.topics.build(TopicKind::Connection), &bytes, self.qos, true)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amora_core::player_state::SongMeta;

    #[test]
    fn identical_states_do_not_trigger_full_state_change() {
        let a = PlayerState::unknown();
        let b = PlayerState::unknown();
        assert!(!full_state_changed(&a, &b));
    }

    #[test]
    fn volume_change_triggers_full_state_change() {
        let a = PlayerState::unknown();
        let mut b = PlayerState::unknown();
        b.volume = 70;
        assert!(full_state_changed(&a, &b));
    }

    #[test]
    fn track_file_change_triggers_full_state_change_even_if_playback_state_matches() {
        let mut a = PlayerState::unknown();
        a.state = PlaybackState::Playing;
        a.current_song = Some(SongMeta {
            title: "A".into(),
            artist: "A".into(),
            album: "A".into(),
            file: "a.mp3".into(),
            duration_seconds: 180.0,
            position_seconds: 0.0,
            is_current: true,
        });
        let mut b = a.clone();
        b.current_song.as_mut().unwrap().file = "b.mp3".into();
        assert!(full_state_changed(&a, &b));
    }

    #[test]
    fn position_only_change_does_not_trigger_full_state_change() {
        let mut a = PlayerState::unknown();
        a.state = PlaybackState::Playing;
        a.current_song = Some(SongMeta {
            title: "A".into(),
            artist: "A".into(),
            album: "A".into(),
            file: "a.mp3".into(),
            duration_seconds: 180.0,
            position_seconds: 10.0,
            is_current: true,
        });
        let mut b = a.clone();
        b.current_song.as_mut().unwrap().position_seconds = 11.0;
        assert!(!full_state_changed(&a, &b));
    }
}
