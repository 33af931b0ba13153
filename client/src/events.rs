//! Session event types and the broadcast bridge that delivers them.
//!
//! Grounded on the teacher's `events::BroadcastEvent` enum and
//! `BroadcastEventBridge`: a single `Clone`-able sender wrapping a
//! `tokio::sync::broadcast` channel, adapted from the teacher's
//! multi-domain event taxonomy down to this session's seven event kinds
//! (§4.7).

use amora_core::envelope::ResponseEnvelope;
use amora_core::player::PlaylistInfo;
use amora_core::player_state::PlaybackState;
use tokio::sync::broadcast;

/// Mirrors [`amora_core::transport::ConnectionState`] but collapses
/// `Error` into `Disconnected` — the session only distinguishes the three
/// states §4.7 names for `connectionStatus`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Events a [`crate::session::SessionClient`] emits as cached state
/// changes or commands complete, matching §4.7's observer list.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    StateChange(PlaybackState),
    PositionChange(f64),
    VolumeChange(u8),
    PlaylistChange(Vec<PlaylistInfo>),
    ConnectionChange(SessionConnectionStatus),
    CommandResponse(ResponseEnvelope),
    Error(String),
}

/// Bridges session-internal state changes to a broadcast channel that
/// callers subscribe to, matching the teacher's `BroadcastEventBridge`.
#[derive(Clone)]
pub struct SessionEventBridge {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEventBridge {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: SessionEvent) {
        if let Err(err) = self.tx.send(event) {
            log::trace!("session event bridge: no receivers: {err}");
        }
    }
}

impl Default for SessionEventBridge {
    fn default() -> Self {
        Self::new(256)
    }
}
