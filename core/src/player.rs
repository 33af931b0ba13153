//! The `Player` capability interface (C4): the seam between the bridge's
//! dispatcher/publisher and whatever local daemon actually controls
//! playback. Grounded on the combined-trait-plus-blanket-impl shape used
//! for `SonosClient`/`SonosPlayback` in the reference crate, adapted to a
//! single flat trait since this protocol has no separate
//! discovery/playback split.

use async_trait::async_trait;

use crate::player_state::{PlayerState, SongMeta};

/// An error raised by a `Player` implementation.
///
/// Carries only a human-readable message; the dispatcher folds this into
/// a `ResponseEnvelope` with `result: false` and this string as
/// `message`, so implementations don't need to know about the wire
/// format.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct PlayerError(pub String);

impl PlayerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Convenience alias for results returned by `Player` methods.
pub type PlayerResult<T> = Result<T, PlayerError>;

/// A playlist and its contained tracks, as returned by `getPlaylists` and
/// `getPlaylistSongs`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistInfo {
    pub name: String,
    pub items: Vec<SongMeta>,
}

/// The capability surface a local playback daemon must expose to be
/// bridged onto the network. Every method corresponds to one command in
/// the standard vocabulary (§6) dispatched by `amora-bridge`'s C5
/// component.
///
/// Implementations are expected to be cheaply cloneable handles (an
/// `Arc`-wrapped client, a channel sender) since the dispatcher holds one
/// shared instance across every inbound command.
#[async_trait]
pub trait Player: Send + Sync {
    async fn play(&self) -> PlayerResult<()>;
    async fn pause(&self) -> PlayerResult<()>;
    async fn stop(&self) -> PlayerResult<()>;
    async fn next(&self) -> PlayerResult<()>;
    async fn previous(&self) -> PlayerResult<()>;

    /// Callers are expected to have already validated `volume` is within
    /// `0..=100`; implementations may clamp defensively but should not
    /// treat an out-of-range value as surprising.
    async fn set_volume(&self, volume: u8) -> PlayerResult<()>;
    async fn get_volume(&self) -> PlayerResult<u8>;

    async fn set_repeat(&self, enabled: bool) -> PlayerResult<()>;
    async fn set_random(&self, enabled: bool) -> PlayerResult<()>;

    /// Returns a full snapshot of current playback state, used both to
    /// answer `getStatus` and to drive the status publisher's polling
    /// loop. This is the canonical source of truth for C6.
    async fn get_status(&self) -> PlayerResult<PlayerState>;

    /// Lists every playlist known to the daemon, each with its track
    /// listing.
    async fn get_playlists(&self) -> PlayerResult<Vec<PlaylistInfo>>;

    /// Loads `name` and begins playback from it.
    async fn play_playlist(&self, name: &str) -> PlayerResult<()>;

    /// Lists the tracks contained in playlist `name` without changing
    /// playback.
    async fn get_playlist_songs(&self, name: &str) -> PlayerResult<Vec<SongMeta>>;

    async fn create_playlist(&self, name: &str, files: &[String]) -> PlayerResult<()>;
    async fn delete_playlist(&self, name: &str) -> PlayerResult<()>;

    /// Plays a specific track within the currently loaded playlist by its
    /// zero-based index, per the §9 resolution: `index` refers to the
    /// playlist most recently returned by `getPlaylists`/
    /// `getPlaylistSongs`.
    async fn play_track(&self, index: u32) -> PlayerResult<()>;

    /// Appends `file` to `playlist`, or to the active playlist if `None`.
    async fn add_track(&self, file: &str, playlist: Option<&str>) -> PlayerResult<()>;

    /// Removes the track at `index` from `playlist`, or from the active
    /// playlist if `None`.
    async fn remove_track(&self, index: u32, playlist: Option<&str>) -> PlayerResult<()>;

    /// Moves the track at `from` to `to` within `playlist`, or the active
    /// playlist if `None`.
    async fn reorder_track(&self, from: u32, to: u32, playlist: Option<&str>) -> PlayerResult<()>;

    /// Rescans the daemon's media library.
    async fn update_database(&self) -> PlayerResult<()>;
}
