//! The `PlayerState`/`SongMeta` data model (§3).

use serde::{Deserialize, Serialize};

/// Playback state reported by the daemon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
    Loading,
    Error,
    Unknown,
}

impl PlaybackState {
    /// Whether this state requires a `currentSong` to be present.
    #[must_use]
    pub const fn requires_current_song(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

/// Metadata for a single track, as reported by the daemon or stored in a
/// playlist snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongMeta {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub file: String,
    pub duration_seconds: f64,
    pub position_seconds: f64,
    /// Marks this entry as the currently playing track within a playlist
    /// snapshot. At most one entry in a `playlistTracks` sequence may set
    /// this.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_current: bool,
}

impl SongMeta {
    /// Clamps `position_seconds` into `0..=duration_seconds`, per the §3
    /// invariant.
    pub fn clamp_position(&mut self) {
        self.position_seconds = self.position_seconds.clamp(0.0, self.duration_seconds.max(0.0));
    }
}

/// A snapshot of the daemon's playback state at one instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub state: PlaybackState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_song: Option<SongMeta>,
    pub volume: u8,
    pub repeat: bool,
    pub random: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist: Option<String>,
    #[serde(default)]
    pub playlist_tracks: Vec<SongMeta>,
}

/// Reasons a [`PlayerState`] might violate its documented invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlayerStateInvariantError {
    #[error("state {0:?} requires a current song")]
    MissingCurrentSong(PlaybackState),
    #[error("more than one playlist track is marked as current")]
    MultipleCurrentTracks,
}

impl PlayerState {
    /// Clamps `volume` to `0..=100` and each track's position into its
    /// duration, matching the §3 invariants. Does not touch the
    /// `currentSong`-presence or single-`isCurrent` invariants, which are
    /// structural rather than numeric — see [`PlayerState::validate`].
    pub fn normalize(&mut self) {
        self.volume = self.volume.min(100);
        if let Some(song) = self.current_song.as_mut() {
            song.clamp_position();
        }
        for track in &mut self.playlist_tracks {
            track.clamp_position();
        }
    }

    /// Checks the structural invariants from §3 that `normalize` can't fix
    /// by clamping: `currentSong` presence while playing/paused, and at
    /// most one `isCurrent` marker.
    pub fn validate(&self) -> Result<(), PlayerStateInvariantError> {
        if self.state.requires_current_song() && self.current_song.is_none() {
            return Err(PlayerStateInvariantError::MissingCurrentSong(self.state));
        }
        let current_count = self.playlist_tracks.iter().filter(|t| t.is_current).count();
        if current_count > 1 {
            return Err(PlayerStateInvariantError::MultipleCurrentTracks);
        }
        Ok(())
    }

    /// A fresh, empty `stopped` state — used to seed caches before the
    /// first real snapshot arrives.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            state: PlaybackState::Unknown,
            current_song: None,
            volume: 0,
            repeat: false,
            random: false,
            playlist: None,
            playlist_tracks: Vec::new(),
        }
    }
}
