//! An in-memory [`Player`] used to exercise `amora-bridge` without a real
//! playback daemon, both from the bridge binary's `--mock` flag and from
//! integration tests across `amora-bridge`/`amora-client`. Grounded on
//! the teacher crate's in-memory test doubles for its playback traits.

use std::collections::HashMap;

use amora_core::player::{Player, PlayerError, PlayerResult, PlaylistInfo};
use amora_core::player_state::{PlaybackState, PlayerState, SongMeta};
use async_trait::async_trait;
use parking_lot::Mutex;

struct Inner {
    state: PlayerState,
    playlists: HashMap<String, Vec<SongMeta>>,
    current_playlist: Option<String>,
    current_index: Option<usize>,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: PlayerState::unknown(),
            playlists: HashMap::new(),
            current_playlist: None,
            current_index: None,
        }
    }

    fn active_playlist_name(&self, explicit: Option<&str>) -> Option<String> {
        explicit.map(str::to_string).or_else(|| self.current_playlist.clone())
    }

    fn refresh_current_song(&mut self) {
        let Some(name) = self.current_playlist.clone() else {
            self.state.current_song = None;
            return;
        };
        let Some(index) = self.current_index else {
            self.state.current_song = None;
            return;
        };
        let tracks = self.playlists.entry(name.clone()).or_default();
        for (i, track) in tracks.iter_mut().enumerate() {
            track.is_current = i == index;
        }
        self.state.current_song = tracks.get(index).cloned();
        self.state.playlist = Some(name);
        self.state.playlist_tracks = tracks.clone();
    }
}

/// An in-memory, `Send + Sync` [`Player`] backed by a single mutex.
pub struct MockPlayer {
    inner: Mutex<Inner>,
}

impl Default for MockPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlayer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
        }
    }

    fn track_duration(file: &str) -> f64 {
        // Deterministic, file-derived duration so tests can assert on it
        // without wiring up real audio files.
        180.0 + (file.len() as f64 % 60.0)
    }

    fn make_song(file: &str) -> SongMeta {
        SongMeta {
            title: file.to_string(),
            artist: "unknown".to_string(),
            album: "unknown".to_string(),
            file: file.to_string(),
            duration_seconds: Self::track_duration(file),
            position_seconds: 0.0,
            is_current: false,
        }
    }
}

#[async_trait]
impl Player for MockPlayer {
    async fn play(&self) -> PlayerResult<()> {
        let mut inner = self.inner.lock();
        if inner.current_index.is_none() && inner.current_playlist.is_none() {
            return Err(PlayerError::new("no track loaded"));
        }
        inner.state.state = PlaybackState::Playing;
        Ok(())
    }

    async fn pause(&self) -> PlayerResult<()> {
        self.inner.lock().state.state = PlaybackState::Paused;
        Ok(())
    }

    async fn stop(&self) -> PlayerResult<()> {
        let mut inner = self.inner.lock();
        inner.state.state = PlaybackState::Stopped;
        if let Some(song) = inner.state.current_song.as_mut() {
            song.position_seconds = 0.0;
        }
        Ok(())
    }

    async fn next(&self) -> PlayerResult<()> {
        let mut inner = self.inner.lock();
        let Some(name) = inner.current_playlist.clone() else {
            return Err(PlayerError::new("no playlist loaded"));
        };
        let len = inner.playlists.get(&name).map(Vec::len).unwrap_or(0);
        if len == 0 {
            return Err(PlayerError::new("playlist is empty"));
        }
        let next_index = inner.current_index.map_or(0, |i| (i + 1) % len);
        inner.current_index = Some(next_index);
        inner.refresh_current_song();
        Ok(())
    }

    async fn previous(&self) -> PlayerResult<()> {
        let mut inner = self.inner.lock();
        let Some(name) = inner.current_playlist.clone() else {
            return Err(PlayerError::new("no playlist loaded"));
        };
        let len = inner.playlists.get(&name).map(Vec::len).unwrap_or(0);
        if len == 0 {
            return Err(PlayerError::new("playlist is empty"));
        }
        let prev_index = inner.current_index.map_or(0, |i| (i + len - 1) % len);
        inner.current_index = Some(prev_index);
        inner.refresh_current_song();
        Ok(())
    }

    async fn set_volume(&self, volume: u8) -> PlayerResult<()> {
        self.inner.lock().state.volume = volume.min(100);
        Ok(())
    }

    async fn get_volume(&self) -> PlayerResult<u8> {
        Ok(self.inner.lock().state.volume)
    }

    async fn set_repeat(&self, enabled: bool) -> PlayerResult<()> {
        self.inner.lock().state.repeat = enabled;
        Ok(())
    }

    async fn set_random(&self, enabled: bool) -> PlayerResult<()> {
        self.inner.lock().state.random = enabled;
        Ok(())
    }

    async fn get_status(&self) -> PlayerResult<PlayerState> {
        Ok(self.inner.lock().state.clone())
    }

    async fn get_playlists(&self) -> PlayerResult<Vec<PlaylistInfo>> {
        let inner = self.inner.lock();
        Ok(inner
            .playlists
            .iter()
            .map(|(name, tracks)| PlaylistInfo {
                name: name.clone(),
                items: tracks.clone(),
            })
            .collect())
    }

    async fn play_playlist(&self, name: &str) -> PlayerResult<()> {
        let mut inner = self.inner.lock();
        if !inner.playlists.contains_key(name) {
            return Err(PlayerError::new(format!("no such playlist: {name}")));
        }
        inner.current_playlist = Some(name.to_string());
        inner.current_index = Some(0);
        inner.refresh_current_song();
        inner.state.state = PlaybackState::Playing;
        Ok(())
    }

    async fn get_playlist_songs(&self, name: &str) -> PlayerResult<Vec<SongMeta>> {
        self.inner
            .lock()
            .playlists
            .get(name)
            .cloned()
            .ok_or_else(|| PlayerError::new(format!("no such playlist: {name}")))
    }

    async fn create_playlist(&self, name: &str, files: &[String]) -> PlayerResult<()> {
        let mut inner = self.inner.lock();
        let tracks = files.iter().map(|f| Self::make_song(f)).collect();
        inner.playlists.insert(name.to_string(), tracks);
        Ok(())
    }

    async fn delete_playlist(&self, name: &str) -> PlayerResult<()> {
        let mut inner = self.inner.lock();
        if inner.playlists.remove(name).is_none() {
            return Err(PlayerError::new(format!("no such playlist: {name}")));
        }
        if inner.current_playlist.as_deref() == Some(name) {
            inner.current_playlist = None;
            inner.current_index = None;
            inner.refresh_current_song();
        }
        Ok(())
    }

    async fn play_track(&self, index: u32) -> PlayerResult<()> {
        let mut inner = self.inner.lock();
        let Some(name) = inner.current_playlist.clone() else {
            return Err(PlayerError::new("no playlist loaded"));
        };
        let len = inner.playlists.get(&name).map(Vec::len).unwrap_or(0);
        if index as usize >= len {
            return Err(PlayerError::new(format!(
                "track index {index} out of range for playlist {name} of length {len}"
            )));
        }
        inner.current_index = Some(index as usize);
        inner.refresh_current_song();
        inner.state.state = PlaybackState::Playing;
        Ok(())
    }

    async fn add_track(&self, file: &str, playlist: Option<&str>) -> PlayerResult<()> {
        let mut inner = self.inner.lock();
        let Some(name) = inner.active_playlist_name(playlist) else {
            return Err(PlayerError::new("no playlist specified or active"));
        };
        inner.playlists.entry(name).or_default().push(Self::make_song(file));
        Ok(())
    }

    async fn remove_track(&self, index: u32, playlist: Option<&str>) -> PlayerResult<()> {
        let mut inner = self.inner.lock();
        let Some(name) = inner.active_playlist_name(playlist) else {
            return Err(PlayerError::new("no playlist specified or active"));
        };
        let tracks = inner
            .playlists
            .get_mut(&name)
            .ok_or_else(|| PlayerError::new(format!("no such playlist: {name}")))?;
        if index as usize >= tracks.len() {
            return Err(PlayerError::new(format!("track index {index} out of range")));
        }
        tracks.remove(index as usize);
        inner.refresh_current_song();
        Ok(())
    }

    async fn reorder_track(&self, from: u32, to: u32, playlist: Option<&str>) -> PlayerResult<()> {
        let mut inner = self.inner.lock();
        let Some(name) = inner.active_playlist_name(playlist) else {
            return Err(PlayerError::new("no playlist specified or active"));
        };
        let tracks = inner
            .playlists
            .get_mut(&name)
            .ok_or_else(|| PlayerError::new(format!("no such playlist: {name}")))?;
        if from as usize >= tracks.len() || to as usize >= tracks.len() {
            return Err(PlayerError::new("reorder index out of range"));
        }
        let track = tracks.remove(from as usize);
        tracks.insert(to as usize, track);
        inner.refresh_current_song();
        Ok(())
    }

    async fn update_database(&self) -> PlayerResult<()> {
        Ok(())
    }
}
