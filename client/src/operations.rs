//! Typed per-operation methods (§4.4/§6) built on
//! [`SessionClient::send_command`]. Each mirrors one entry of the
//! standard command vocabulary, building `params` the way
//! `amora-bridge::dispatcher` unpacks them on the other end, and decoding
//! `data` into a concrete type where that's more useful to a caller than
//! a raw `serde_json::Value`.

use amora_core::error::{AmoraError, AmoraResult};
use amora_core::player::PlaylistInfo;
use amora_core::player_state::{PlayerState, SongMeta};
use serde_json::{json, Value};

use crate::session::SessionClient;

fn missing_data(command: &str) -> AmoraError {
    AmoraError::MalformedMessage(format!("{command} response carried no data"))
}

fn malformed(command: &str, err: serde_json::Error) -> AmoraError {
    AmoraError::MalformedMessage(format!("{command} response did not match expected shape: {err}"))
}

impl SessionClient {
    pub async fn play(&self) -> AmoraResult<()> {
        self.send_command("play", None).await.map(|_| ())
    }

    pub async fn pause(&self) -> AmoraResult<()> {
        self.send_command("pause", None).await.map(|_| ())
    }

    pub async fn stop(&self) -> AmoraResult<()> {
        self.send_command("stop", None).await.map(|_| ())
    }

    pub async fn next(&self) -> AmoraResult<()> {
        self.send_command("next", None).await.map(|_| ())
    }

    pub async fn previous(&self) -> AmoraResult<()> {
        self.send_command("previous", None).await.map(|_| ())
    }

    /// Rejects locally with `InvalidArgument` for out-of-range volumes
    /// rather than round-tripping to the device to find out, per §8's
    /// boundary behavior for `setVolume`.
    pub async fn set_volume(&self, volume: u8) -> AmoraResult<()> {
        if volume > 100 {
            return Err(AmoraError::InvalidArgument("volume must be 0..=100".into()));
        }
        self.send_command("setVolume", Some(json!({ "volume": volume }))).await.map(|_| ())
    }

    pub async fn get_volume(&self) -> AmoraResult<u8> {
        let data = self.send_command("getVolume", None).await?.ok_or_else(|| missing_data("getVolume"))?;
        data.get("volume")
            .and_then(Value::as_u64)
            .map(|v| v as u8)
            .ok_or_else(|| missing_data("getVolume"))
    }

    pub async fn set_repeat(&self, enabled: bool) -> AmoraResult<()> {
        self.send_command("setRepeat", Some(json!({ "enabled": enabled }))).await.map(|_| ())
    }

    pub async fn set_random(&self, enabled: bool) -> AmoraResult<()> {
        self.send_command("setRandom", Some(json!({ "enabled": enabled }))).await.map(|_| ())
    }

    pub async fn get_status(&self) -> AmoraResult<PlayerState> {
        let data = self.send_command("getStatus", None).await?.ok_or_else(|| missing_data("getStatus"))?;
        serde_json::from_value(data).map_err(|e| malformed("getStatus", e))
    }

    pub async fn get_playlists(&self) -> AmoraResult<Vec<PlaylistInfo>> {
        let data = self.send_command("getPlaylists", None).await?.ok_or_else(|| missing_data("getPlaylists"))?;
        let playlists = data.get("playlists").cloned().ok_or_else(|| missing_data("getPlaylists"))?;
        serde_json::from_value(playlists).map_err(|e| malformed("getPlaylists", e))
    }

    pub async fn play_playlist(&self, name: &str) -> AmoraResult<()> {
        self.send_command("playPlaylist", Some(json!({ "name": name }))).await.map(|_| ())
    }

    pub async fn get_playlist_songs(&self, name: &str) -> AmoraResult<Vec<SongMeta>> {
        let data = self
            .send_command("getPlaylistSongs", Some(json!({ "name": name })))
            .await?
            .ok_or_else(|| missing_data("getPlaylistSongs"))?;
        let songs = data.get("songs").cloned().ok_or_else(|| missing_data("getPlaylistSongs"))?;
        serde_json::from_value(songs).map_err(|e| malformed("getPlaylistSongs", e))
    }

    pub async fn create_playlist(&self, name: &str, files: &[String]) -> AmoraResult<()> {
        self.send_command("createPlaylist", Some(json!({ "name": name, "files": files })))
            .await
            .map(|_| ())
    }

    pub async fn delete_playlist(&self, name: &str) -> AmoraResult<()> {
        self.send_command("deletePlaylist", Some(json!({ "name": name }))).await.map(|_| ())
    }

    /// `index` refers to the playlist most recently returned by
    /// `getPlaylists`/`getPlaylistSongs`, per §9's resolution — the device
    /// rejects with `InvalidArgument` if that's stale.
    pub async fn play_track(&self, index: u32) -> AmoraResult<()> {
        self.send_command("playTrack", Some(json!({ "index": index }))).await.map(|_| ())
    }

    pub async fn add_track(&self, file: &str, playlist: Option<&str>) -> AmoraResult<()> {
        self.send_command("addTrack", Some(json!({ "file": file, "playlist": playlist })))
            .await
            .map(|_| ())
    }

    pub async fn remove_track(&self, index: u32, playlist: Option<&str>) -> AmoraResult<()> {
        self.send_command("removeTrack", Some(json!({ "index": index, "playlist": playlist })))
            .await
            .map(|_| ())
    }

    pub async fn reorder_track(&self, from: u32, to: u32, playlist: Option<&str>) -> AmoraResult<()> {
        self.send_command(
            "reorderTrack",
            Some(json!({ "from": from, "to": to, "playlist": playlist })),
        )
        .await
        .map(|_| ())
    }

    pub async fn update_database(&self) -> AmoraResult<()> {
        self.send_command("updateDatabase", None).await.map(|_| ())
    }
}
