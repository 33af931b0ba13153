//! Command dispatcher (C5).
//!
//! Routes inbound Command envelopes to a handler bound against a shared
//! `Arc<dyn Player>`, producing a Response envelope per §4.5. The handler
//! table is built once at construction from the standard command
//! vocabulary (§6); [`Dispatcher::register`] is the extension point for
//! additional commands.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use amora_core::envelope::{self, CommandEnvelope, Envelope, ResponseEnvelope};
use amora_core::player::Player;
use serde_json::Value;

/// What a handler reports back: success/failure, a human-readable
/// message, and optional structured data — matches the `(result, message,
/// data)` tuple §4.5 describes handlers as returning.
pub type HandlerOutcome = (bool, String, Option<Value>);

type BoxFuture = Pin<Box<dyn Future<Output = HandlerOutcome> + Send>>;

/// A registered command handler, closing over the shared `Player`.
pub type HandlerFn = Arc<dyn Fn(Arc<dyn Player>, Option<Value>) -> BoxFuture + Send + Sync>;

fn ok(message: impl Into<String>) -> HandlerOutcome {
    (true, message.into(), None)
}

fn ok_with_data(message: impl Into<String>, data: Value) -> HandlerOutcome {
    (true, message.into(), Some(data))
}

fn fail(message: impl Into<String>) -> HandlerOutcome {
    (false, message.into(), None)
}

fn invalid_argument(message: impl Into<String>) -> HandlerOutcome {
    fail(format!("invalid argument: {}", message.into()))
}

fn param_str<'a>(params: &'a Option<Value>, field: &str) -> Result<&'a str, HandlerOutcome> {
    params
        .as_ref()
        .and_then(|v| v.get(field))
        .and_then(Value::as_str)
        .ok_or_else(|| invalid_argument(format!("missing string param '{field}'")))
}

fn param_u64<'a>(params: &'a Option<Value>, field: &str) -> Result<u64, HandlerOutcome> {
    params
        .as_ref()
        .and_then(|v| v.get(field))
        .and_then(Value::as_u64)
        .ok_or_else(|| invalid_argument(format!("missing numeric param '{field}'")))
}

fn param_bool(params: &Option<Value>, field: &str) -> Result<bool, HandlerOutcome> {
    params
        .as_ref()
        .and_then(|v| v.get(field))
        .and_then(Value::as_bool)
        .ok_or_else(|| invalid_argument(format!("missing boolean param '{field}'")))
}

fn param_str_opt<'a>(params: &'a Option<Value>, field: &str) -> Option<&'a str> {
    params.as_ref().and_then(|v| v.get(field)).and_then(Value::as_str)
}

fn param_str_list(params: &Option<Value>, field: &str) -> Vec<String> {
    params
        .as_ref()
        .and_then(|v| v.get(field))
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|i| i.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// The device-side command router (C5).
pub struct Dispatcher {
    player: Arc<dyn Player>,
    handlers: HashMap<String, HandlerFn>,
}

impl Dispatcher {
    /// Builds a dispatcher with the standard command vocabulary already
    /// registered against `player`.
    #[must_use]
    pub fn new(player: Arc<dyn Player>) -> Self {
        let mut dispatcher = Self {
            player,
            handlers: HashMap::new(),
        };
        dispatcher.register_standard_commands();
        dispatcher
    }

    /// Registers (or replaces) the handler for `command`. The extension
    /// point §4.5 describes for commands outside the standard
    /// vocabulary.
    pub fn register(&mut self, command: impl Into<String>, handler: HandlerFn) {
        self.handlers.insert(command.into(), handler);
    }

    fn register_standard_commands(&mut self) {
        self.register("play", Arc::new(|p, _params| {
            Box::pin(async move {
                match p.play().await {
                    Ok(()) => ok("play ok"),
                    Err(e) => fail(e.0),
                }
            })
        }));
        self.register("pause", Arc::new(|p, _params| {
            Box::pin(async move {
                match p.pause().await {
                    Ok(()) => ok("pause ok"),
                    Err(e) => fail(e.0),
                }
            })
        }));
        self.register("stop", Arc::new(|p, _params| {
            Box::pin(async move {
                match p.stop().await {
                    Ok(()) => ok("stop ok"),
                    Err(e) => fail(e.0),
                }
            })
        }));
        self.register("next", Arc::new(|p, _params| {
            Box::pin(async move {
                match p.next().await {
                    Ok(()) => ok("next ok"),
                    Err(e) => fail(e.0),
                }
            })
        }));
        self.register("previous", Arc::new(|p, _params| {
            Box::pin(async move {
                match p.previous().await {
                    Ok(()) => ok("previous ok"),
                    Err(e) => fail(e.0),
                }
            })
        }));
        self.register("setVolume", Arc::new(|p, params| {
            Box::pin(async move {
                let volume = match param_u64(&params, "volume") {
                    Ok(v) => v,
                    Err(outcome) => return outcome,
                };
                if volume > 100 {
                    return invalid_argument("volume must be 0..=100");
                }
                match p.set_volume(volume as u8).await {
                    Ok(()) => ok("setVolume ok"),
                    Err(e) => fail(e.0),
                }
            })
        }));
        self.register("getVolume", Arc::new(|p, _params| {
            Box::pin(async move {
                match p.get_volume().await {
                    Ok(v) => ok_with_data("getVolume ok", serde_json::json!({ "volume": v })),
                    Err(e) => fail(e.0),
                }
            })
        }));
        self.register("setRepeat", Arc::new(|p, params| {
            Box::pin(async move {
                let enabled = match param_bool(&params, "enabled") {
                    Ok(v) => v,
                    Err(outcome) => return outcome,
                };
                match p.set_repeat(enabled).await {
                    Ok(()) => ok("setRepeat ok"),
                    Err(e) => fail(e.0),
                }
            })
        }));
        self.register("setRandom", Arc::new(|p, params| {
            Box::pin(async move {
                let enabled = match param_bool(&params, "enabled") {
                    Ok(v) => v,
                    Err(outcome) => return outcome,
                };
                match p.set_random(enabled).await {
                    Ok(()) => ok("setRandom ok"),
                    Err(e) => fail(e.0),
                }
            })
        }));
        self.register("getStatus", Arc::new(|p, _params| {
            Box::pin(async move {
                match p.get_status().await {
                    Ok(state) => match serde_json::to_value(&state) {
                        Ok(data) => ok_with_data("getStatus ok", data),
                        Err(e) => fail(e.to_string()),
                    },
                    Err(e) => fail(e.0),
                }
            })
        }));
        self.register("getPlaylists", Arc::new(|p, _params| {
            Box::pin(async move {
                match p.get_playlists().await {
                    Ok(playlists) => ok_with_data(
                        "getPlaylists ok",
                        serde_json::json!({ "playlists": playlists }),
                    ),
                    Err(e) => fail(e.0),
                }
            })
        }));
        self.register("playPlaylist", Arc::new(|p, params| {
            Box::pin(async move {
                let name = match param_str(&params, "name") {
                    Ok(v) => v.to_string(),
                    Err(outcome) => return outcome,
                };
                match p.play_playlist(&name).await {
                    Ok(()) => ok("playPlaylist ok"),
                    Err(e) => fail(e.0),
                }
            })
        }));
        self.register("getPlaylistSongs", Arc::new(|p, params| {
            Box::pin(async move {
                let name = match param_str(&params, "name") {
                    Ok(v) => v.to_string(),
                    Err(outcome) => return outcome,
                };
                match p.get_playlist_songs(&name).await {
                    Ok(songs) => ok_with_data("getPlaylistSongs ok", serde_json::json!({ "songs": songs })),
                    Err(e) => fail(e.0),
                }
            })
        }));
        self.register("createPlaylist", Arc::new(|p, params| {
            Box::pin(async move {
                let name = match param_str(&params, "name") {
                    Ok(v) => v.to_string(),
                    Err(outcome) => return outcome,
                };
                let files = param_str_list(&params, "files");
                match p.create_playlist(&name, &files).await {
                    Ok(()) => ok("createPlaylist ok"),
                    Err(e) => fail(e.0),
                }
            })
        }));
        self.register("deletePlaylist", Arc::new(|p, params| {
            Box::pin(async move {
                let name = match param_str(&params, "name") {
                    Ok(v) => v.to_string(),
                    Err(outcome) => return outcome,
                };
                match p.delete_playlist(&name).await {
                    Ok(()) => ok("deletePlaylist ok"),
                    Err(e) => fail(e.0),
                }
            })
        }));
        self.register("playTrack", Arc::new(|p, params| {
            Box::pin(async move {
                let index = match param_u64(&params, "index") {
                    Ok(v) => v,
                    Err(outcome) => return outcome,
                };
                match p.play_track(index as u32).await {
                    Ok(()) => ok("playTrack ok"),
                    Err(e) => invalid_argument(e.0),
                }
            })
        }));
        self.register("addTrack", Arc::new(|p, params| {
            Box::pin(async move {
                let file = match param_str(&params, "file") {
                    Ok(v) => v.to_string(),
                    Err(outcome) => return outcome,
                };
                let playlist = param_str_opt(&params, "playlist").map(str::to_string);
                match p.add_track(&file, playlist.as_deref()).await {
                    Ok(()) => ok("addTrack ok"),
                    Err(e) => fail(e.0),
                }
            })
        }));
        self.register("removeTrack", Arc::new(|p, params| {
            Box::pin(async move {
                let index = match param_u64(&params, "index") {
                    Ok(v) => v,
                    Err(outcome) => return outcome,
                };
                let playlist = param_str_opt(&params, "playlist").map(str::to_string);
                match p.remove_track(index as u32, playlist.as_deref()).await {
                    Ok(()) => ok("removeTrack ok"),
                    Err(e) => invalid_argument(e.0),
                }
            })
        }));
        self.register("reorderTrack", Arc::new(|p, params| {
            Box::pin(async move {
                let from = match param_u64(&params, "from") {
                    Ok(v) => v,
                    Err(outcome) => return outcome,
                };
                let to = match param_u64(&params, "to") {
                    Ok(v) => v,
                    Err(outcome) => return outcome,
                };
                let playlist = param_str_opt(&params, "playlist").map(str::to_string);
                match p.reorder_track(from as u32, to as u32, playlist.as_deref()).await {
                    Ok(()) => ok("reorderTrack ok"),
                    Err(e) => invalid_argument(e.0),
                }
            })
        }));
        self.register("updateDatabase", Arc::new(|p, _params| {
            Box::pin(async move {
                match p.update_database().await {
                    Ok(()) => ok("updateDatabase ok"),
                    Err(e) => fail(e.0),
                }
            })
        }));
    }

    /// Decodes `payload` and routes it through the handler table,
    /// producing the `ResponseEnvelope` to publish on the responses
    /// topic. Never panics or propagates a handler's own error — per
    /// §4.5, a malformed or failing command degrades to a failure
    /// response, not a dispatcher crash.
    pub async fn dispatch(&self, payload: &[u8]) -> ResponseEnvelope {
        let command: CommandEnvelope = match envelope::decode(payload) {
            Ok(Envelope::Command(c)) => c,
            Ok(_) | Err(_) => return ResponseEnvelope::failure("", "malformed command"),
        };

        let Some(handler) = self.handlers.get(&command.command).cloned() else {
            return ResponseEnvelope::failure(command.command_id, "unknown command");
        };

        let (result, message, data) = handler(self.player.clone(), command.params).await;
        if result {
            ResponseEnvelope::ok(command.command_id, message, data)
        } else {
            ResponseEnvelope::failure(command.command_id, message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amora_mock_player::MockPlayer;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(MockPlayer::new()))
    }

    fn command_payload(command: &str, command_id: &str, params: Option<Value>) -> Vec<u8> {
        let mut envelope = CommandEnvelope::new(command, params);
        envelope.command_id = command_id.to_string();
        envelope::encode(&Envelope::Command(envelope))
    }

    #[tokio::test]
    async fn malformed_payload_yields_best_effort_failure() {
        let dispatcher = dispatcher();
        let response = dispatcher.dispatch(b"not json").await;
        assert!(!response.result);
        assert_eq!(response.message, "malformed command");
        assert_eq!(response.command_id, "");
    }

    #[tokio::test]
    async fn unknown_command_is_reported() {
        let dispatcher = dispatcher();
        let payload = command_payload("teleport", "cmd-1", None);
        let response = dispatcher.dispatch(&payload).await;
        assert!(!response.result);
        assert_eq!(response.message, "unknown command");
        assert_eq!(response.command_id, "cmd-1");
    }

    #[tokio::test]
    async fn set_volume_out_of_range_is_invalid_argument() {
        let dispatcher = dispatcher();
        let payload = command_payload("setVolume", "cmd-2", Some(serde_json::json!({"volume": 101})));
        let response = dispatcher.dispatch(&payload).await;
        assert!(!response.result);
        assert!(response.message.contains("invalid argument"));
    }

    #[tokio::test]
    async fn play_without_playlist_surfaces_handler_failure() {
        let dispatcher = dispatcher();
        let payload = command_payload("play", "cmd-3", None);
        let response = dispatcher.dispatch(&payload).await;
        assert!(!response.result);
        assert_eq!(response.command_id, "cmd-3");
    }

    #[tokio::test]
    async fn create_then_play_playlist_then_get_status_round_trips() {
        let dispatcher = dispatcher();
        let create = command_payload(
            "createPlaylist",
            "cmd-4",
            Some(serde_json::json!({"name": "Favorites", "files": ["a.mp3"]})),
        );
        let response = dispatcher.dispatch(&create).await;
        assert!(response.result);

        let play = command_payload("playPlaylist", "cmd-5", Some(serde_json::json!({"name": "Favorites"})));
        let response = dispatcher.dispatch(&play).await;
        assert!(response.result);

        let status = command_payload("getStatus", "cmd-6", None);
        let response = dispatcher.dispatch(&status).await;
        assert!(response.result);
        assert_eq!(
            response.data.unwrap()["currentSong"]["file"],
            serde_json::json!("a.mp3")
        );
    }

    #[tokio::test]
    async fn duplicate_command_ids_are_each_answered_independently() {
        let dispatcher = dispatcher();
        let payload = command_payload("getVolume", "dup-1", None);
        let first = dispatcher.dispatch(&payload).await;
        let second = dispatcher.dispatch(&payload).await;
        assert_eq!(first.command_id, second.command_id);
        assert!(first.result && second.result);
    }
}
