//! Message codec (C2): wire envelope types and JSON encode/decode.
//!
//! Encoding is a straight `serde_json::to_vec`. Decoding classifies an
//! incoming JSON object into one of four envelope kinds by field
//! presence, since a single MQTT topic namespace carries different
//! envelope shapes depending on which topic it arrived on and callers
//! don't always know which before parsing. Fields this crate doesn't know
//! about are preserved under `extra` rather than dropped, so a future
//! protocol field doesn't silently disappear on round-trip through a
//! bridge that hasn't been updated yet.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::player_state::PlayerState;

/// Client-local wall clock, in fractional seconds since the Unix epoch.
/// Used only for diagnostics, per §3 — nothing in this crate orders
/// events by it.
fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// A command sent from a client to a device (`.../commands`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEnvelope {
    pub command: String,
    pub command_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    pub timestamp: f64,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl CommandEnvelope {
    /// Builds a new command envelope with a fresh, random `commandId` and
    /// the current wall-clock timestamp.
    #[must_use]
    pub fn new(command: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            command: command.into(),
            command_id: Uuid::new_v4().to_string(),
            params,
            timestamp: now_seconds(),
            extra: HashMap::new(),
        }
    }
}

/// A device's reply to a command (`.../responses`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub command_id: String,
    pub result: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub timestamp: f64,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl ResponseEnvelope {
    #[must_use]
    pub fn ok(command_id: impl Into<String>, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            command_id: command_id.into(),
            result: true,
            message: message.into(),
            data,
            timestamp: now_seconds(),
            extra: HashMap::new(),
        }
    }

    #[must_use]
    pub fn failure(command_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command_id: command_id.into(),
            result: false,
            message: message.into(),
            data: None,
            timestamp: now_seconds(),
            extra: HashMap::new(),
        }
    }
}

/// A retained playback-state snapshot (`.../state`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateEnvelope {
    #[serde(flatten)]
    pub state: PlayerState,
    pub timestamp: f64,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl StateEnvelope {
    #[must_use]
    pub fn new(state: PlayerState) -> Self {
        Self {
            state,
            timestamp: now_seconds(),
            extra: HashMap::new(),
        }
    }
}

/// The device's online/offline presence, including last-will payloads
/// (`.../connection`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEnvelope {
    pub status: String,
    pub timestamp: f64,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl ConnectionEnvelope {
    #[must_use]
    pub fn online() -> Self {
        Self {
            status: "online".to_string(),
            timestamp: now_seconds(),
            extra: HashMap::new(),
        }
    }

    #[must_use]
    pub fn offline() -> Self {
        Self {
            status: "offline".to_string(),
            timestamp: now_seconds(),
            extra: HashMap::new(),
        }
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }
}

/// The union of envelope shapes this crate can decode off the wire.
#[derive(Clone, Debug, PartialEq)]
pub enum Envelope {
    Command(CommandEnvelope),
    Response(ResponseEnvelope),
    State(StateEnvelope),
    Connection(ConnectionEnvelope),
}

/// Errors raised while encoding or decoding an [`Envelope`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum CodecError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload did not match any known envelope shape")]
    UnrecognizedShape,

    #[error("payload matched an envelope shape but failed to deserialize: {0}")]
    ShapeMismatch(String),
}

/// Decodes a wire payload into an [`Envelope`], classifying its shape by
/// field presence:
///
/// 1. `command` + `commandId` present → [`Envelope::Command`]
/// 2. `commandId` + `result` present → [`Envelope::Response`]
/// 3. `state` present → [`Envelope::State`]
/// 4. top-level `status` is `"online"` or `"offline"` → [`Envelope::Connection`]
/// 5. otherwise → [`CodecError::UnrecognizedShape`]
pub fn decode(bytes: &[u8]) -> Result<Envelope, CodecError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| CodecError::InvalidJson(e.to_string()))?;
    let obj = value.as_object().ok_or(CodecError::NotAnObject)?;

    if obj.contains_key("command") && obj.contains_key("commandId") {
        let parsed: CommandEnvelope =
            serde_json::from_value(value).map_err(|e| CodecError::ShapeMismatch(e.to_string()))?;
        return Ok(Envelope::Command(parsed));
    }

    if obj.contains_key("commandId") && obj.contains_key("result") {
        let parsed: ResponseEnvelope =
            serde_json::from_value(value).map_err(|e| CodecError::ShapeMismatch(e.to_string()))?;
        return Ok(Envelope::Response(parsed));
    }

    if obj.contains_key("state") {
        let parsed: StateEnvelope =
            serde_json::from_value(value).map_err(|e| CodecError::ShapeMismatch(e.to_string()))?;
        return Ok(Envelope::State(parsed));
    }

    if let Some(status) = obj.get("status").and_then(Value::as_str) {
        if status == "online" || status == "offline" {
            let parsed: ConnectionEnvelope = serde_json::from_value(value)
                .map_err(|e| CodecError::ShapeMismatch(e.to_string()))?;
            return Ok(Envelope::Connection(parsed));
        }
    }

    Err(CodecError::UnrecognizedShape)
}

/// Encodes any of the concrete envelope types to its wire representation.
pub fn encode(envelope: &Envelope) -> Vec<u8> {
    match envelope {
        Envelope::Command(e) => serde_json::to_vec(e),
        Envelope::Response(e) => serde_json::to_vec(e),
        Envelope::State(e) => serde_json::to_vec(e),
        Envelope::Connection(e) => serde_json::to_vec(e),
    }
    .expect("envelope types contain no non-serializable fields")
}
