//! Shared core for the amora device/client bridge.
//!
//! This crate provides the protocol-level building blocks used by both the
//! device-side bridge (`amora-bridge`) and the client-side session library
//! (`amora-client`). It is organized into:
//!
//! - [`topic`]: canonical topic construction and parsing
//! - [`envelope`]: wire envelope types and the JSON codec
//! - [`player_state`]: the `PlayerState`/`SongMeta` data model
//! - [`player`]: the `Player` capability trait consumed by the bridge
//! - [`transport`]: the `Transport` capability trait and an MQTT adapter
//! - [`error`]: the application-wide error taxonomy
//! - [`runtime`]: an async-runtime-independent task spawning abstraction
//! - [`protocol_constants`]: fixed protocol defaults

#![warn(clippy::all)]

pub mod envelope;
pub mod error;
pub mod player;
pub mod player_state;
pub mod protocol_constants;
pub mod runtime;
pub mod topic;
pub mod transport;

pub use envelope::{
    decode, encode, CodecError, CommandEnvelope, ConnectionEnvelope, Envelope, ResponseEnvelope,
    StateEnvelope,
};
pub use error::{AmoraError, AmoraResult};
pub use player::{Player, PlayerError, PlayerResult, PlaylistInfo};
pub use player_state::{PlaybackState, PlayerState, PlayerStateInvariantError, SongMeta};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use topic::{DeviceTopics, TopicKind, DEFAULT_TOPIC_PREFIX};
pub use transport::{
    ConnectionState, InboundMessage, LastWillConfig, QoS, TlsConfig, Transport, TransportError,
    TransportOptions,
};
