//! Application-wide error taxonomy.
//!
//! Mirrors the error classes named in the specification's error handling
//! design. Narrower error types (`PlayerError`, `TransportError`) convert
//! into [`AmoraError`] via `From`, the same layering the transport and
//! discovery errors in the reference crates use.

use thiserror::Error;

use crate::player::PlayerError;
use crate::transport::TransportError;

/// Trait for error types that expose a stable, machine-readable code.
///
/// Useful for logging and for translating errors into response messages
/// without matching on `Display` text.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum AmoraError {
    /// The broker was unreachable or rejected authentication.
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    /// An operation was attempted while the transport was not connected.
    #[error("not connected")]
    NotConnected,

    /// An envelope failed to decode or was missing required fields.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// The command name was not registered with the dispatcher.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The player capability returned failure or raised an error.
    #[error("handler failure: {0}")]
    HandlerFailure(String),

    /// A pending command was not answered within the configured timeout.
    #[error("command timed out")]
    Timeout,

    /// A pending command was rejected because the session closed.
    #[error("session disconnected")]
    Disconnected,

    /// A parameter fell outside its documented domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ErrorCode for AmoraError {
    fn code(&self) -> &'static str {
        match self {
            Self::TransportUnavailable(_) => "transport_unavailable",
            Self::NotConnected => "not_connected",
            Self::MalformedMessage(_) => "malformed_message",
            Self::UnknownCommand(_) => "unknown_command",
            Self::HandlerFailure(_) => "handler_failure",
            Self::Timeout => "timeout",
            Self::Disconnected => "disconnected",
            Self::InvalidArgument(_) => "invalid_argument",
        }
    }
}

impl From<PlayerError> for AmoraError {
    fn from(err: PlayerError) -> Self {
        Self::HandlerFailure(err.to_string())
    }
}

impl From<TransportError> for AmoraError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unavailable(msg) => Self::TransportUnavailable(msg),
            TransportError::NotConnected => Self::NotConnected,
        }
    }
}

/// Convenience alias for application-wide results.
pub type AmoraResult<T> = Result<T, AmoraError>;
