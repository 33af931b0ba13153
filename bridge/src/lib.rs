//! Device-side runtime: command dispatcher (C5), status publisher (C6),
//! and lifecycle/supervision (C8) wiring the bridge together over
//! `amora-core`'s shared topic/envelope/transport/player types.

#![warn(clippy::all)]

pub mod bootstrap;
pub mod config;
pub mod dispatcher;
pub mod lifecycle;
pub mod publisher;

pub use bootstrap::{bootstrap_bridge, BridgeHandle};
pub use config::{BridgeConfig, ConfigError};
pub use dispatcher::{Dispatcher, HandlerFn, HandlerOutcome};
pub use lifecycle::{Lifecycle, NoopLifecycle, ServerLifecycle};
pub use publisher::{Publisher, PublisherIntervals};
