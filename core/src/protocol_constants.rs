//! Fixed protocol constants and tunable defaults.
//!
//! Values here fall into two groups: defaults that the spec pins (the
//! default topic prefix, the default QoS) and tunables whose *default*
//! value is specified but which a deployment may override via
//! [`crate::transport::TransportOptions`] or the bridge/session configs
//! that build on it.

use std::time::Duration;

/// Default topic namespace prefix when none is configured.
pub const DEFAULT_TOPIC_PREFIX: &str = "amora/devices";

/// Default QoS used when a publish/subscribe call doesn't specify one.
pub const DEFAULT_QOS: u8 = 1;

/// Default status-publisher position update cadence while playing.
pub const DEFAULT_POSITION_UPDATE_INTERVAL: Duration = Duration::from_secs(1);

/// Default status-publisher cadence for checking non-position fields.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(1);

/// Default maximum gap between publishes regardless of change.
pub const DEFAULT_FULL_UPDATE_INTERVAL: Duration = Duration::from_secs(5);

/// Default pending-command timeout on the session client.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Frequency of the session client's pending-command timeout sweep.
pub const PENDING_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Base delay for transport reconnect backoff.
pub const RECONNECT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Default ceiling for transport reconnect backoff.
pub const DEFAULT_MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// Default keep-alive interval advertised to the broker.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);
