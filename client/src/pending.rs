//! Outstanding-command tracking (part of C7).
//!
//! Pure state container, no I/O — grounded on the teacher's
//! `GenaSubscriptionStore`: a `parking_lot`-guarded map plus a sweep
//! method that *returns* expired entries rather than timing them out
//! internally, leaving the timeout policy itself to the caller
//! ([`crate::session::SessionClient`]'s 1 Hz sweep loop, §4.7 point 4).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use amora_core::envelope::ResponseEnvelope;
use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Delivered to an awaiting command future when it's rejected for a
/// reason other than an actual Response arriving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOutcome {
    /// The session was disconnected while the command was outstanding.
    Disconnected,
}

type Outcome = Result<ResponseEnvelope, PendingOutcome>;

struct PendingEntry {
    resolver: oneshot::Sender<Outcome>,
    enqueued_at: Instant,
}

/// Tracks in-flight commands keyed by `commandId`.
pub struct PendingCommands {
    entries: Mutex<HashMap<String, PendingEntry>>,
}

impl PendingCommands {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Registers `command_id` and returns the receiver half, which
    /// resolves when a matching Response arrives ([`Self::resolve`]), the
    /// session disconnects ([`Self::reject_all`]), or is dropped after a
    /// timeout sweep ([`Self::sweep_expired`]).
    pub fn register(&self, command_id: String) -> oneshot::Receiver<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.entries.lock().insert(
            command_id,
            PendingEntry {
                resolver: tx,
                enqueued_at: Instant::now(),
            },
        );
        rx
    }

    /// Removes `command_id` without resolving it — used when the publish
    /// that would have sent the command itself fails.
    pub fn remove(&self, command_id: &str) {
        self.entries.lock().remove(command_id);
    }

    /// Resolves the pending entry matching `response.command_id`.
    /// Returns `false` if no such entry exists — per §8, a Response with
    /// no matching pending entry is silently discarded.
    pub fn resolve(&self, response: ResponseEnvelope) -> bool {
        let Some(entry) = self.entries.lock().remove(&response.command_id) else {
            return false;
        };
        let _ = entry.resolver.send(Ok(response));
        true
    }

    /// Removes and rejects every pending entry with `Disconnected`, per
    /// §4.7 point 5.
    pub fn reject_all(&self) {
        for (_, entry) in self.entries.lock().drain() {
            let _ = entry.resolver.send(Err(PendingOutcome::Disconnected));
        }
    }

    /// Removes entries older than `timeout`, dropping their resolver
    /// (which rejects the awaiting future with a closed-channel error —
    /// `SessionClient` maps that to `Timeout`). Returns the removed
    /// command IDs for logging/event emission.
    pub fn sweep_expired(&self, timeout: Duration) -> Vec<String> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.enqueued_at) >= timeout)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            entries.remove(id);
        }
        expired
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for PendingCommands {
    fn default() -> Self {
        Self::new()
    }
}
