//! Lifecycle control surface, carried from the teacher's `lifecycle.rs`
//! in spirit: a small trait so `main.rs`'s signal handling doesn't need
//! to know how shutdown is actually wired into the bootstrap.

use tokio_util::sync::CancellationToken;

/// Requests shutdown or restart of a running bridge instance.
pub trait Lifecycle: Send + Sync {
    /// Requests a graceful shutdown. Idempotent — calling it more than
    /// once has no additional effect.
    fn request_shutdown(&self);

    /// Whether shutdown has been requested.
    fn shutdown_requested(&self) -> bool;
}

/// The production [`Lifecycle`], backed by a [`CancellationToken`] shared
/// with every background task started by [`crate::bootstrap`].
#[derive(Clone)]
pub struct ServerLifecycle {
    token: CancellationToken,
}

impl ServerLifecycle {
    #[must_use]
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl Lifecycle for ServerLifecycle {
    fn request_shutdown(&self) {
        self.token.cancel();
    }

    fn shutdown_requested(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A [`Lifecycle`] that ignores every request — useful in tests that
/// drive shutdown directly through a `BridgeHandle` instead of through
/// signal handling.
#[derive(Clone, Copy, Default)]
pub struct NoopLifecycle;

impl Lifecycle for NoopLifecycle {
    fn request_shutdown(&self) {}

    fn shutdown_requested(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_lifecycle_reflects_cancellation() {
        let token = CancellationToken::new();
        let lifecycle = ServerLifecycle::new(token.clone());
        assert!(!lifecycle.shutdown_requested());
        lifecycle.request_shutdown();
        assert!(lifecycle.shutdown_requested());
        assert!(token.is_cancelled());
    }

    #[test]
    fn noop_lifecycle_never_reports_shutdown() {
        let lifecycle = NoopLifecycle;
        lifecycle.request_shutdown();
        assert!(!lifecycle.shutdown_requested());
    }
}
