//! Runtime-independent background task spawning.
//!
//! The dispatcher, publisher and transport all need to spawn background
//! loops without hard-coding `tokio::spawn` at every call site, so tests
//! can swap in a spawner that tracks what was spawned. Grounded on the
//! `TaskSpawner` abstraction in the reference crate's `runtime.rs`.

use std::future::Future;
use std::pin::Pin;

/// Spawns a future to run in the background, detached from its caller.
pub trait TaskSpawner: Send + Sync {
    /// Spawns `future` and returns immediately; the task's result is
    /// discarded. Implementations must not block the caller.
    fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>);
}

/// The production [`TaskSpawner`], backed by the ambient `tokio` runtime.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSpawner;

impl TaskSpawner for TokioSpawner {
    fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>) {
        tokio::spawn(future);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn tokio_spawner_runs_the_future() {
        let counter = Arc::new(AtomicUsize::new(0));
        let spawner = TokioSpawner;
        let counter_clone = counter.clone();
        spawner.spawn(Box::pin(async move {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
