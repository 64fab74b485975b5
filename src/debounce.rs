use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

/// Runs only the most recently scheduled task once `delay` has passed without
/// another call to [`Debouncer::schedule`].
///
/// Each schedule takes a fresh generation token. A timer that wakes up holding a
/// stale token drops its task. A task that has already started is never
/// interrupted, so an in-flight request always completes.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules `task`, superseding anything scheduled earlier that has not fired yet.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, task: F) -> JoinHandle<bool>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if generation.load(Ordering::SeqCst) != token {
                trace!(token, "debounced task superseded");
                return false;
            }
            task.await;
            true
        })
    }

    /// Drops whatever is pending without scheduling anything new.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
