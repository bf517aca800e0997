//! Cancellable, re-armable one-shot timer.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// One-shot timer with cancel-and-rearm semantics.
///
/// Each [`rearm`](Self::rearm) cancels the previous shot, so only the most
/// recently scheduled callback can fire. The callback runs on the runtime
/// the timer was created with.
pub struct DelayTimer {
    runtime: Handle,
    delay: Duration,
    shot: Mutex<Option<JoinHandle<()>>>,
}

impl DelayTimer {
    /// Create a timer firing `delay` after each rearm.
    pub fn new(runtime: Handle, delay: Duration) -> Self {
        Self {
            runtime,
            delay,
            shot: Mutex::new(None),
        }
    }

    /// The configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel any pending shot and schedule `on_fire` to run after the delay.
    pub fn rearm<F>(&self, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let delay = self.delay;
        let mut shot = self.shot.lock();
        if let Some(pending) = shot.take() {
            pending.abort();
        }
        *shot = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire();
        }));
    }
}

impl std::fmt::Debug for DelayTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayTimer")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}
