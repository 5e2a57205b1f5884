//! Delay-then-run scheduling where each new request supersedes the last.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Coalesces bursts of requests into the last one.
///
/// `schedule` cancels whatever is still waiting, then waits `delay` before
/// running the new work. Work that has already started is not interrupted.
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: Mutex<Option<CancellationToken>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `work` after `delay` unless superseded or cancelled first.
    ///
    /// The handle resolves to `None` when the work never ran.
    pub fn schedule<F, T>(&self, delay: Duration, work: F) -> JoinHandle<Option<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let token = CancellationToken::new();
        if let Some(previous) = self.slot().replace(token.clone()) {
            previous.cancel();
        }

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    trace!("Debounced work superseded");
                    None
                }
                _ = tokio::time::sleep(delay) => Some(work.await),
            }
        })
    }

    /// Cancels pending work, if any.
    pub fn cancel(&self) {
        if let Some(token) = self.slot().take() {
            token.cancel();
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_runs_after_delay() {
        let debouncer = Debouncer::new();
        let handle = debouncer.schedule(Duration::from_millis(50), async { 7 });
        assert_eq!(handle.await.unwrap(), Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_work() {
        let debouncer = Debouncer::new();
        let handle = debouncer.schedule(Duration::from_millis(50), async { 7 });
        debouncer.cancel();
        assert_eq!(handle.await.unwrap(), None);
    }
}
