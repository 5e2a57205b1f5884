//! Admission gate bounding how many analyses run at once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

use shotlens_core::defaults::MAX_CONCURRENT_ANALYSES;
use shotlens_core::{Error, Result};

#[derive(Debug, Default)]
struct Counters {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Counting semaphore with a fixed capacity.
///
/// Cloning shares the same slots. Waiters are served in FIFO order.
#[derive(Debug, Clone)]
pub struct AnalysisGate {
    semaphore: Arc<Semaphore>,
    counters: Arc<Counters>,
    capacity: usize,
}

impl AnalysisGate {
    /// A gate admitting `capacity` holders at once (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            counters: Arc::new(Counters::default()),
            capacity,
        }
    }

    /// Waits for a free slot. Fails only once the gate is closed.
    pub async fn acquire(&self) -> Result<GatePermit> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Internal("analysis gate closed".into()))?;
        Ok(self.admit(permit))
    }

    /// A slot if one is free right now.
    pub fn try_acquire(&self) -> Option<GatePermit> {
        let permit = self.semaphore.clone().try_acquire_owned().ok()?;
        Some(self.admit(permit))
    }

    fn admit(&self, permit: OwnedSemaphorePermit) -> GatePermit {
        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(now, Ordering::SeqCst);
        trace!(in_flight = now, "Gate slot acquired");
        GatePermit {
            _permit: permit,
            counters: self.counters.clone(),
        }
    }

    /// Rejects all current and future waiters.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Slots currently held.
    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of slots ever held at the same time.
    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }
}

impl Default for AnalysisGate {
    fn default() -> Self {
        Self::new(MAX_CONCURRENT_ANALYSES)
    }
}

/// Holds one gate slot; dropping it gives the slot back.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    counters: Arc<Counters>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capacity_and_release() {
        let gate = AnalysisGate::new(2);
        let a = gate.acquire().await.unwrap();
        let b = gate.acquire().await.unwrap();
        assert_eq!(gate.in_flight(), 2);
        assert!(gate.try_acquire().is_none());

        drop(a);
        assert_eq!(gate.in_flight(), 1);
        assert!(gate.try_acquire().is_some());
        drop(b);
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.available(), 2);
        assert_eq!(gate.peak(), 2);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        assert_eq!(AnalysisGate::new(0).capacity(), 1);
        assert_eq!(AnalysisGate::default().capacity(), MAX_CONCURRENT_ANALYSES);
    }

    #[tokio::test]
    async fn test_closed_gate_rejects() {
        let gate = AnalysisGate::new(1);
        gate.close();
        let err = gate.acquire().await.unwrap_err();
        assert!(err.to_string().contains("closed"));
    }

    #[tokio::test]
    async fn test_permit_released_when_task_panics() {
        let gate = AnalysisGate::new(1);
        let inner = gate.clone();
        let handle = tokio::spawn(async move {
            let _permit = inner.acquire().await.unwrap();
            panic!("analysis blew up");
        });
        assert!(handle.await.is_err());
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn test_permit_released_when_task_aborted() {
        let gate = AnalysisGate::new(1);
        let held = gate.acquire().await.unwrap();
        let inner = gate.clone();
        let waiter = tokio::spawn(async move {
            let _permit = inner.acquire().await.unwrap();
        });
        tokio::task::yield_now().await;
        waiter.abort();
        let _ = waiter.await;
        drop(held);
        assert_eq!(gate.available(), 1);
        assert_eq!(gate.in_flight(), 0);
    }
}
