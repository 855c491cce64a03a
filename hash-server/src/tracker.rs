//! In-flight request tracking for drain coordination.
//!
//! Every admitted unit of work holds an [`InFlightGuard`]. The guard releases
//! its slot when dropped, so the count stays paired on success, on early
//! returns, on panics, and when the request future is cancelled.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Notify;

/// Counts in-flight work and lets callers wait for the count to reach zero.
#[derive(Debug, Clone, Default)]
pub struct InFlightTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Debug, Default)]
struct TrackerInner {
    count: AtomicU64,
    drained: Notify,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one unit of work. Never blocks.
    ///
    /// The returned guard completes the unit when it is dropped.
    #[must_use = "dropping the guard completes the unit of work immediately"]
    pub fn register(&self) -> InFlightGuard {
        self.inner.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of units currently registered.
    pub fn in_flight(&self) -> u64 {
        self.inner.count.load(Ordering::SeqCst)
    }

    /// Waits until every registered unit has completed.
    ///
    /// Returns immediately when nothing is in flight. There is no timeout
    /// here; callers that need one wrap this in `tokio::time::timeout`.
    pub async fn await_drain(&self) {
        loop {
            // Enable the waiter before reading the count, otherwise a
            // completion between the load and the await would be missed.
            let notified = self.inner.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Scoped registration returned by [`InFlightTracker::register`].
#[derive(Debug)]
pub struct InFlightGuard {
    inner: Arc<TrackerInner>,
}

impl InFlightGuard {
    /// Completes the unit of work now instead of at end of scope.
    pub fn complete(self) {
        drop(self);
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let previous = self.inner.count.fetch_sub(1, Ordering::SeqCst);
        assert_ne!(previous, 0, "in-flight count underflow");
        if previous == 1 {
            self.inner.drained.notify_waiters();
        }
    }
}
