//! Running request statistics shared by every handler.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;

/// Point-in-time copy of the statistics, as served by `/stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    /// Number of successfully processed hashing requests.
    #[serde(rename = "total")]
    pub request_count: u64,
    /// Folding average of request latency, in microseconds.
    #[serde(rename = "average")]
    pub average_latency_micros: u64,
}

/// Thread-safe aggregator for request count and average latency.
///
/// Writers take the exclusive lock for a couple of integer operations only,
/// so `std::sync::RwLock` is used rather than an async lock: no guard is ever
/// held across an `.await`.
///
/// # Folding average
///
/// The average is not a cumulative mean. The first sample sets it directly;
/// every later sample replaces it with `(average + sample) / 2`, truncated.
/// Recent samples therefore dominate the reported value. Clients and tests
/// rely on exactly this rule.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    inner: RwLock<Statistics>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears both counters.
    pub fn reset(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Statistics::default();
    }

    /// Folds one completed request's latency into the statistics.
    pub fn record(&self, duration_micros: u64) {
        let mut stats = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        stats.request_count += 1;
        stats.average_latency_micros = if stats.request_count == 1 {
            duration_micros
        } else {
            // Widen so two large samples cannot overflow before the division.
            ((u128::from(stats.average_latency_micros) + u128::from(duration_micros)) / 2) as u64
        };
    }

    /// Records a wall-clock duration, truncated to whole microseconds.
    pub fn record_duration(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.record(micros);
    }

    /// Returns both counters from a single lock acquisition.
    pub fn snapshot(&self) -> Statistics {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}
