use std::ops::Range;
use std::time::Duration;

use rand::Rng;

pub const DEFAULT_PORT: u16 = 8080;
pub const MIN_PORT: u16 = 1024;
pub const MAX_PORT: u16 = 9000;
pub const MAX_SECRET_LEN: usize = 32;
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime settings shared by the handlers and the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub port: u16,
    /// Artificial per-request delay, in milliseconds, half-open.
    pub delay_ms: Range<u64>,
    /// Longest accepted secret, counted in characters.
    pub max_secret_len: usize,
    /// Upper bound on closing the listener once the drain has finished.
    pub shutdown_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            delay_ms: 5_000..6_000,
            max_secret_len: MAX_SECRET_LEN,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl Settings {
    /// Picks a delay uniformly from `delay_ms`.
    ///
    /// An empty range yields its start, so tests can pin the delay with `n..n`.
    pub fn sample_delay(&self) -> Duration {
        let Range { start, end } = self.delay_ms;
        let millis = if start < end {
            rand::thread_rng().gen_range(start..end)
        } else {
            start
        };
        Duration::from_millis(millis)
    }
}
