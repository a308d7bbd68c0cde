//! Configuration for the sync queue.

use std::time::Duration;

/// Configuration for queue draining and retry behavior.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum number of attempts per item before it parks as failed.
    pub max_retries: u32,
    /// Delay before each retry, indexed by how many attempts have
    /// already been made; the last entry repeats when exhausted.
    pub retry_delays: Vec<Duration>,
    /// Interval between periodic drain passes while online.
    pub drain_interval: Duration,
    /// Timeout handed to the transport for each call.
    pub call_timeout: Duration,
}

impl QueueConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of attempts per item.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the retry delay schedule.
    #[must_use]
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// Sets the periodic drain interval.
    #[must_use]
    pub fn with_drain_interval(mut self, interval: Duration) -> Self {
        self.drain_interval = interval;
        self
    }

    /// Sets the per-call transport timeout.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Returns the delay before the next attempt for an item that has
    /// already made `attempts` attempts.
    pub fn retry_delay(&self, attempts: u32) -> Duration {
        if self.retry_delays.is_empty() {
            return Duration::ZERO;
        }
        let idx = (attempts as usize).min(self.retry_delays.len() - 1);
        self.retry_delays[idx]
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delays: vec![
                Duration::from_secs(1),
                Duration::from_secs(5),
                Duration::from_secs(15),
                Duration::from_secs(30),
                Duration::from_secs(60),
            ],
            drain_interval: Duration::from_secs(30),
            call_timeout: Duration::from_secs(10),
        }
    }
}
