//! Delay policy between reconnection attempts.

use std::time::Duration;

/// Linear backoff bounded by a ceiling.
///
/// `delay(attempt) = min(base_delay * attempt, delay_ceiling)`. Attempts are
/// counted from 1; attempt 0 has no failure to back off from and yields
/// [`Duration::ZERO`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base_delay: Duration,
    delay_ceiling: Duration,
}

impl BackoffPolicy {
    /// Creates a policy growing by `base_delay` per attempt, capped at
    /// `delay_ceiling`.
    pub fn new(base_delay: Duration, delay_ceiling: Duration) -> Self {
        Self {
            base_delay,
            delay_ceiling,
        }
    }

    /// Returns the delay to wait before reconnecting after `attempt`
    /// consecutive failures.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .checked_mul(attempt)
            .map_or(self.delay_ceiling, |delay| delay.min(self.delay_ceiling))
    }

    /// Returns the per-attempt increment.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Returns the ceiling no delay exceeds.
    pub fn delay_ceiling(&self) -> Duration {
        self.delay_ceiling
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(30))
    }
}
