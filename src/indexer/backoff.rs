//! Capped exponential backoff for resubscription.

use std::time::Duration;

/// Retry schedule used when a subscription cannot be (re)established.
///
/// Attempt `n` (1-based) waits `initial_delay * 2^(n-1)`, capped at
/// `max_delay`, with ±12.5% jitter when enabled. After `max_attempts` failed
/// attempts the indexer gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Failed attempts tolerated before giving up (at least 1)
    pub max_attempts: u32,
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Randomize delays so many indexers don't reconnect in lockstep
    pub jitter: bool,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: true,
        }
    }
}

impl BackoffPolicy {
    /// Creates a policy with jitter enabled.
    #[must_use]
    pub const fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            jitter: true,
        }
    }

    /// Disables jitter, giving a deterministic schedule.
    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Attempts allowed, never less than one.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self
            .initial_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay);

        if !self.jitter {
            return delay;
        }

        let jitter_factor = 0.25 * (rand::random::<f64>() - 0.5);
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let jitter_ms = (delay.as_millis() as f64 * jitter_factor).round() as i64;
        if jitter_ms >= 0 {
            delay + Duration::from_millis(jitter_ms.unsigned_abs())
        } else {
            delay.saturating_sub(Duration::from_millis(jitter_ms.unsigned_abs()))
        }
    }
}
