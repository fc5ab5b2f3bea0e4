//! Exponential backoff policy for failed publish attempts.

use relaypost_config::RetryConfig;
use std::time::Duration;

use crate::failure::PublishFailure;

/// Decides whether and when a failed job may be retried.
///
/// Delays grow as `base * 2^(attempt - 1)` capped at `max_delay`. The
/// attempt number is 1-based; `max_attempts` counts total attempts, so a
/// job whose `max_attempts`th attempt fails is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl BackoffPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether the job may be attempted again after `failed_attempts`
    /// failures ending in the given failure.
    #[must_use]
    pub fn should_retry(&self, failed_attempts: u32, failure: &PublishFailure) -> bool {
        failure.is_retryable() && failed_attempts < self.max_attempts
    }

    /// Delay to wait before the given (1-based) retry attempt.
    ///
    /// `attempt` here is the attempt that just failed, so the first
    /// failure waits `base`, the second `2 * base`, and so on.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exp = attempt.saturating_sub(1).min(62);
        let factor = 1u64.checked_shl(exp).unwrap_or(u64::MAX);
        let delay = self
            .base_delay
            .as_secs()
            .saturating_mul(factor);
        Duration::from_secs(delay).min(self.max_delay)
    }
}

impl From<&RetryConfig> for BackoffPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_secs(config.base_delay_secs),
            Duration::from_secs(config.max_delay_secs),
        )
    }
}
