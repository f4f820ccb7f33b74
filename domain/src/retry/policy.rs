//! Retry policy: how often and how patiently a send is retried.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded exponential-backoff policy for one logical send.
///
/// Delay before retry `n` (1-based) is
/// `retry_delay * backoff_multiplier^(n - 1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = `max_retries + 1`).
    pub max_retries: u32,
    /// Base delay before the first retry.
    pub retry_delay: Duration,
    /// Growth factor applied for each further retry.
    pub backoff_multiplier: f64,
    /// Hard cap on the duration of a single attempt.
    pub timeout: Duration,
    /// Longest silence tolerated between two stream fragments.
    pub heartbeat_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(2000),
            backoff_multiplier: 1.5,
            timeout: Duration::from_millis(600_000),
            heartbeat_timeout: None,
        }
    }
}

impl RetryPolicy {
    /// Policy used for streaming chat sends (15 minute attempts, 30s heartbeat).
    pub fn for_chat() -> Self {
        Self {
            timeout: Duration::from_millis(900_000),
            heartbeat_timeout: Some(Duration::from_secs(30)),
            ..Self::default()
        }
    }

    /// Policy used for attachment uploads.
    pub fn for_upload() -> Self {
        Self {
            max_retries: 2,
            retry_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            timeout: Duration::from_millis(600_000),
            heartbeat_timeout: None,
        }
    }

    /// Backoff delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        self.retry_delay
            .mul_f64(self.backoff_multiplier.powi(exponent))
    }

    /// Total number of attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    // ==================== Builder Methods ====================

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_heartbeat_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.retry_delay, Duration::from_millis(2000));
        assert_eq!(policy.backoff_multiplier, 1.5);
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn test_backoff_sequence() {
        let policy = RetryPolicy::default();
        let delays: Vec<u128> = (1..=3).map(|n| policy.delay_for(n).as_millis()).collect();
        assert_eq!(delays, vec![2000, 3000, 4500]);
    }

    #[test]
    fn test_chat_policy_timeouts() {
        let policy = RetryPolicy::for_chat();
        assert_eq!(policy.timeout, Duration::from_secs(900));
        assert_eq!(policy.heartbeat_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_upload_policy_delays() {
        let policy = RetryPolicy::for_upload();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
    }
}
