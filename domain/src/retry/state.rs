//! Observable state of the retry loop for the current logical send.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Progress of the current logical send across its attempts.
///
/// Reset when a new send starts; kept across retries of the same send;
/// discarded on success or when the user dismisses the error.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryState {
    /// Retries performed so far (0 on the first attempt).
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub is_streaming: bool,
    pub is_retrying: bool,
    /// Answer text received during the latest attempt.
    pub partial_response: String,
    /// Time of the last successfully dispatched event.
    pub last_activity: DateTime<Utc>,
}

impl Default for RetryState {
    fn default() -> Self {
        Self {
            retry_count: 0,
            last_error: None,
            is_streaming: false,
            is_retrying: false,
            partial_response: String::new(),
            last_activity: Utc::now(),
        }
    }
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// An attempt is about to start streaming.
    pub fn begin_attempt(&mut self) {
        self.is_streaming = true;
        self.last_error = None;
        self.partial_response.clear();
        self.touch();
    }

    /// A retryable failure was seen and retry `retry_count` is scheduled.
    pub fn record_retry(&mut self, retry_count: u32, error: impl Into<String>) {
        self.retry_count = retry_count;
        self.last_error = Some(error.into());
        self.is_streaming = false;
        self.is_retrying = true;
    }

    /// The send has failed for good.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
        self.is_streaming = false;
        self.is_retrying = false;
    }

    /// The attempt succeeded; transient flags are cleared.
    pub fn record_success(&mut self) {
        self.is_streaming = false;
        self.is_retrying = false;
        self.last_error = None;
    }

    /// Heartbeat: an event was dispatched.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Whether a stream should be considered dead at `now`.
    pub fn is_stale(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        if !self.is_streaming {
            return false;
        }
        match (now - self.last_activity).to_std() {
            Ok(silence) => silence > timeout,
            Err(_) => false,
        }
    }

    /// Whether a user-triggered retry is possible.
    pub fn can_retry(&self, max_retries: u32) -> bool {
        self.last_error.is_some()
            && !self.is_streaming
            && !self.is_retrying
            && self.retry_count < max_retries
    }
}
