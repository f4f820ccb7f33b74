//! Retry controller
//!
//! Runs an operation with a per-attempt timeout and retries it with
//! exponential backoff while the failure is transient. Non-retryable
//! failures return immediately.

use crate::ports::chat_api::ApiError;
use rosti_domain::{RetryPolicy, RetryState};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Why a retried operation gave up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    /// A non-retryable failure; no retries were attempted after it.
    #[error("{0}")]
    Fatal(ApiError),

    /// Every attempt failed with a retryable error.
    #[error("Max retries ({max_retries}) exceeded: {last}")]
    MaxRetriesExceeded { max_retries: u32, last: ApiError },
}

impl RetryError {
    /// The error of the final attempt.
    pub fn last_error(&self) -> &ApiError {
        match self {
            RetryError::Fatal(e) => e,
            RetryError::MaxRetriesExceeded { last, .. } => last,
        }
    }

    /// Whether a later, user-triggered retry could help.
    pub fn is_retryable(&self) -> bool {
        self.last_error().is_retryable()
    }
}

/// Executes operations under a [`RetryPolicy`], recording progress in a
/// [`RetryState`].
///
/// Attempts run strictly one after another.
pub struct RetryController {
    policy: RetryPolicy,
    state: Arc<Mutex<RetryState>>,
}

impl RetryController {
    /// Controller with a private state.
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_state(policy, Arc::default())
    }

    /// Controller recording into a shared state.
    pub fn with_state(policy: RetryPolicy, state: Arc<Mutex<RetryState>>) -> Self {
        Self { policy, state }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn state(&self) -> &Arc<Mutex<RetryState>> {
        &self.state
    }

    /// Run `operation` until it succeeds, fails fatally, or the retry budget
    /// is spent.
    ///
    /// `operation` receives the 1-based attempt number. `on_retry` is called
    /// with the retry number, the error and the delay before each retry.
    /// Each attempt is bounded by the policy timeout; an expired attempt
    /// counts as [`ApiError::Timeout`].
    pub async fn execute_with_retry<T, F, Fut, R>(
        &self,
        mut operation: F,
        mut on_retry: R,
    ) -> Result<T, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
        R: FnMut(u32, &ApiError, Duration),
    {
        {
            let mut state = self.state.lock().await;
            state.retry_count = 0;
            state.last_error = None;
        }

        let max_retries = self.policy.max_retries;
        let mut retry = 0;

        loop {
            let attempt = retry + 1;
            debug!("Attempt {}/{}", attempt, self.policy.max_attempts());

            let result = match tokio::time::timeout(self.policy.timeout, operation(attempt)).await
            {
                Ok(result) => result,
                Err(_) => Err(ApiError::Timeout),
            };

            let error = match result {
                Ok(value) => {
                    self.state.lock().await.record_success();
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !error.is_retryable() {
                warn!("Attempt {} failed with a non-retryable error: {}", attempt, error);
                self.state.lock().await.record_failure(error.to_string());
                return Err(RetryError::Fatal(error));
            }

            if retry >= max_retries {
                warn!("Giving up after {} retries: {}", max_retries, error);
                self.state.lock().await.record_failure(error.to_string());
                return Err(RetryError::MaxRetriesExceeded {
                    max_retries,
                    last: error,
                });
            }

            retry += 1;
            let delay = self.policy.delay_for(retry);
            warn!(
                "Attempt {} failed: {}; retry {}/{} in {:?}",
                attempt, error, retry, max_retries, delay
            );
            self.state
                .lock()
                .await
                .record_retry(retry, error.to_string());
            on_retry(retry, &error, delay);

            tokio::time::sleep(delay).await;
            self.state.lock().await.is_retrying = false;
        }
    }
}
