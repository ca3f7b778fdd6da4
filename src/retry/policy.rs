//! Exponential backoff with jitter, built on the `backoff` crate (§10.4).

use std::time::Duration;

use backoff::future::retry as backoff_retry;
use backoff::{Error as BackoffError, ExponentialBackoffBuilder};

use crate::error::LlmError;

/// Retry policy configuration: how many attempts, how long to wait between
/// them, and which errors are worth retrying at all.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
    /// Overrides [`LlmError::is_retryable`] when set.
    pub retry_condition: Option<fn(&LlmError) -> bool>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
            retry_condition: None,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    pub fn with_retry_condition(mut self, condition: fn(&LlmError) -> bool) -> Self {
        self.retry_condition = Some(condition);
        self
    }

    fn should_retry(&self, error: &LlmError) -> bool {
        match self.retry_condition {
            Some(condition) => condition(error),
            None => error.is_retryable(),
        }
    }

    /// Run `operation` under this policy, retrying with exponential backoff
    /// and jitter while [`Self::should_retry`] holds, up to `max_attempts`.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T, LlmError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, LlmError>>,
    {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(self.max_interval)
            .with_multiplier(self.multiplier)
            .with_max_elapsed_time(None)
            .build();

        let attempts = std::sync::atomic::AtomicU32::new(0);
        backoff_retry(backoff, || async {
            let attempt = attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            match operation().await {
                Ok(value) => Ok(value),
                Err(error) if attempt + 1 >= self.max_attempts || !self.should_retry(&error) => {
                    Err(BackoffError::permanent(error))
                }
                Err(error) => {
                    tracing::debug!(attempt, error = %error, "retrying after transient failure");
                    Err(BackoffError::transient(error))
                }
            }
        })
        .await
    }
}
