//! Retry with exponential backoff around a single fetch attempt.

use crate::error::{FetchError, Result};
use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry configuration, keyed off `[general] retry_attempts` in
/// `coralpkg-config`.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    fn build_backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries as usize)
            .with_jitter()
    }
}

/// Runs `operation` with exponential backoff, retrying only
/// [`FetchError::is_retryable`] failures.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    operation
        .retry(config.build_backoff())
        .when(|e: &FetchError| {
            let should_retry = e.is_retryable();
            if should_retry {
                debug!(error = %e, "retrying after error");
            }
            should_retry
        })
        .notify(|e: &FetchError, dur: Duration| {
            warn!(error = %e, delay = ?dur, "fetch failed, retrying");
        })
        .await
}
