use replybot_core::{CoreError, SocialApiError};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Fixed wait after the platform throttles us (HTTP 429)
    pub throttle_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2, // one retry, never a tight loop
            throttle_backoff: Duration::from_secs(15 * 60),
        }
    }
}

impl RetryConfig {
    pub fn with_backoff(throttle_backoff: Duration) -> Self {
        Self {
            throttle_backoff,
            ..Default::default()
        }
    }
}

/// Retry strategy based on error type
#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Wait the fixed throttle backoff, then try again
    RetryAfterBackoff,
    /// Don't retry; the caller logs and skips
    NoRetry,
}

/// Only provider-side throttling is retried; everything else is skipped for this cycle.
pub fn get_retry_strategy(error: &CoreError) -> RetryStrategy {
    match error {
        CoreError::SocialApi(SocialApiError::RateLimitExceeded { .. }) => {
            RetryStrategy::RetryAfterBackoff
        }
        _ => RetryStrategy::NoRetry,
    }
}

/// Wraps write calls with the throttle policy.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute an operation, retrying once after a fixed backoff when throttled.
    /// The last error is returned unchanged so callers can still classify it.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        info!("{} succeeded after {} attempts", operation_name, attempt);
                    }
                    return Ok(result);
                }
                Err(error) => {
                    let retry = get_retry_strategy(&error) == RetryStrategy::RetryAfterBackoff
                        && attempt < self.config.max_attempts;

                    if !retry {
                        debug!(
                            "Giving up on {} after attempt {}: {}",
                            operation_name, attempt, error
                        );
                        return Err(error);
                    }

                    warn!(
                        "{} throttled (attempt {}/{}), backing off {:?}",
                        operation_name, attempt, self.config.max_attempts, self.config.throttle_backoff
                    );
                    sleep(self.config.throttle_backoff).await;
                }
            }
        }
    }
}
