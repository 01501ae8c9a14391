use crate::core::config::RetryConfig;
use anyhow::Error;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error};

/// Bounded retry with exponential backoff.
///
/// After failed attempt `n` (counted from 0) the controller waits
/// `base_delay * backoff_factor^n` before trying again. There is no wait
/// after the final attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_factor: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts,
            backoff_factor: config.backoff_factor,
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_factor.saturating_pow(attempt);
        self.base_delay.saturating_mul(multiplier)
    }
}

/// Runs `operation` until it succeeds or the policy's attempts are spent.
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `policy`: Attempt budget and backoff; at least one attempt is always made
/// - `label`: Name of the source, used in log lines
///
/// # Returns
/// Either the successful result or the error from the last attempt
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    policy: &RetryPolicy,
    label: &str,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt + 1 >= max_attempts {
                    error!(
                        source = label,
                        "All {} attempts failed: {:#}", max_attempts, err
                    );
                    return Err(err);
                }
                let delay = policy.delay_for(attempt);
                debug!(
                    source = label,
                    "Attempt {}/{} failed: {:#}. Retrying in {:?}...",
                    attempt + 1,
                    max_attempts,
                    err,
                    delay
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}
