//! Exponential-backoff retry for any fallible async operation, generalized
//! from the scraper module's `RetryWrapper` for the workflow engine's
//! per-job-call retries (recall, validation).

use std::time::Duration;

use crate::config::Config;
use crate::error::Result;

/// Backoff parameters derived from `Config`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Initial backoff delay.
    pub initial_delay: Duration,
    /// Delay cap; backoff never grows past this.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Build a policy from the engine's configured retry fields.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.retry_attempts.max(1),
            initial_delay: Duration::from_secs_f64(config.retry_delay.max(0.0)),
            max_delay: Duration::from_secs_f64(config.max_retry_delay.max(config.retry_delay)),
        }
    }
}

/// Run `operation` up to `policy.max_attempts` times, doubling the delay
/// between attempts (capped at `policy.max_delay`). Stops immediately on
/// a non-retryable error.
pub async fn retry_with_backoff<F, Fut, T>(policy: RetryPolicy, operation_name: &str, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    let mut backoff = policy.initial_delay;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempt += 1;

                if !e.is_retryable() {
                    log::debug!("{operation_name}: non-retryable error, failing immediately: {e}");
                    return Err(e);
                }

                if attempt >= policy.max_attempts {
                    log::warn!(
                        "{operation_name}: max retries ({}) exceeded: {e}",
                        policy.max_attempts
                    );
                    return Err(e);
                }

                log::info!(
                    "{operation_name}: retry attempt {attempt}/{} after {backoff:?}: {e}",
                    policy.max_attempts
                );

                tokio::time::sleep(backoff).await;

                backoff = Duration::from_secs_f64((backoff.as_secs_f64() * 2.0).min(policy.max_delay.as_secs_f64()));
            }
        }
    }
}
