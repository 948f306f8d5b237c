//! Exponential backoff for transient upstream errors: base 1s, multiplier
//! 2, capped at 30s, 3 retries by default. Recovery here is local only —
//! everything else propagates to the workflow loop's failure analysis.

use schemas::{EngineError, Result};
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
    pub multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_retries: DEFAULT_MAX_RETRIES,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

impl BackoffPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(scaled).min(self.max_delay)
    }
}

/// Whether an `EngineError` is the kind of transient upstream failure this
/// policy is allowed to retry. Everything else is surfaced immediately.
fn is_retryable(error: &EngineError) -> bool {
    matches!(
        error,
        EngineError::UpstreamError(_) | EngineError::OperationTimeout { .. }
    )
}

/// Runs `operation` up to `policy.max_retries + 1` times, sleeping with
/// exponential backoff between retryable failures. The first non-retryable
/// error, or the last retryable one once retries are exhausted, is returned.
pub async fn retry_with_backoff<F, Fut, T>(policy: BackoffPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if is_retryable(&error) && attempt < policy.max_retries => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(attempt, ?delay, error = %error, "retrying after transient failure");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
