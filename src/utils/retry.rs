//! Bounded retry with exponential backoff for outbound HTTP calls.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Backoff policy for remote calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one. Never less than 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryConfig {
    /// Allow `retries` additional attempts after the first.
    #[must_use]
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }

    /// Delay to wait after the failed attempt number `attempt` (1-based).
    ///
    /// Doubles per attempt, capped at `max_delay`, plus up to 25% jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1 << exp).min(self.max_delay);
        delay + Duration::from_millis(jitter(delay.as_millis() as u64 / 4))
    }
}

/// Determines if an error is worth another attempt.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Run `operation` until it succeeds, fails permanently, or attempts run out.
///
/// The last error is returned when every attempt fails.
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < max_attempts && error.is_retryable() => {
                let delay = config.backoff(attempt);
                tracing::debug!(attempt, %error, ?delay, "retrying after transient error");
                sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                if attempt > 1 {
                    tracing::debug!(attempts = attempt, %error, "giving up after retries");
                }
                return Err(error);
            }
        }
    }
}

// Not cryptographic; only spreads concurrent retries apart.
fn jitter(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    seed % max
}
