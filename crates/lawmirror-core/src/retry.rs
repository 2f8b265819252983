//! Retry with exponential backoff for transient failures

use std::fmt::Display;
use std::time::Duration;

use indicatif::ProgressBar;

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Retry budget and backoff base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Exponential backoff: `base * 2^(attempt-1)` (1s, 2s, 4s, ... for a 1s base)
pub fn backoff_duration(base: Duration, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(31);
    base.saturating_mul(1u32 << exp)
}

/// Retry a fallible operation with exponential backoff.
///
/// Only errors reporting [`Retryable::is_retryable`] are retried, up to
/// `policy.max_retries` times. Returns the first success, or the last error
/// once the budget is spent or a terminal error is seen.
pub fn retry_with_backoff<T, E>(
    label: &str,
    policy: &RetryPolicy,
    pb: &ProgressBar,
    mut attempt_fn: impl FnMut() -> Result<T, E>,
) -> Result<T, E>
where
    E: Retryable + Display,
{
    let mut attempt = 0u32;
    loop {
        match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < policy.max_retries && e.is_retryable() => {
                attempt += 1;
                let delay = backoff_duration(policy.base_delay, attempt);
                pb.set_message(format!("retry {attempt}/{}...", policy.max_retries));
                log::warn!(
                    "{label}: attempt {attempt}/{} failed: {e}, retrying in {delay:?}",
                    policy.max_retries + 1
                );
                std::thread::sleep(delay);
            }
            Err(e) => {
                log::debug!("{label}: giving up after {} attempt(s): {e}", attempt + 1);
                return Err(e);
            }
        }
    }
}
