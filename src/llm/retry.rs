//! Exponential backoff retry logic for the chat-completion endpoint.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;
use tracing::warn;

const INITIAL_INTERVAL_SECS: u64 = 1;
const MAX_INTERVAL_SECS: u64 = 30;
const MULTIPLIER: f64 = 2.0;
const RANDOMIZATION_FACTOR: f64 = 0.5;

/// How often and how patiently to retry transient failures.
///
/// `max_retries` counts retries, so a request is attempted at most
/// `max_retries + 1` times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: crate::config::DEFAULT_MAX_RETRIES,
            initial_interval: Duration::from_secs(INITIAL_INTERVAL_SECS),
            max_interval: Duration::from_secs(MAX_INTERVAL_SECS),
        }
    }
}

impl RetryPolicy {
    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Nominal (un-jittered) wait before retry number `retry` (1-based).
    pub fn next_delay(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(31) as i32;
        self.initial_interval
            .mul_f64(MULTIPLIER.powi(exp))
            .min(self.max_interval)
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(self.max_interval)
            .with_multiplier(MULTIPLIER)
            .with_randomization_factor(RANDOMIZATION_FACTOR)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Retry an async operation with exponential backoff.
///
/// `attempt` receives the 1-based attempt number. Errors for which
/// `is_transient` is false are returned at once. When every attempt fails
/// transiently, `wrap_exhausted` turns the attempt count and the last error
/// into the caller's exhausted variant.
pub async fn retry_with_backoff<T, E, Fut, F, P, W>(
    policy: &RetryPolicy,
    mut attempt: F,
    is_transient: P,
    wrap_exhausted: W,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    W: FnOnce(u32, E) -> E,
    E: std::fmt::Display,
{
    let mut backoff = policy.backoff();
    let max_attempts = policy.max_attempts();
    let mut attempts = 0;

    loop {
        attempts += 1;

        let err = match attempt(attempts).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !is_transient(&err) {
            return Err(err);
        }
        if attempts >= max_attempts {
            return Err(wrap_exhausted(attempts, err));
        }

        let wait = backoff
            .next_backoff()
            .unwrap_or_else(|| policy.next_delay(attempts));
        warn!(
            "Attempt {}/{} failed: {}; retrying in {:.1}s",
            attempts,
            max_attempts,
            err,
            wait.as_secs_f64()
        );
        tokio::time::sleep(wait).await;
    }
}
