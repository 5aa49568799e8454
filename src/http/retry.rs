//! Retry policy for API calls: status routing, exponential backoff with jitter
//! and cancellable sleeps.

use log::{debug, warn};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::breaker::CircuitBreaker;
use crate::error::{AUTH_FAILURE_REASON, Error};

/// Default maximum number of retries for rate-limited requests.
pub const MAX_RETRIES: u32 = 3;

/// Default base delay for exponential backoff.
pub const BASE_DELAY: Duration = Duration::from_secs(1);

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// How many times, and how patiently, rate-limited requests are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay: BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// `base_delay * 2^attempt`, without jitter. Saturates at [`Duration::MAX`].
    pub fn backoff(&self, attempt: u32) -> Duration {
        let Some(factor) = 1u128.checked_shl(attempt) else {
            return Duration::MAX;
        };
        let nanos = self.base_delay.as_nanos().saturating_mul(factor);
        match u64::try_from(nanos / NANOS_PER_SEC) {
            Ok(secs) => Duration::new(secs, (nanos % NANOS_PER_SEC) as u32),
            Err(_) => Duration::MAX,
        }
    }

    /// Backoff for `attempt` plus a random jitter in `[0, backoff / 2)`.
    pub fn backoff_with_jitter(&self, attempt: u32) -> Duration {
        let delay = self.backoff(attempt);
        let max_jitter = u64::try_from((delay / 2).as_nanos()).unwrap_or(u64::MAX);
        if max_jitter == 0 {
            return delay;
        }
        let jitter = rand::thread_rng().gen_range(0..max_jitter);
        delay.saturating_add(Duration::from_nanos(jitter))
    }

    /// Whole seconds a caller should wait once retries are exhausted.
    pub fn rate_limit_wait(&self) -> u64 {
        self.backoff(self.max_retries).as_secs()
    }
}

/// What the retry loop does with a failed response, by status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPolicy {
    /// 401/403: fatal, counts toward the breaker.
    Auth,
    /// 429: retried, ignored by the breaker.
    RateLimited,
    /// 5xx: fatal, counts toward the breaker.
    ServerError,
    /// Any other 4xx: fatal.
    ClientError,
}

impl StatusPolicy {
    pub fn of(status: u16) -> Self {
        match status {
            401 | 403 => StatusPolicy::Auth,
            429 => StatusPolicy::RateLimited,
            s if s >= 500 => StatusPolicy::ServerError,
            _ => StatusPolicy::ClientError,
        }
    }
}

/// Sleeps for `delay` unless `cancel` fires first.
pub async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> Result<(), Error> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

/// Runs `operation` under the circuit breaker, retrying rate-limited attempts.
///
/// Every attempt is gated by `breaker`. Errors other than [`Error::Api`]
/// (transport failures, cancellation, decoding) are returned as-is.
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    policy: &RetryPolicy,
    breaker: &CircuitBreaker,
    cancel: &CancellationToken,
    operation: F,
) -> Result<T, Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut attempt = 0;

    loop {
        if breaker.is_open() {
            debug!("{}: circuit breaker open, not sending", operation_name);
            return Err(Error::CircuitOpen);
        }

        let err = match operation().await {
            Ok(value) => {
                breaker.record_success();
                return Ok(value);
            }
            Err(e) => e,
        };

        let Error::Api(api_err) = &err else {
            debug!("{}: non-retryable error: {}", operation_name, err);
            return Err(err);
        };

        match StatusPolicy::of(api_err.status()) {
            StatusPolicy::Auth => {
                breaker.record_failure();
                return Err(Error::Auth {
                    reason: AUTH_FAILURE_REASON,
                });
            }
            StatusPolicy::RateLimited if attempt < policy.max_retries => {
                let delay = policy.backoff_with_jitter(attempt);
                warn!(
                    "{}: rate limited (attempt {}/{}), retrying in {}ms...",
                    operation_name,
                    attempt + 1,
                    policy.max_retries + 1,
                    delay.as_millis()
                );
                sleep_or_cancel(delay, cancel).await?;
                attempt += 1;
            }
            StatusPolicy::RateLimited => {
                return Err(Error::RateLimit {
                    retry_after: policy.rate_limit_wait(),
                });
            }
            StatusPolicy::ServerError => {
                breaker.record_failure();
                return Err(err);
            }
            StatusPolicy::ClientError => return Err(err),
        }
    }
}
