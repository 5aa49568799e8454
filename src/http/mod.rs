//! HTTP client with circuit breaker, rate-limit retries and error classification.

mod breaker;
mod client;
mod retry;

pub use breaker::{COOLDOWN, CircuitBreaker, FAILURE_THRESHOLD};
pub use client::{
    API_PATH, AUTH_HEADER, Client, ClientBuilder, DEFAULT_TIMEOUT, IDEMPOTENCY_KEY_HEADER,
    decode_body, normalize_base_url,
};
pub use retry::{BASE_DELAY, MAX_RETRIES, RetryPolicy, StatusPolicy, sleep_or_cancel, with_retry};
