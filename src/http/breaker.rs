//! Consecutive-failure circuit breaker shared by every request of a [`Client`](super::Client).

use log::warn;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Failures that open the breaker.
pub const FAILURE_THRESHOLD: u32 = 5;

/// Time after the last failure before an open breaker closes again.
pub const COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
struct State {
    failures: u32,
    last_failure: Option<Instant>,
}

/// Counts failures and blocks requests once the threshold is reached.
///
/// The breaker closes lazily: the first [`is_open`](Self::is_open) check after
/// the cooldown resets the counter. There is no half-open probe state.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<State>,
    threshold: u32,
    cooldown: Duration,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(FAILURE_THRESHOLD, COOLDOWN)
    }
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            state: Mutex::new(State::default()),
            threshold,
            cooldown,
        }
    }

    /// Reports whether requests are currently blocked.
    pub fn is_open(&self) -> bool {
        let mut state = self.state.lock();
        if state.failures < self.threshold {
            return false;
        }
        let cooled_down = state
            .last_failure
            .is_none_or(|at| at.elapsed() > self.cooldown);
        if cooled_down {
            state.failures = 0;
            return false;
        }
        true
    }

    pub fn record_success(&self) {
        self.state.lock().failures = 0;
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.failures += 1;
        state.last_failure = Some(Instant::now());
        if state.failures == self.threshold {
            warn!(
                "Circuit breaker opened after {} consecutive failures",
                state.failures
            );
        }
    }

    /// Current failure count.
    pub fn failures(&self) -> u32 {
        self.state.lock().failures
    }
}
