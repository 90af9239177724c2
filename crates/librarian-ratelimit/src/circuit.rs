//! Per-provider circuit breaker: `closed -> open -> half-open -> closed`, with
//! thresholds that adapt to the recent mix of failure kinds (spec §4.7).

use librarian_core::config::CircuitBreakerConfig;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimit,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: CircuitState,
    failures: VecDeque<(Instant, FailureKind)>,
    opened_at: Option<Instant>,
    half_open_successes: u32,
    half_open_inflight: bool,
    effective_failure_threshold: u32,
    token_rate_scale: f64,
}

pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failures: VecDeque::new(),
                opened_at: None,
                half_open_successes: 0,
                half_open_inflight: false,
                effective_failure_threshold: config.failure_threshold,
                token_rate_scale: 1.0,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// The refill-rate multiplier to apply to a paired [`crate::TokenBucket`] while
    /// rate-limit failures dominate the recent failure mix.
    pub fn suggested_token_rate_scale(&self) -> f64 {
        self.inner.lock().token_rate_scale
    }

    /// Whether a request may proceed right now. Half-open admits exactly one probe at
    /// a time.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let opened_at = inner.opened_at.expect("open state always sets opened_at");
                if opened_at.elapsed() >= Duration::from_millis(self.config.open_duration_ms) {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_successes = 0;
                    inner.half_open_inflight = true;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_inflight {
                    false
                } else {
                    inner.half_open_inflight = true;
                    true
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.half_open_inflight = false;
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.failures.clear();
                    inner.effective_failure_threshold = self.config.failure_threshold;
                    inner.token_rate_scale = 1.0;
                }
            }
            CircuitState::Closed => {
                // A success in the closed state does not erase prior failures within
                // the window; it simply does not add one.
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self, kind: FailureKind) {
        let mut inner = self.inner.lock();
        let now = Instant::now();

        if inner.state == CircuitState::HalfOpen {
            inner.half_open_inflight = false;
            inner.state = CircuitState::Open;
            inner.opened_at = Some(now);
            return;
        }

        inner.failures.push_back((now, kind));
        let window = Duration::from_millis(self.config.failure_window_ms);
        while let Some((t, _)) = inner.failures.front() {
            if now.duration_since(*t) > window {
                inner.failures.pop_front();
            } else {
                break;
            }
        }

        let rate_limit_count = inner.failures.iter().filter(|(_, k)| *k == FailureKind::RateLimit).count();
        let total = inner.failures.len();
        if total > 0 && rate_limit_count * 2 > total {
            // Rate-limit failures dominate: ease off the paired token bucket instead of
            // tripping the breaker as readily.
            inner.token_rate_scale = 0.5;
            inner.effective_failure_threshold = self.config.failure_threshold;
        } else if total > 0 {
            inner.token_rate_scale = 1.0;
            inner.effective_failure_threshold = (self.config.failure_threshold / 2).max(2);
        }

        if inner.state == CircuitState::Closed && total as u32 >= inner.effective_failure_threshold {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            failure_window_ms: 10_000,
            open_duration_ms: 20,
            success_threshold: 2,
        }
    }

    #[test]
    fn opens_after_threshold_general_failures() {
        let cb = CircuitBreaker::new(config());
        for _ in 0..3 {
            cb.record_failure(FailureKind::General);
        }
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow_request());
    }

    #[test]
    fn half_open_admits_one_probe_then_closes_on_success_threshold() {
        let cb = CircuitBreaker::new(config());
        for _ in 0..3 {
            cb.record_failure(FailureKind::General);
        }
        std::thread::sleep(Duration::from_millis(25));
        assert!(cb.allow_request());
        assert!(!cb.allow_request(), "half-open only admits one in-flight probe");
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(cb.allow_request());
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens_the_circuit() {
        let cb = CircuitBreaker::new(config());
        for _ in 0..3 {
            cb.record_failure(FailureKind::General);
        }
        std::thread::sleep(Duration::from_millis(25));
        assert!(cb.allow_request());
        cb.record_failure(FailureKind::General);
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn rate_limit_dominated_failures_scale_down_token_rate_instead_of_tripping_as_fast() {
        let cb = CircuitBreaker::new(config());
        cb.record_failure(FailureKind::RateLimit);
        cb.record_failure(FailureKind::RateLimit);
        assert!((cb.suggested_token_rate_scale() - 0.5).abs() < 1e-9);
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
