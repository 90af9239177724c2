//! A single token bucket: capacity, continuous refill, and a `try_take` that reports
//! the seconds to wait before retrying on denial.

use parking_lot::Mutex;
use std::time::Instant;

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            capacity: capacity as f64,
            refill_per_sec,
            state: Mutex::new(BucketState {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let elapsed = state.last_refill.elapsed().as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last_refill = Instant::now();
    }

    /// Attempt to take `cost` tokens. On denial, returns the seconds until enough
    /// tokens will have accumulated.
    pub fn try_take(&self, cost: f64) -> Result<(), f64> {
        let mut state = self.state.lock();
        self.refill(&mut state);
        if state.tokens >= cost {
            state.tokens -= cost;
            Ok(())
        } else {
            let deficit = cost - state.tokens;
            Err((deficit / self.refill_per_sec).max(0.0))
        }
    }

    /// Shrink the refill rate (used by the circuit breaker's adaptive thresholds when
    /// recent failures are dominated by rate-limit denials, spec §4.7).
    pub fn scale_refill_rate(&self, factor: f64) -> TokenBucket {
        TokenBucket::new(self.capacity as u32, self.refill_per_sec * factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_succeed_until_capacity_exhausted() {
        let bucket = TokenBucket::new(5, 0.0);
        for _ in 0..5 {
            assert!(bucket.try_take(1.0).is_ok());
        }
        assert!(bucket.try_take(1.0).is_err());
    }

    #[test]
    fn denial_reports_a_positive_retry_after() {
        let bucket = TokenBucket::new(1, 1.0);
        bucket.try_take(1.0).unwrap();
        let retry_after = bucket.try_take(1.0).unwrap_err();
        assert!(retry_after > 0.0);
    }
}
