//! Composite rate limiter: burst and sustained tiers are token buckets, the hourly tier
//! is a sliding window (spec §4.7). A request must clear all three tiers.

use librarian_core::config::RateLimitConfig;

use crate::operation::Operation;
use crate::sliding_window::SlidingWindow;
use crate::token_bucket::TokenBucket;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitDenied {
    pub retry_after_secs: f64,
}

pub struct CompositeLimiter {
    burst: TokenBucket,
    sustained: TokenBucket,
    hourly: SlidingWindow,
}

impl CompositeLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            burst: TokenBucket::new(config.burst_capacity, config.burst_capacity as f64),
            sustained: TokenBucket::new(config.sustained_per_minute, config.sustained_per_minute as f64 / 60.0),
            hourly: SlidingWindow::new(config.hourly_capacity as usize, Duration::from_secs(3600)),
        }
    }

    /// Checks tiers in increasing time-horizon order (burst, sustained, hourly); the
    /// first tier to deny determines the reported retry-after. Tokens already taken
    /// from an earlier tier are not refunded on a later denial — a deliberate
    /// simplification documented in DESIGN.md.
    pub fn try_acquire(&self, operation: Operation) -> Result<(), RateLimitDenied> {
        let cost = operation.cost() as f64;
        if let Err(retry_after_secs) = self.burst.try_take(cost) {
            return Err(RateLimitDenied { retry_after_secs });
        }
        if let Err(retry_after_secs) = self.sustained.try_take(cost) {
            return Err(RateLimitDenied { retry_after_secs });
        }
        if let Err(retry_after_secs) = self.hourly.try_record() {
            return Err(RateLimitDenied { retry_after_secs });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_operations_consume_one_token_each() {
        let limiter = CompositeLimiter::new(RateLimitConfig {
            burst_capacity: 3,
            sustained_per_minute: 1000,
            hourly_capacity: 1000,
        });
        assert!(limiter.try_acquire(Operation::Query).is_ok());
        assert!(limiter.try_acquire(Operation::Query).is_ok());
        assert!(limiter.try_acquire(Operation::Query).is_ok());
        assert!(limiter.try_acquire(Operation::Query).is_err());
    }

    #[test]
    fn expensive_operations_consume_more_budget() {
        let limiter = CompositeLimiter::new(RateLimitConfig {
            burst_capacity: 10,
            sustained_per_minute: 1000,
            hourly_capacity: 1000,
        });
        assert!(limiter.try_acquire(Operation::Bootstrap).is_ok());
        // 10 - 10 = 0 left, next query of cost 1 must be denied
        assert!(limiter.try_acquire(Operation::Query).is_err());
    }

    #[test]
    fn denial_carries_a_positive_retry_after() {
        let limiter = CompositeLimiter::new(RateLimitConfig {
            burst_capacity: 1,
            sustained_per_minute: 1000,
            hourly_capacity: 1000,
        });
        limiter.try_acquire(Operation::Query).unwrap();
        let denied = limiter.try_acquire(Operation::Query).unwrap_err();
        assert!(denied.retry_after_secs > 0.0);
    }
}
