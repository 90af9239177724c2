//! The execution-local budget object that gates expensive operations (spec §4.6,
//! §5 "Cancellation"). Budgets live on the execution context, not as global state, so
//! two concurrent queries never share a ceiling.

use crate::config::GovernorBudgets;
use crate::error::GovernorError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Per-query budget tracker. Cloning shares the same counters (`Arc` inside), matching
/// how a single query's concurrent steps (embedding + keyword scoring) must observe
/// one consistent budget.
#[derive(Clone)]
pub struct Governor {
    inner: Arc<GovernorInner>,
}

struct GovernorInner {
    budgets: GovernorBudgets,
    started_at: Instant,
    tokens_used: Mutex<u64>,
    canceled: AtomicBool,
}

impl Governor {
    pub fn new(budgets: GovernorBudgets) -> Self {
        Self {
            inner: Arc::new(GovernorInner {
                budgets,
                started_at: Instant::now(),
                tokens_used: Mutex::new(0),
                canceled: AtomicBool::new(false),
            }),
        }
    }

    /// Signal cancellation; propagates to every subsequent `check_budget` call.
    pub fn cancel(&self) {
        self.inner.canceled.store(true, Ordering::SeqCst);
    }

    pub fn record_tokens(&self, tokens: u64) {
        let mut used = self.inner.tokens_used.lock();
        *used += tokens;
    }

    pub fn tokens_used(&self) -> u64 {
        *self.inner.tokens_used.lock()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.inner.started_at.elapsed().as_millis() as u64
    }

    /// Precedes every retrieval, embedding call, synthesis call, and storage batch
    /// (spec §4.6). Returns an error (never panics) on cancellation or a blown budget.
    pub fn check_budget(&self) -> Result<(), GovernorError> {
        if self.inner.canceled.load(Ordering::SeqCst) {
            return Err(GovernorError::Canceled);
        }
        let elapsed = self.elapsed_ms();
        if elapsed > self.inner.budgets.max_cpu_time_ms {
            return Err(GovernorError::BudgetExceeded {
                resource: "cpu_time_ms".to_string(),
                used: elapsed,
                limit: self.inner.budgets.max_cpu_time_ms,
            });
        }
        let tokens = self.tokens_used();
        if tokens > self.inner.budgets.max_tokens {
            return Err(GovernorError::BudgetExceeded {
                resource: "tokens".to_string(),
                used: tokens,
                limit: self.inner.budgets.max_tokens,
            });
        }
        Ok(())
    }

    pub fn max_embeddings_per_batch(&self) -> usize {
        self.inner.budgets.max_embeddings_per_batch
    }

    pub fn max_concurrent_batches(&self) -> usize {
        self.inner.budgets.max_concurrent_batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_trips_on_token_overage() {
        let governor = Governor::new(GovernorBudgets {
            max_tokens: 10,
            ..GovernorBudgets::default()
        });
        governor.record_tokens(11);
        assert!(governor.check_budget().is_err());
    }

    #[test]
    fn cancellation_trips_immediately() {
        let governor = Governor::new(GovernorBudgets::default());
        assert!(governor.check_budget().is_ok());
        governor.cancel();
        assert!(matches!(
            governor.check_budget(),
            Err(GovernorError::Canceled)
        ));
    }
}
