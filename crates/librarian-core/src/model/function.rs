//! Function and Module entities: stable-ID-keyed summaries with outcome history used
//! by the feedback loop (spec §4.6) to adjust confidence over time.

use crate::ids::{FunctionId, ModuleId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounters {
    pub successes: u64,
    pub failures: u64,
}

impl OutcomeCounters {
    pub fn record(&mut self, success: bool) {
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
    }

    pub fn total(&self) -> u64 {
        self.successes + self.failures
    }

    pub fn success_rate(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            None
        } else {
            Some(self.successes as f64 / total as f64)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub id: FunctionId,
    pub signature: String,
    pub purpose: String,
    pub confidence: f64,
    pub access_count: u64,
    pub outcomes: OutcomeCounters,
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub name: String,
    pub purpose: String,
    pub confidence: f64,
    pub access_count: u64,
    pub outcomes: OutcomeCounters,
    pub file_path: String,
}
