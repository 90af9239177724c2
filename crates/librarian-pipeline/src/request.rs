//! The logical query request shape (spec §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Depth {
    L0,
    L1,
    L2,
    L3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LlmRequirement {
    Required,
    Optional,
    Disabled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UcRequirements {
    pub uc_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub intent: String,
    pub depth: Depth,
    pub task_type: Option<String>,
    pub llm_requirement: LlmRequirement,
    pub affected_files: Vec<String>,
    pub uc_requirements: Option<UcRequirements>,
    pub min_confidence: Option<f64>,
}

impl QueryRequest {
    pub fn new(intent: impl Into<String>, depth: Depth) -> Self {
        Self {
            intent: intent.into(),
            depth,
            task_type: None,
            llm_requirement: LlmRequirement::Optional,
            affected_files: Vec::new(),
            uc_requirements: None,
            min_confidence: None,
        }
    }
}
