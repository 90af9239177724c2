//! Request/result shapes for the `embed()` contract (spec §4.2).

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct EmbeddingRequest {
    pub text: String,
}

impl EmbeddingRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResult {
    pub vector: Vec<f64>,
    pub model_id: String,
    pub provider: String,
    pub generated_at: DateTime<Utc>,
    pub token_count: u32,
}
