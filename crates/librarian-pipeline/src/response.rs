//! The logical query response shape (spec §6). `trace_id` equals the ledger session ID
//! or [`librarian_core::ids::REPLAY_UNAVAILABLE_TRACE`] when no ledger was supplied.

use librarian_core::model::ContextPack;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub answer: String,
    pub confidence: f64,
    pub citations: Vec<String>,
    pub key_insights: Vec<String>,
    pub uncertainties: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adequacy {
    pub spec: String,
    pub blocking: bool,
    pub missing_evidence: Vec<String>,
    pub difficulties: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionPlan {
    pub template_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub trace_id: String,
    pub packs: Vec<ContextPack>,
    pub total_confidence: f64,
    pub synthesis: Option<SynthesisResult>,
    pub adequacy: Option<Adequacy>,
    pub disclosures: Vec<String>,
    pub stages: Vec<StageTiming>,
    pub latency_ms: u64,
    pub cache_hit: bool,
    pub construction_plan: Option<ConstructionPlan>,
    pub version: String,
}
