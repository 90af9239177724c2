//! Knowledge graph edges. `EdgeType` is split into `Structural` and `Argument` subsets
//! per the data model: argument edges carry extra epistemic semantics and conflict
//! edges (`Contradicts`) are never averaged away into a structural weight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructuralEdgeType {
    Imports,
    Calls,
    Extends,
    Implements,
    DependsOn,
    Tests,
    Documents,
    PartOf,
    CoChanged,
    SimilarTo,
    CloneOf,
    DebtRelated,
    AuthoredBy,
    ReviewedBy,
    EvolvedFrom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgumentEdgeType {
    Supports,
    Warrants,
    Contradicts,
    Undermines,
    Rebuts,
    Supersedes,
    DependsOnDecision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "family")]
pub enum EdgeType {
    Structural(StructuralEdgeType),
    Argument(ArgumentEdgeType),
}

impl EdgeType {
    /// Conflict edges must never be silently folded into a structural weight average.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            EdgeType::Argument(ArgumentEdgeType::Contradicts)
                | EdgeType::Argument(ArgumentEdgeType::Rebuts)
                | EdgeType::Argument(ArgumentEdgeType::Undermines)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEdge {
    pub source_id: String,
    pub target_id: String,
    pub edge_type: EdgeType,
    pub weight: f64,
    pub confidence: f64,
    pub computed_at: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, String>,
}

impl KnowledgeEdge {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, edge_type: EdgeType) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            edge_type,
            weight: 1.0,
            confidence: 1.0,
            computed_at: Utc::now(),
            valid_until: None,
            metadata: HashMap::new(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.map(|v| now > v).unwrap_or(false)
    }
}
