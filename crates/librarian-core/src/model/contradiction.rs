//! Contradictions are never deleted by automated paths; resolution is an explicit,
//! privileged write that keeps the row (spec §4.4, §8 "no silent contradiction collapse").

use crate::ids::{ClaimId, ContradictionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContradictionSeverity {
    Minor,
    Significant,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContradictionStatus {
    Unresolved,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContradictionResolution {
    pub method: String,
    pub explanation: String,
    pub resolver_id: String,
    pub tradeoff: Option<String>,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contradiction {
    pub id: ContradictionId,
    pub claim_a: ClaimId,
    pub claim_b: ClaimId,
    pub contradiction_type: String,
    pub explanation: String,
    pub severity: ContradictionSeverity,
    pub status: ContradictionStatus,
    pub resolution: Option<ContradictionResolution>,
    pub created_at: DateTime<Utc>,
}

impl Contradiction {
    pub fn new(
        id: ContradictionId,
        claim_a: ClaimId,
        claim_b: ClaimId,
        contradiction_type: impl Into<String>,
        explanation: impl Into<String>,
        severity: ContradictionSeverity,
    ) -> Self {
        Self {
            id,
            claim_a,
            claim_b,
            contradiction_type: contradiction_type.into(),
            explanation: explanation.into(),
            severity,
            status: ContradictionStatus::Unresolved,
            resolution: None,
            created_at: Utc::now(),
        }
    }

    /// Resolve with an explicit method/explanation/resolver; this is the *only* path
    /// that may change `status`, and it never deletes the row.
    pub fn resolve(
        &mut self,
        method: impl Into<String>,
        explanation: impl Into<String>,
        resolver_id: impl Into<String>,
        tradeoff: Option<String>,
    ) {
        self.status = ContradictionStatus::Resolved;
        self.resolution = Some(ContradictionResolution {
            method: method.into(),
            explanation: explanation.into(),
            resolver_id: resolver_id.into(),
            tradeoff,
            resolved_at: Utc::now(),
        });
    }
}
