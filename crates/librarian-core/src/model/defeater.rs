//! Defeaters lower a claim's confidence. Severity sets a floor below which the
//! reduction cannot push the claim's overall confidence (spec §4.4).

use crate::ids::{ClaimId, DefeaterId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefeaterType {
    Staleness,
    Rebuttal,
    Undermining,
    Contradiction,
    Revision,
}

impl DefeaterType {
    /// Severity floor below which `confidence_reduction` cannot push overall
    /// confidence, keyed by type per spec §4.4.
    pub fn severity_floor(&self) -> f64 {
        match self {
            DefeaterType::Staleness => 0.3,
            DefeaterType::Rebuttal => 0.2,
            DefeaterType::Undermining | DefeaterType::Contradiction => 0.1,
            DefeaterType::Revision => 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefeaterSeverity {
    Minor,
    Significant,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefeaterStatus {
    Pending,
    Active,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defeater {
    pub id: DefeaterId,
    pub defeater_type: DefeaterType,
    pub severity: DefeaterSeverity,
    pub affected_claim_ids: Vec<ClaimId>,
    pub confidence_reduction: f64,
    pub status: DefeaterStatus,
    pub auto_resolvable: bool,
    pub resolution_action: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Defeater {
    pub fn new(
        id: DefeaterId,
        defeater_type: DefeaterType,
        severity: DefeaterSeverity,
        affected_claim_ids: Vec<ClaimId>,
        confidence_reduction: f64,
    ) -> Self {
        Self {
            id,
            defeater_type,
            severity,
            affected_claim_ids,
            confidence_reduction: confidence_reduction.clamp(0.0, 1.0),
            status: DefeaterStatus::Pending,
            auto_resolvable: false,
            resolution_action: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// Apply this defeater's effect to a claim's overall confidence. Only meaningful
    /// while `status == Active`; callers must not apply pending/resolved defeaters.
    pub fn apply_to(&self, overall_confidence: f64) -> f64 {
        if self.status != DefeaterStatus::Active {
            return overall_confidence;
        }
        let reduced = overall_confidence * (1.0 - self.confidence_reduction);
        let floor = self.defeater_type.severity_floor();
        reduced.max(floor).min(overall_confidence)
    }

    pub fn activate(&mut self) {
        self.status = DefeaterStatus::Active;
    }

    pub fn resolve(&mut self) {
        self.status = DefeaterStatus::Resolved;
        self.resolved_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(defeater_type: DefeaterType, reduction: f64) -> Defeater {
        let mut d = Defeater::new(
            DefeaterId::generate(),
            defeater_type,
            DefeaterSeverity::Significant,
            vec![ClaimId::generate()],
            reduction,
        );
        d.activate();
        d
    }

    #[test]
    fn active_defeater_never_increases_confidence() {
        let d = sample(DefeaterType::Staleness, 0.5);
        assert!(d.apply_to(0.9) <= 0.9);
    }

    #[test]
    fn pending_defeater_has_no_effect() {
        let d = Defeater::new(
            DefeaterId::generate(),
            DefeaterType::Rebuttal,
            DefeaterSeverity::Minor,
            vec![],
            0.9,
        );
        assert_eq!(d.apply_to(0.7), 0.7);
    }

    #[test]
    fn severity_floor_is_respected_even_with_extreme_reduction() {
        let d = sample(DefeaterType::Undermining, 1.0);
        assert!(d.apply_to(0.9) >= DefeaterType::Undermining.severity_floor());
    }

    #[test]
    fn deactivating_never_decreases_confidence_relative_to_baseline() {
        let mut d = sample(DefeaterType::Contradiction, 0.4);
        let reduced = d.apply_to(0.8);
        assert!(reduced < 0.8);
        d.resolve();
        // once resolved the defeater must no longer reduce confidence
        assert_eq!(d.apply_to(0.8), 0.8);
        let _ = reduced;
    }
}
