//! Confidence recomputation: folding active defeaters over a claim's base confidence
//! (spec §4.4 "Defeater application"). Recomputation is a pure function so both the
//! pipeline (on pack access) and an explicit recalibration job can call it identically.

use librarian_core::model::{Claim, Defeater, DefeaterStatus};

/// Apply every active defeater targeting `claim` to its base `overall()` confidence, in
/// the order given. Each defeater's severity floor bounds how far it alone can push the
/// result down; defeaters never raise confidence.
pub fn recompute_confidence(claim: &Claim, defeaters: &[Defeater]) -> f64 {
    let base = claim.overall_confidence();
    defeaters
        .iter()
        .filter(|d| d.status == DefeaterStatus::Active && d.affected_claim_ids.contains(&claim.id))
        .fold(base, |acc, defeater| defeater.apply_to(acc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use librarian_core::ids::{ClaimId, DefeaterId};
    use librarian_core::model::{
        AggregationMethod, ClaimSource, ClaimSourceType, ClaimStatus, ClaimSubject, ClaimSubjectType,
        ConfidenceComponents, DefeaterSeverity, DefeaterType,
    };

    fn claim() -> Claim {
        Claim {
            id: ClaimId::new("claim-1"),
            proposition: "widget() is pure".to_string(),
            claim_type: "purity".to_string(),
            subject: ClaimSubject {
                subject_type: ClaimSubjectType::Function,
                id: "fn-1".to_string(),
                name: "widget".to_string(),
                location: None,
            },
            source: ClaimSource {
                source_type: ClaimSourceType::Retrieval,
                id: "src-1".to_string(),
                version: None,
                trace_id: None,
            },
            status: ClaimStatus::Active,
            confidence: ConfidenceComponents::new(0.9, 0.9, 0.9, 0.9, 0.9, AggregationMethod::GeometricMean),
            schema_version: 1,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn unaffected_defeaters_do_not_apply() {
        let c = claim();
        let mut d = Defeater::new(DefeaterId::generate(), DefeaterType::Staleness, DefeaterSeverity::Minor, vec![ClaimId::new("other")], 0.5);
        d.activate();
        assert_eq!(recompute_confidence(&c, &[d]), c.overall_confidence());
    }

    #[test]
    fn pending_defeater_does_not_apply() {
        let c = claim();
        let d = Defeater::new(DefeaterId::generate(), DefeaterType::Staleness, DefeaterSeverity::Minor, vec![c.id.clone()], 0.5);
        assert_eq!(recompute_confidence(&c, &[d]), c.overall_confidence());
    }

    #[test]
    fn active_matching_defeater_reduces_confidence() {
        let c = claim();
        let mut d = Defeater::new(DefeaterId::generate(), DefeaterType::Rebuttal, DefeaterSeverity::Significant, vec![c.id.clone()], 0.5);
        d.activate();
        let reduced = recompute_confidence(&c, &[d]);
        assert!(reduced < c.overall_confidence());
        assert!(reduced >= DefeaterType::Rebuttal.severity_floor());
    }

    #[test]
    fn multiple_defeaters_fold_in_order() {
        let c = claim();
        let mut d1 = Defeater::new(DefeaterId::generate(), DefeaterType::Staleness, DefeaterSeverity::Minor, vec![c.id.clone()], 0.2);
        d1.activate();
        let mut d2 = Defeater::new(DefeaterId::generate(), DefeaterType::Undermining, DefeaterSeverity::Critical, vec![c.id.clone()], 0.2);
        d2.activate();
        let reduced = recompute_confidence(&c, &[d1, d2]);
        assert!(reduced <= c.overall_confidence());
    }
}
