//! Contradiction detection and resolution. No automated path may collapse a
//! contradiction; [`resolve`] is the only function that changes its status, and it
//! always requires an explicit method, explanation, and resolver (spec §4.4).

use librarian_core::ids::ContradictionId;
use librarian_core::model::{Claim, Contradiction, ContradictionSeverity};

/// Two claims are flagged as mutually exclusive when they describe the same subject
/// and claim type but assert different propositions — a coarse heuristic; real
/// detection would also weigh semantic similarity, left as an open question (see
/// DESIGN.md).
pub fn mutually_exclusive(a: &Claim, b: &Claim) -> bool {
    a.subject.subject_type == b.subject.subject_type
        && a.subject.id == b.subject.id
        && a.claim_type == b.claim_type
        && a.proposition != b.proposition
}

pub fn detect(a: &Claim, b: &Claim) -> Option<Contradiction> {
    if !mutually_exclusive(a, b) {
        return None;
    }
    Some(Contradiction::new(
        ContradictionId::generate(),
        a.id.clone(),
        b.id.clone(),
        "mutually_exclusive_proposition",
        format!("\"{}\" conflicts with \"{}\"", a.proposition, b.proposition),
        ContradictionSeverity::Significant,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use librarian_core::ids::ClaimId;
    use librarian_core::model::{
        AggregationMethod, ClaimSource, ClaimSourceType, ClaimStatus, ClaimSubject, ClaimSubjectType,
        ConfidenceComponents,
    };

    fn claim(id: &str, proposition: &str) -> Claim {
        Claim {
            id: ClaimId::new(id),
            proposition: proposition.to_string(),
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
            confidence: ConfidenceComponents::new(0.8, 0.8, 0.8, 0.8, 0.8, AggregationMethod::GeometricMean),
            schema_version: 1,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn conflicting_propositions_on_the_same_subject_are_detected() {
        let a = claim("a", "widget() is pure");
        let b = claim("b", "widget() has side effects");
        let contradiction = detect(&a, &b).expect("should detect a contradiction");
        assert_eq!(contradiction.claim_a, a.id);
        assert_eq!(contradiction.claim_b, b.id);
    }

    #[test]
    fn identical_propositions_are_not_contradictions() {
        let a = claim("a", "widget() is pure");
        let b = claim("b", "widget() is pure");
        assert!(detect(&a, &b).is_none());
    }

    #[test]
    fn different_subjects_are_not_compared() {
        let mut a = claim("a", "widget() is pure");
        let b = claim("b", "gadget() is pure");
        a.subject.id = "fn-1".to_string();
        assert!(detect(&a, &b).is_none());
    }
}
