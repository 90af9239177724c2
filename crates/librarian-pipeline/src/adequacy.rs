//! Adequacy computation (spec §4.6 step 8): did the assembled objects and artifacts
//! satisfy the selected template's contract? Missing required object kinds or
//! artifacts make `adequacy.blocking = true` and attach a typed disclosure per gap —
//! the response is still returned, just marked as insufficient for the task.

use librarian_core::disclosure::{Disclosure, DisclosureCode};

use crate::response::Adequacy;
use crate::template::{ConstructionTemplate, ObjectKind};

/// What was actually assembled for this query, for comparison against the template's
/// required object kinds and artifacts.
#[derive(Debug, Clone, Default)]
pub struct AssembledObjects {
    pub object_kinds: Vec<ObjectKind>,
    pub artifacts: Vec<String>,
}

pub fn compute_adequacy(template: &ConstructionTemplate, assembled: &AssembledObjects) -> (Adequacy, Vec<Disclosure>) {
    let mut missing_evidence = Vec::new();
    let mut disclosures = Vec::new();

    for required in template.required_object_kinds {
        if !assembled.object_kinds.contains(required) {
            missing_evidence.push(required.as_str().to_string());
            disclosures.push(Disclosure::new(
                DisclosureCode::AdequacyUnavailable,
                format!("required object kind '{}' was not assembled", required.as_str()),
            ));
        }
    }
    for required in template.required_artifacts {
        if !assembled.artifacts.iter().any(|a| a == required) {
            missing_evidence.push((*required).to_string());
            let code = if *required == "work_objects" {
                DisclosureCode::VerificationObligationsRequired
            } else {
                DisclosureCode::AdequacyUnavailable
            };
            disclosures.push(Disclosure::new(
                code,
                format!("required artifact '{required}' was not produced"),
            ));
        }
    }

    let blocking = !missing_evidence.is_empty();
    (
        Adequacy {
            spec: template.id.as_str().to_string(),
            blocking,
            missing_evidence,
            difficulties: Vec::new(),
        },
        disclosures,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::template_by_id;
    use crate::template::TemplateId;

    #[test]
    fn verification_plan_without_work_objects_blocks() {
        let template = template_by_id(TemplateId::T4);
        let assembled = AssembledObjects {
            object_kinds: vec![ObjectKind::Pack, ObjectKind::Episode],
            artifacts: vec!["adequacy_report".to_string()],
        };
        let (adequacy, disclosures) = compute_adequacy(&template, &assembled);
        assert!(adequacy.blocking);
        assert!(adequacy.missing_evidence.contains(&"work_objects".to_string()));
        assert_eq!(disclosures.len(), 1);
        assert_eq!(disclosures[0].code, DisclosureCode::VerificationObligationsRequired);
    }

    #[test]
    fn fully_assembled_template_is_not_blocking() {
        let template = template_by_id(TemplateId::T1);
        let assembled = AssembledObjects {
            object_kinds: vec![ObjectKind::Map, ObjectKind::Pack],
            artifacts: vec![],
        };
        let (adequacy, disclosures) = compute_adequacy(&template, &assembled);
        assert!(!adequacy.blocking);
        assert!(disclosures.is_empty());
    }
}
