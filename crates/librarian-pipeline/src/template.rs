//! Construction templates T1..T12 (spec §4.6 step 3, glossary "Construction template"):
//! the shape of required objects/artifacts for a class of intents. Selection either
//! maps a known `taskType` to its template or defaults to `T1` with a disclosure.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateId {
    T1,
    T2,
    T3,
    T4,
    T5,
    T6,
    T7,
    T8,
    T9,
    T10,
    T11,
    T12,
}

impl TemplateId {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::T1 => "T1",
            TemplateId::T2 => "T2",
            TemplateId::T3 => "T3",
            TemplateId::T4 => "T4",
            TemplateId::T5 => "T5",
            TemplateId::T6 => "T6",
            TemplateId::T7 => "T7",
            TemplateId::T8 => "T8",
            TemplateId::T9 => "T9",
            TemplateId::T10 => "T10",
            TemplateId::T11 => "T11",
            TemplateId::T12 => "T12",
        }
    }
}

/// The object kinds adequacy checks for (spec §4.6 step 8: "repo_fact, map, pack,
/// episode, claim").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    RepoFact,
    Map,
    Pack,
    Episode,
    Claim,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::RepoFact => "repo_fact",
            ObjectKind::Map => "map",
            ObjectKind::Pack => "pack",
            ObjectKind::Episode => "episode",
            ObjectKind::Claim => "claim",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConstructionTemplate {
    pub id: TemplateId,
    pub name: &'static str,
    pub required_object_kinds: &'static [ObjectKind],
    pub required_artifacts: &'static [&'static str],
}

const T1: ConstructionTemplate = ConstructionTemplate {
    id: TemplateId::T1,
    name: "RepoMap",
    required_object_kinds: &[ObjectKind::Map, ObjectKind::Pack],
    required_artifacts: &[],
};
const T2: ConstructionTemplate = ConstructionTemplate {
    id: TemplateId::T2,
    name: "EditContext",
    required_object_kinds: &[ObjectKind::Pack, ObjectKind::Claim],
    required_artifacts: &[],
};
const T3: ConstructionTemplate = ConstructionTemplate {
    id: TemplateId::T3,
    name: "ImpactAnalysis",
    required_object_kinds: &[ObjectKind::RepoFact, ObjectKind::Pack],
    required_artifacts: &["change_impact"],
};
const T4: ConstructionTemplate = ConstructionTemplate {
    id: TemplateId::T4,
    name: "VerificationPlan",
    required_object_kinds: &[ObjectKind::Pack, ObjectKind::Episode],
    required_artifacts: &["work_objects", "adequacy_report"],
};
const T5: ConstructionTemplate = ConstructionTemplate {
    id: TemplateId::T5,
    name: "BugInvestigation",
    required_object_kinds: &[ObjectKind::Pack, ObjectKind::Claim],
    required_artifacts: &["reproduction_steps"],
};
const T6: ConstructionTemplate = ConstructionTemplate {
    id: TemplateId::T6,
    name: "ArchitectureOverview",
    required_object_kinds: &[ObjectKind::Map, ObjectKind::RepoFact],
    required_artifacts: &[],
};
const T7: ConstructionTemplate = ConstructionTemplate {
    id: TemplateId::T7,
    name: "PatternSurvey",
    required_object_kinds: &[ObjectKind::Pack],
    required_artifacts: &[],
};
const T8: ConstructionTemplate = ConstructionTemplate {
    id: TemplateId::T8,
    name: "DependencyAudit",
    required_object_kinds: &[ObjectKind::Map, ObjectKind::Pack],
    required_artifacts: &["dependency_report"],
};
const T9: ConstructionTemplate = ConstructionTemplate {
    id: TemplateId::T9,
    name: "DecisionRationale",
    required_object_kinds: &[ObjectKind::Claim, ObjectKind::Pack],
    required_artifacts: &[],
};
const T10: ConstructionTemplate = ConstructionTemplate {
    id: TemplateId::T10,
    name: "TestCoverageReport",
    required_object_kinds: &[ObjectKind::RepoFact, ObjectKind::Pack],
    required_artifacts: &["coverage_report"],
};
const T11: ConstructionTemplate = ConstructionTemplate {
    id: TemplateId::T11,
    name: "OnboardingGuide",
    required_object_kinds: &[ObjectKind::Map, ObjectKind::Pack],
    required_artifacts: &[],
};
const T12: ConstructionTemplate = ConstructionTemplate {
    id: TemplateId::T12,
    name: "QuickAnswer",
    required_object_kinds: &[ObjectKind::Pack],
    required_artifacts: &[],
};

const ALL: [ConstructionTemplate; 12] = [T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12];

pub fn template_by_id(id: TemplateId) -> ConstructionTemplate {
    ALL[id as usize]
}

/// Map a known `taskType` string to its template, case-insensitively by template name
/// or ID. Returns `(template, used_default)`; `used_default` tells the caller to append
/// a disclosure per spec §4.6 step 3 ("defaulted to T1 with a disclosure").
pub fn select_template(task_type: Option<&str>) -> (ConstructionTemplate, bool) {
    let Some(task_type) = task_type else {
        return (T1, true);
    };
    let needle = task_type.trim().to_lowercase();
    for template in ALL {
        if template.id.as_str().eq_ignore_ascii_case(&needle) || template.name.eq_ignore_ascii_case(&needle) {
            return (template, false);
        }
    }
    (T1, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_task_type_resolves_without_a_default_flag() {
        let (template, used_default) = select_template(Some("VerificationPlan"));
        assert_eq!(template.id, TemplateId::T4);
        assert!(!used_default);
    }

    #[test]
    fn unknown_task_type_defaults_to_t1_with_a_disclosure_flag() {
        let (template, used_default) = select_template(Some("no-such-template"));
        assert_eq!(template.id, TemplateId::T1);
        assert!(used_default);
    }

    #[test]
    fn absent_task_type_defaults_to_t1() {
        let (template, used_default) = select_template(None);
        assert_eq!(template.id, TemplateId::T1);
        assert!(used_default);
    }
}
