//! Capability contract enforcement (spec §4.6 step 4): a query names the capabilities
//! its construction template needs. A missing *required* capability is fatal to the
//! synthesis/verification stages that depend on it (disclosed via
//! `capability_missing`); a missing *optional* one only degrades the response.

use std::collections::HashSet;

use librarian_core::disclosure::{Disclosure, DisclosureCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    LlmChat,
    StorageSqlite,
    EmbeddingProvider,
    CrossEncoder,
    GitBoundary,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::LlmChat => "llm:chat",
            Capability::StorageSqlite => "storage:sqlite",
            Capability::EmbeddingProvider => "embedding:provider",
            Capability::CrossEncoder => "rerank:cross_encoder",
            Capability::GitBoundary => "git:boundary",
        }
    }
}

/// What a construction template needs, split into `required` (its absence blocks the
/// query) and `optional` (its absence only degrades the response).
#[derive(Debug, Clone, Default)]
pub struct CapabilityContract {
    pub required: Vec<Capability>,
    pub optional: Vec<Capability>,
}

/// The capabilities actually available for this query (storage is always available
/// since the pipeline cannot run without it; the rest depend on what was configured).
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    available: HashSet<Capability>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.available.insert(capability);
        self
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.available.contains(&capability)
    }
}

#[derive(Debug, Clone)]
pub struct CapabilityCheckResult {
    pub satisfied: bool,
    pub missing_required: Vec<Capability>,
    pub degraded: Vec<Capability>,
    pub disclosures: Vec<Disclosure>,
}

/// Enforce a contract against an available set. Missing required capabilities produce
/// `satisfied = false` plus a `capability_missing` disclosure per capability; missing
/// optional capabilities only degrade and are disclosed the same way but don't block.
pub fn enforce(contract: &CapabilityContract, available: &CapabilitySet) -> CapabilityCheckResult {
    let mut missing_required = Vec::new();
    let mut degraded = Vec::new();
    let mut disclosures = Vec::new();

    for capability in &contract.required {
        if !available.has(*capability) {
            missing_required.push(*capability);
            disclosures.push(Disclosure::new(
                DisclosureCode::CapabilityMissing,
                format!("required capability '{}' is unavailable", capability.as_str()),
            ));
        }
    }
    for capability in &contract.optional {
        if !available.has(*capability) {
            degraded.push(*capability);
            disclosures.push(Disclosure::new(
                DisclosureCode::CapabilityMissing,
                format!("optional capability '{}' is unavailable; response is degraded", capability.as_str()),
            ));
        }
    }

    CapabilityCheckResult {
        satisfied: missing_required.is_empty(),
        missing_required,
        degraded,
        disclosures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_capability_blocks() {
        let contract = CapabilityContract {
            required: vec![Capability::LlmChat],
            optional: vec![],
        };
        let available = CapabilitySet::new().with(Capability::StorageSqlite);
        let result = enforce(&contract, &available);
        assert!(!result.satisfied);
        assert_eq!(result.missing_required, vec![Capability::LlmChat]);
        assert_eq!(result.disclosures.len(), 1);
    }

    #[test]
    fn missing_optional_capability_only_degrades() {
        let contract = CapabilityContract {
            required: vec![],
            optional: vec![Capability::CrossEncoder],
        };
        let available = CapabilitySet::new();
        let result = enforce(&contract, &available);
        assert!(result.satisfied);
        assert_eq!(result.degraded, vec![Capability::CrossEncoder]);
    }

    #[test]
    fn fully_satisfied_contract_has_no_disclosures() {
        let contract = CapabilityContract {
            required: vec![Capability::StorageSqlite],
            optional: vec![],
        };
        let available = CapabilitySet::new().with(Capability::StorageSqlite);
        let result = enforce(&contract, &available);
        assert!(result.satisfied);
        assert!(result.disclosures.is_empty());
    }
}
