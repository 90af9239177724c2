//! Disclosure strings: non-fatal, machine-readable `unverified_by_trace(<code>): <detail>`
//! records surfaced on a response instead of raising an exception for expected
//! branching at a stage boundary (spec §9 "Async exception control flow").

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved disclosure codes named in spec §6, plus `VerificationObligationsRequired`
/// (spec §8 scenario 5 names it as the literal expected output for a `VerificationPlan`
/// missing its `work_objects` artifact, even though §6's reserved-code list omits it —
/// the scenario's literal sketch wins over the list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisclosureCode {
    ReplayUnavailable,
    ProviderUnavailable,
    CapabilityMissing,
    AdequacyUnavailable,
    StalenessDefeater,
    SynthesisUnstructured,
    ConflictObjectsRequired,
    OversizedInputTruncated,
    VerificationObligationsRequired,
}

impl DisclosureCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisclosureCode::ReplayUnavailable => "replay_unavailable",
            DisclosureCode::ProviderUnavailable => "provider_unavailable",
            DisclosureCode::CapabilityMissing => "capability_missing",
            DisclosureCode::AdequacyUnavailable => "adequacy_unavailable",
            DisclosureCode::StalenessDefeater => "staleness_defeater",
            DisclosureCode::SynthesisUnstructured => "synthesis_unstructured",
            DisclosureCode::ConflictObjectsRequired => "conflict_objects_required",
            DisclosureCode::OversizedInputTruncated => "oversized_input_truncated",
            DisclosureCode::VerificationObligationsRequired => "verification_obligations_required",
        }
    }
}

impl fmt::Display for DisclosureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single disclosure, always rendered as `unverified_by_trace(<code>): <detail>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disclosure {
    pub code: DisclosureCode,
    pub detail: String,
}

impl Disclosure {
    pub fn new(code: DisclosureCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }

    pub fn replay_unavailable() -> Self {
        Self::new(
            DisclosureCode::ReplayUnavailable,
            "Evidence ledger unavailable for this query.",
        )
    }
}

impl fmt::Display for Disclosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unverified_by_trace({}): {}", self.code, self.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_unavailable_formats_exactly_as_the_sentinel_string() {
        let d = Disclosure::replay_unavailable();
        assert_eq!(
            d.to_string(),
            "unverified_by_trace(replay_unavailable): Evidence ledger unavailable for this query."
        );
    }
}
