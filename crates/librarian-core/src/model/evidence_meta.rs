//! Workspace-scoped evidence graph counters and the derived health scalar.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceGraphMeta {
    pub workspace: String,
    pub claim_count: u64,
    pub active_defeater_count: u64,
    pub unresolved_contradiction_count: u64,
}

impl EvidenceGraphMeta {
    /// `health = max(0, 1 − min(1, activeDefeaters/max(10, 0.1·claimCount))·0.3
    ///                     − min(1, unresolvedContradictions/5)·0.3)`
    pub fn health(&self) -> f64 {
        let denom = (0.1 * self.claim_count as f64).max(10.0);
        let defeater_term = (self.active_defeater_count as f64 / denom).min(1.0) * 0.3;
        let contradiction_term = (self.unresolved_contradiction_count as f64 / 5.0).min(1.0) * 0.3;
        (1.0 - defeater_term - contradiction_term).max(0.0)
    }
}

impl EvidenceGraphMeta {
    pub fn new(workspace: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_empty_graph() {
        let meta = EvidenceGraphMeta::new("ws");
        assert_eq!(meta.health(), 1.0);
    }

    #[test]
    fn health_degrades_with_defeaters_and_contradictions() {
        let meta = EvidenceGraphMeta {
            workspace: "ws".into(),
            claim_count: 100,
            active_defeater_count: 10,
            unresolved_contradiction_count: 5,
        };
        // defeater_term = min(1, 10/10)*0.3 = 0.3; contradiction_term = min(1,5/5)*0.3 = 0.3
        assert!((meta.health() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn health_never_goes_negative() {
        let meta = EvidenceGraphMeta {
            workspace: "ws".into(),
            claim_count: 1,
            active_defeater_count: 1000,
            unresolved_contradiction_count: 1000,
        };
        assert_eq!(meta.health(), 0.0);
    }
}
