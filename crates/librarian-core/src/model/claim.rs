//! Claims and their decomposed confidence. Aggregation is a pure function over five
//! named components so both the evidence graph and the pipeline can recompute it.

use crate::ids::ClaimId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregationMethod {
    GeometricMean,
    Minimum,
    WeightedMean,
}

impl Default for AggregationMethod {
    fn default() -> Self {
        AggregationMethod::GeometricMean
    }
}

/// The five confidence components plus the chosen aggregation method. `overall` is
/// always derived, never set directly, so it can't drift from its components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceComponents {
    pub retrieval: f64,
    pub structural: f64,
    pub semantic: f64,
    pub test_execution: f64,
    pub recency: f64,
    pub aggregation_method: AggregationMethod,
}

/// Component values clipped into (0, 1]; zero components are forbidden and replaced by
/// this floor before aggregation (spec §4.4).
pub const MIN_COMPONENT: f64 = 0.01;
pub const MAX_COMPONENT: f64 = 1.0;

impl ConfidenceComponents {
    pub fn new(
        retrieval: f64,
        structural: f64,
        semantic: f64,
        test_execution: f64,
        recency: f64,
        aggregation_method: AggregationMethod,
    ) -> Self {
        Self {
            retrieval: clip(retrieval),
            structural: clip(structural),
            semantic: clip(semantic),
            test_execution: clip(test_execution),
            recency: clip(recency),
            aggregation_method,
        }
    }

    fn components(&self) -> [f64; 5] {
        [
            self.retrieval,
            self.structural,
            self.semantic,
            self.test_execution,
            self.recency,
        ]
    }

    /// The selected aggregation of the five components, clipped to `[0.01, 1.0]`.
    pub fn overall(&self) -> f64 {
        let values = self.components();
        let aggregated = match self.aggregation_method {
            AggregationMethod::GeometricMean => {
                let product: f64 = values.iter().product();
                product.powf(1.0 / values.len() as f64)
            }
            AggregationMethod::Minimum => values.iter().cloned().fold(f64::INFINITY, f64::min),
            AggregationMethod::WeightedMean => {
                // Retrieval and semantic carry more weight than structural/test/recency,
                // reflecting that the source signal dominates confidence day to day.
                const WEIGHTS: [f64; 5] = [0.3, 0.15, 0.3, 0.15, 0.1];
                values
                    .iter()
                    .zip(WEIGHTS.iter())
                    .map(|(v, w)| v * w)
                    .sum()
            }
        };
        clip(aggregated)
    }
}

fn clip(value: f64) -> f64 {
    if value <= 0.0 {
        MIN_COMPONENT
    } else {
        value.clamp(MIN_COMPONENT, MAX_COMPONENT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimStatus {
    Active,
    Stale,
    Retracted,
    Disputed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimSubjectType {
    File,
    Function,
    Module,
    Decision,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSubject {
    pub subject_type: ClaimSubjectType,
    pub id: String,
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimSourceType {
    Retrieval,
    Synthesis,
    Indexer,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSource {
    pub source_type: ClaimSourceType,
    pub id: String,
    pub version: Option<String>,
    pub trace_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub proposition: String,
    pub claim_type: String,
    pub subject: ClaimSubject,
    pub source: ClaimSource,
    pub status: ClaimStatus,
    pub confidence: ConfidenceComponents,
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
}

impl Claim {
    pub fn overall_confidence(&self) -> f64 {
        self.confidence.overall()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometric_mean_of_equal_components_equals_the_component() {
        let c = ConfidenceComponents::new(0.8, 0.8, 0.8, 0.8, 0.8, AggregationMethod::GeometricMean);
        assert!((c.overall() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn zero_components_are_floored_not_forbidden_at_construction() {
        let c = ConfidenceComponents::new(0.0, 0.5, 0.5, 0.5, 0.5, AggregationMethod::Minimum);
        assert_eq!(c.retrieval, MIN_COMPONENT);
        assert!(c.overall() >= MIN_COMPONENT);
    }

    #[test]
    fn minimum_aggregation_picks_the_smallest_component() {
        let c = ConfidenceComponents::new(0.9, 0.2, 0.95, 0.99, 0.99, AggregationMethod::Minimum);
        assert!((c.overall() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn overall_is_always_in_bounds() {
        let c = ConfidenceComponents::new(1.5, -1.0, 0.5, 0.5, 0.5, AggregationMethod::WeightedMean);
        let overall = c.overall();
        assert!(overall >= MIN_COMPONENT && overall <= MAX_COMPONENT);
    }
}
