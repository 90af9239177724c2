//! Per-file staleness tracking and SLA categorization (spec §4.8). Owns the
//! last-indexed map and the open-file set; the watcher and walker update it on every
//! successful reindex, the pipeline reads it when annotating packs with freshness
//! confidence.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use librarian_core::config::StalenessConfig;
use librarian_core::model::File;
use parking_lot::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalenessCategory {
    Fresh,
    Stale,
    Critical,
}

/// `fresh ⟺ age ≤ sla`; `stale ⟺ sla < age < 2·sla`; `critical ⟺ age ≥ 2·sla` (spec §8).
pub fn categorize(age_ms: i64, sla_ms: u64) -> StalenessCategory {
    let sla = sla_ms as i64;
    if age_ms <= sla {
        StalenessCategory::Fresh
    } else if age_ms < 2 * sla {
        StalenessCategory::Stale
    } else {
        StalenessCategory::Critical
    }
}

/// Linear freshness-confidence curve: 1.0 within the SLA, falling to 0.0 at `5·SLA`.
/// `excess_ratio` is `(age - sla) / (2·sla)`, which reaches `2` exactly at `age = 5·sla`
/// so `0.5 + 0.5·(1 − excess_ratio)` lands on `0.0` there (spec §4.8).
pub fn freshness_confidence_for_age(age_ms: i64, sla_ms: u64) -> f64 {
    let sla = sla_ms as f64;
    if sla <= 0.0 {
        return 0.5;
    }
    let age = age_ms.max(0) as f64;
    if age <= sla {
        return 1.0;
    }
    let excess_ratio = (age - sla) / (2.0 * sla);
    (0.5 + 0.5 * (1.0 - excess_ratio)).clamp(0.0, 1.0)
}

pub struct StalenessTracker {
    config: StalenessConfig,
    last_indexed: RwLock<HashMap<String, DateTime<Utc>>>,
    open_files: RwLock<HashSet<String>>,
}

impl StalenessTracker {
    pub fn new(config: StalenessConfig) -> Self {
        Self {
            config,
            last_indexed: RwLock::new(HashMap::new()),
            open_files: RwLock::new(HashSet::new()),
        }
    }

    pub fn mark_indexed(&self, path: &str, at: DateTime<Utc>) {
        self.last_indexed.write().insert(path.to_string(), at);
    }

    pub fn mark_open(&self, path: &str) {
        self.open_files.write().insert(path.to_string());
    }

    pub fn mark_closed(&self, path: &str) {
        self.open_files.write().remove(path);
    }

    pub fn sla_for_path(&self, path: &str) -> u64 {
        if self.open_files.read().contains(path) {
            self.config.open_file_sla_ms
        } else if File::matches_dependency_path(path) {
            self.config.dependency_sla_ms
        } else {
            self.config.project_file_sla_ms
        }
    }

    pub fn category_for_path(&self, path: &str, now: DateTime<Utc>) -> Option<StalenessCategory> {
        let indexed_at = *self.last_indexed.read().get(path)?;
        let age_ms = (now - indexed_at).num_milliseconds().max(0);
        Some(categorize(age_ms, self.sla_for_path(path)))
    }

    /// Mean freshness confidence over `paths`, per spec §4.8: unindexed paths
    /// contribute 0.5 rather than being dropped from the average.
    pub fn freshness_confidence(&self, paths: &[String], now: DateTime<Utc>) -> f64 {
        if paths.is_empty() {
            return 1.0;
        }
        let indexed = self.last_indexed.read();
        let total: f64 = paths
            .iter()
            .map(|path| match indexed.get(path) {
                Some(indexed_at) => {
                    let age_ms = (now - *indexed_at).num_milliseconds().max(0);
                    freshness_confidence_for_age(age_ms, self.sla_for_path(path))
                }
                None => 0.5,
            })
            .sum();
        total / paths.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn categorize_matches_named_boundaries() {
        assert_eq!(categorize(500, 1000), StalenessCategory::Fresh);
        assert_eq!(categorize(1000, 1000), StalenessCategory::Fresh);
        assert_eq!(categorize(1500, 1000), StalenessCategory::Stale);
        assert_eq!(categorize(1999, 1000), StalenessCategory::Stale);
        assert_eq!(categorize(2000, 1000), StalenessCategory::Critical);
        assert_eq!(categorize(5000, 1000), StalenessCategory::Critical);
    }

    #[test]
    fn freshness_confidence_is_full_within_sla_and_zero_at_five_x() {
        assert_eq!(freshness_confidence_for_age(500, 1000), 1.0);
        assert!((freshness_confidence_for_age(5000, 1000) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn freshness_confidence_degrades_monotonically_past_the_sla() {
        let at_sla = freshness_confidence_for_age(1000, 1000);
        let past = freshness_confidence_for_age(3000, 1000);
        let further = freshness_confidence_for_age(4500, 1000);
        assert!(at_sla > past);
        assert!(past > further);
    }

    #[test]
    fn unknown_paths_contribute_the_midpoint() {
        let tracker = StalenessTracker::new(StalenessConfig::default());
        let conf = tracker.freshness_confidence(&["unknown/path.rs".to_string()], Utc::now());
        assert!((conf - 0.5).abs() < 1e-9);
    }

    #[test]
    fn open_files_use_the_short_sla() {
        let tracker = StalenessTracker::new(StalenessConfig::default());
        tracker.mark_open("src/active.rs");
        assert_eq!(tracker.sla_for_path("src/active.rs"), 1_000);
        assert_eq!(tracker.sla_for_path("src/other.rs"), 300_000);
    }

    #[test]
    fn dependency_paths_use_the_long_sla() {
        let tracker = StalenessTracker::new(StalenessConfig::default());
        assert_eq!(tracker.sla_for_path("vendor/pkg/mod.rs"), 3_600_000);
    }

    #[test]
    fn freshness_confidence_is_mean_over_the_path_set() {
        let tracker = StalenessTracker::new(StalenessConfig::default());
        let now = Utc::now();
        tracker.mark_indexed("src/fresh.rs", now);
        tracker.mark_indexed("src/old.rs", now - Duration::milliseconds(2_000_000));
        let conf = tracker.freshness_confidence(
            &["src/fresh.rs".to_string(), "src/old.rs".to_string()],
            now,
        );
        assert!(conf < 1.0 && conf > 0.0);
    }
}
