//! The outcome feedback loop (spec §4.6): after a query's packs were used, the caller
//! reports whether the task succeeded, which files were touched, and a usefulness
//! score in `[0,1]` per cited pack. Each pack's confidence is nudged multiplicatively
//! toward the reported usefulness and its outcome counters updated; a pack repeatedly
//! marked unuseful gets a [`Rebuttal`](DefeaterType::Rebuttal) defeater instead of
//! being silently left to rot — the same "reduce, never delete" discipline the
//! evidence graph applies to claims.

use librarian_core::error::StorageError;
use librarian_core::ids::DefeaterId;
use librarian_core::model::defeater::{Defeater, DefeaterSeverity, DefeaterType};
use librarian_storage::Storage;

/// Below this usefulness a pack counts as "unuseful" for the repeated-failure defeater.
const UNUSEFUL_THRESHOLD: f64 = 0.3;
/// How many consecutive unuseful reports (tracked via `outcomes.failures`) trigger a
/// defeater, mirroring `QUARANTINE_THRESHOLD` in `librarian_indexer::quarantine`.
const REPEATED_UNUSEFUL_THRESHOLD: u64 = 5;
/// How strongly a single report moves confidence toward the reported usefulness.
const ADJUSTMENT_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct OutcomeReport {
    pub success: bool,
    pub files_modified: Vec<String>,
    pub cited_pack_ids: Vec<String>,
    pub usefulness: f64,
}

/// Multiplicatively blend `confidence` toward `usefulness`: `confidence * (1 +
/// weight * (usefulness - confidence))`, clamped to `(0, 1]`. A usefulness equal to the
/// current confidence leaves it unchanged; above nudges it up, below nudges it down —
/// never a full overwrite, so one bad report can't erase a pack's history.
fn adjust_confidence(confidence: f64, usefulness: f64, weight: f64) -> f64 {
    let delta = weight * (usefulness - confidence);
    (confidence + delta).clamp(0.01, 1.0)
}

pub async fn report_outcome(storage: &dyn Storage, report: &OutcomeReport) -> Result<Vec<Defeater>, StorageError> {
    let usefulness = report.usefulness.clamp(0.0, 1.0);
    let mut emitted = Vec::new();

    for pack_id in &report.cited_pack_ids {
        let Some(mut pack) = storage.get_pack(pack_id).await? else {
            continue;
        };
        pack.confidence = adjust_confidence(pack.confidence, usefulness, ADJUSTMENT_WEIGHT);
        pack.outcomes.record(usefulness >= UNUSEFUL_THRESHOLD);
        storage.upsert_pack(pack.clone()).await?;

        if pack.outcomes.failures >= REPEATED_UNUSEFUL_THRESHOLD {
            let defeater = Defeater::new(
                DefeaterId::generate(),
                DefeaterType::Rebuttal,
                DefeaterSeverity::Significant,
                Vec::new(),
                1.0 - DefeaterType::Rebuttal.severity_floor(),
            );
            let mut defeater = defeater;
            defeater.resolution_action = Some(format!(
                "pack {pack_id} marked unuseful in {} of its last {} reported outcomes",
                pack.outcomes.failures,
                pack.outcomes.total()
            ));
            emitted.push(defeater);
        }
    }

    Ok(emitted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_moves_toward_reported_usefulness_without_overwriting() {
        let adjusted = adjust_confidence(0.5, 1.0, 0.2);
        assert!(adjusted > 0.5 && adjusted < 1.0);
    }

    #[test]
    fn confidence_never_leaves_the_unit_interval() {
        assert!(adjust_confidence(0.99, 1.0, 0.9) <= 1.0);
        assert!(adjust_confidence(0.02, 0.0, 0.9) >= 0.01);
    }

    #[tokio::test]
    async fn repeated_unuseful_reports_emit_a_defeater() {
        use librarian_core::ids::PackId;
        use librarian_core::model::{ContextPack, PackData};
        use librarian_storage::sqlite_store::SqliteStore;

        let storage = SqliteStore::open_in_memory().unwrap();
        let pack = ContextPack::new(
            PackId::new("pack-x"),
            PackData::Knowledge {
                subkind: "architecture".to_string(),
                topic: "retrieval".to_string(),
            },
            "summary",
        );
        storage.upsert_pack(pack).await.unwrap();

        let mut defeaters = Vec::new();
        for _ in 0..REPEATED_UNUSEFUL_THRESHOLD {
            let report = OutcomeReport {
                success: false,
                files_modified: vec![],
                cited_pack_ids: vec!["pack-x".to_string()],
                usefulness: 0.0,
            };
            defeaters = report_outcome(&storage, &report).await.unwrap();
        }
        assert_eq!(defeaters.len(), 1);
        assert_eq!(defeaters[0].defeater_type, DefeaterType::Rebuttal);
    }
}
