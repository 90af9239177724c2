//! Query episodes (spec §4.6 step 10): a compact record of what a query asked for and
//! used, persisted via [`Storage::set_state`]/[`Storage::get_state`] under an
//! `episode:<id>` key — the same state-blob pattern
//! [`librarian_retrieval::index::RetrievalIndex`] uses for cached embeddings, since an
//! episode has no query surface of its own beyond point lookups by ID.

use chrono::{DateTime, Utc};
use librarian_core::error::StorageError;
use librarian_core::ids::PackId;
use librarian_storage::Storage;
use serde::{Deserialize, Serialize};

/// Outcome is recorded in a second pass (spec §4.6 feedback loop), so it starts `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryEpisode {
    pub id: String,
    pub intent: String,
    pub pack_ids_used: Vec<String>,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub outcome: Option<EpisodeOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeOutcome {
    pub success: bool,
    pub files_modified: Vec<String>,
    pub usefulness: f64,
    pub reported_at: DateTime<Utc>,
}

fn episode_key(id: &str) -> String {
    format!("episode:{id}")
}

impl QueryEpisode {
    pub fn new(id: impl Into<String>, intent: impl Into<String>, pack_ids_used: &[PackId], confidence: f64) -> Self {
        Self {
            id: id.into(),
            intent: intent.into(),
            pack_ids_used: pack_ids_used.iter().map(|p| p.as_str().to_string()).collect(),
            confidence,
            created_at: Utc::now(),
            outcome: None,
        }
    }
}

pub async fn record_episode(storage: &dyn Storage, episode: &QueryEpisode) -> Result<(), StorageError> {
    let value = serde_json::to_value(episode).map_err(|e| StorageError::corruption(e.to_string()))?;
    storage.set_state(&episode_key(&episode.id), value).await
}

pub async fn load_episode(storage: &dyn Storage, id: &str) -> Result<Option<QueryEpisode>, StorageError> {
    let Some(value) = storage.get_state(&episode_key(id)).await? else {
        return Ok(None);
    };
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| StorageError::corruption(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use librarian_storage::sqlite_store::SqliteStore;

    #[tokio::test]
    async fn an_episode_round_trips_through_storage() {
        let storage = SqliteStore::open_in_memory().unwrap();
        let episode = QueryEpisode::new("ep-1", "explain the retrieval engine", &[PackId::new("pack-a")], 0.7);
        record_episode(&storage, &episode).await.unwrap();
        let loaded = load_episode(&storage, "ep-1").await.unwrap().unwrap();
        assert_eq!(loaded.intent, episode.intent);
        assert!(loaded.outcome.is_none());
    }
}
