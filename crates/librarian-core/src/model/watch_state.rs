//! Persisted watcher cursor, stored under the state key `librarian.watch_state.v1`.

use serde::{Deserialize, Serialize};

/// Key under which `WatchState` is persisted via `Storage::set_state`/`get_state`.
pub const WATCH_STATE_KEY: &str = "librarian.watch_state.v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WatchCursor {
    Git {
        last_indexed_commit_sha: Option<String>,
    },
    Mtime {
        last_indexed_at: Option<chrono::DateTime<chrono::Utc>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchState {
    pub schema_version: u32,
    pub workspace_root: String,
    pub cursor: WatchCursor,
    pub needs_catchup: bool,
    pub last_error: Option<String>,
}

impl WatchState {
    pub fn new_git(workspace_root: impl Into<String>) -> Self {
        Self {
            schema_version: 1,
            workspace_root: workspace_root.into(),
            cursor: WatchCursor::Git {
                last_indexed_commit_sha: None,
            },
            needs_catchup: true,
            last_error: None,
        }
    }

    pub fn new_mtime(workspace_root: impl Into<String>) -> Self {
        Self {
            schema_version: 1,
            workspace_root: workspace_root.into(),
            cursor: WatchCursor::Mtime {
                last_indexed_at: None,
            },
            needs_catchup: true,
            last_error: None,
        }
    }

    /// Set by the watcher when a batch exceeds `stormThreshold` (spec §4.5, §8).
    pub const STORM_ERROR: &'static str = "watch_event_storm";
}
