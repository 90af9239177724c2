//! Debounced filesystem watching, git-cursor reconciliation, cascade reindex, and
//! per-file staleness tracking (spec §4.5, §4.8).

mod cascade;
mod debounce;
mod git_cursor;
mod indexer;
mod quarantine;
mod staleness;
mod walker;
mod watcher;

pub use cascade::CascadeQueue;
pub use debounce::{coalesce, BatchOutcome, RawEvent};
pub use git_cursor::{advance_cursor, reconcile, GitBoundary, GitChangeSet, ProcessGitBoundary, ReconcileOutcome};
pub use indexer::{classify_file, Indexer, QUARANTINE_THRESHOLD};
pub use quarantine::QuarantineTracker;
pub use staleness::{categorize, freshness_confidence_for_age, StalenessCategory, StalenessTracker};
pub use walker::walk_workspace;
pub use watcher::FsWatcher;
