//! Top-level orchestrator (spec §4.5 "Indexer"): owns the watcher, cascade queue,
//! staleness tracker, quarantine tracker, and git cursor, and drives reindexing of the
//! retrieval index and knowledge graph against [`Storage`].

use std::path::{Path, PathBuf};
use std::time::Instant as StdInstant;

use chrono::Utc;
use librarian_core::config::WatcherConfig;
use librarian_core::error::{LibrarianError, ValidationError};
use librarian_core::ids::DefeaterId;
use librarian_core::model::watch_state::{WatchCursor, WatchState, WATCH_STATE_KEY};
use librarian_core::model::{
    content_checksum, Defeater, DefeaterSeverity, DefeaterType, EdgeType, File, FileCategory,
    FileRole, KnowledgeEdge, StructuralEdgeType,
};
use librarian_core::Governor;
use librarian_embeddings::{EmbeddingRequest, EmbeddingService};
use librarian_evidence::EvidenceGraph;
use librarian_retrieval::RetrievalIndex;
use librarian_storage::Storage;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cascade::CascadeQueue;
use crate::debounce::BatchOutcome;
use crate::git_cursor::{advance_cursor, reconcile, GitBoundary, ReconcileOutcome};
use crate::quarantine::QuarantineTracker;
use crate::staleness::StalenessTracker;
use crate::walker::walk_workspace;

/// Coarse extension-based classifier used while no richer language tooling is wired in
/// (spec §4.8 names the category, not how to derive it).
pub fn classify_file(path: &str) -> (FileCategory, FileRole, Option<String>) {
    let category = if File::matches_dependency_path(path) {
        FileCategory::Dependency
    } else if path.contains("/target/") || path.contains("/dist/") || path.contains("/build/") {
        FileCategory::Generated
    } else if path.contains("/test/") || path.contains("/tests/") || path.contains("_test.") {
        FileCategory::Test
    } else {
        FileCategory::Project
    };

    let role = if matches!(category, FileCategory::Test) {
        FileRole::Test
    } else if path.ends_with(".md") || path.ends_with(".rst") || path.ends_with(".txt") {
        FileRole::Documentation
    } else if path.ends_with(".toml") || path.ends_with(".yaml") || path.ends_with(".yml") || path.ends_with(".json") {
        FileRole::Config
    } else if path.ends_with("Makefile") || path.ends_with(".mk") || path.contains("Dockerfile") {
        FileRole::Build
    } else {
        FileRole::Source
    };

    let language = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_string());

    (category, role, language)
}

/// Heuristic import scan: lines starting with `use`/`import`/`from` naming another
/// in-workspace path-like token. Good enough to seed cascade edges without a real
/// per-language parser (recorded as an open decision in DESIGN.md).
fn extract_imports(contents: &str) -> Vec<String> {
    let mut imports = Vec::new();
    for line in contents.lines().take(200) {
        let trimmed = line.trim();
        let token = if let Some(rest) = trimmed.strip_prefix("use ") {
            rest
        } else if let Some(rest) = trimmed.strip_prefix("import ") {
            rest
        } else if let Some(rest) = trimmed.strip_prefix("from ") {
            rest
        } else {
            continue;
        };
        let ident: String = token
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':' || *c == '.' || *c == '/')
            .collect();
        if !ident.is_empty() {
            imports.push(ident);
        }
    }
    imports
}

pub struct Indexer {
    storage: Arc<dyn Storage>,
    retrieval_index: Arc<RetrievalIndex>,
    embeddings: Arc<EmbeddingService>,
    evidence: Arc<EvidenceGraph>,
    config: WatcherConfig,
    workspace_root: PathBuf,
    staleness: StalenessTracker,
    quarantine: QuarantineTracker,
    cascade: parking_lot::Mutex<CascadeQueue>,
}

/// Files failing this many consecutive reindex attempts are quarantined (spec §4.5
/// "Quarantine"). Not named as a numeric constant in §4 — chosen to match the
/// `circuit_breaker.failure_threshold` default of 5 for consistency, recorded in
/// DESIGN.md.
pub const QUARANTINE_THRESHOLD: u32 = 5;

impl Indexer {
    pub fn new(
        storage: Arc<dyn Storage>,
        retrieval_index: Arc<RetrievalIndex>,
        embeddings: Arc<EmbeddingService>,
        evidence: Arc<EvidenceGraph>,
        staleness_config: librarian_core::config::StalenessConfig,
        watcher_config: WatcherConfig,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        let cascade = CascadeQueue::new(watcher_config.cascade_delay_ms, watcher_config.cascade_batch_size);
        Self {
            storage,
            retrieval_index,
            embeddings,
            evidence,
            staleness: StalenessTracker::new(staleness_config),
            quarantine: QuarantineTracker::new(QUARANTINE_THRESHOLD),
            cascade: parking_lot::Mutex::new(cascade),
            config: watcher_config,
            workspace_root: workspace_root.into(),
        }
    }

    pub fn staleness(&self) -> &StalenessTracker {
        &self.staleness
    }

    pub fn quarantine(&self) -> &QuarantineTracker {
        &self.quarantine
    }

    async fn load_watch_state(&self) -> Result<WatchState, LibrarianError> {
        match self.storage.get_state(WATCH_STATE_KEY).await? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| ValidationError::new(format!("corrupt watch state: {e}")).into()),
            None => Ok(WatchState::new_git(self.workspace_root.to_string_lossy().to_string())),
        }
    }

    async fn save_watch_state(&self, state: &WatchState) -> Result<(), LibrarianError> {
        self.storage
            .set_state(WATCH_STATE_KEY, serde_json::to_value(state).expect("WatchState always serializes"))
            .await?;
        Ok(())
    }

    /// Startup reconciliation (spec §8 "watcher reconcile with git"): prefer the git
    /// cursor, fall back to a full mtime sweep on any git failure, then persist the
    /// advanced cursor.
    pub async fn walk_and_reconcile(
        &self,
        git: &dyn GitBoundary,
        governor: &Governor,
    ) -> Result<usize, LibrarianError> {
        let mut state = self.load_watch_state().await?;
        let outcome = reconcile(git, &state);

        let touched = match outcome {
            ReconcileOutcome::GitDiff(changes) => {
                for deleted in &changes.deleted {
                    self.handle_deletion(deleted).await?;
                }
                changes.touched_paths()
            }
            ReconcileOutcome::NeedsMtimeSweep => {
                info!("no usable git cursor, falling back to a full mtime sweep");
                state = WatchState::new_mtime(self.workspace_root.to_string_lossy().to_string());
                walk_workspace(&self.workspace_root, &self.config.include_globs, &self.config.exclude_globs)
            }
        };

        let mut reindexed = 0;
        for relative in &touched {
            match self.reindex_file(relative, governor).await {
                Ok(()) => reindexed += 1,
                Err(err) => warn!(path = %relative, error = %err, "reindex failed during reconcile"),
            }
        }

        if let Some(new_sha) = git.current_sha() {
            advance_cursor(&mut state, new_sha);
        } else {
            state.cursor = WatchCursor::Mtime {
                last_indexed_at: Some(Utc::now()),
            };
            state.needs_catchup = false;
        }
        self.save_watch_state(&state).await?;
        Ok(reindexed)
    }

    /// Apply one coalesced watcher batch (spec §4.5 "Watcher"). A storm sets
    /// `needs_catchup` for the next reconcile instead of reindexing the batch directly.
    pub async fn process_batch(&self, outcome: BatchOutcome, governor: &Governor) -> Result<usize, LibrarianError> {
        match outcome {
            BatchOutcome::Storm { event_count } => {
                warn!(event_count, "watch event storm detected, deferring to full reconcile");
                let mut state = self.load_watch_state().await?;
                state.needs_catchup = true;
                state.last_error = Some(WatchState::STORM_ERROR.to_string());
                self.save_watch_state(&state).await?;
                Ok(0)
            }
            BatchOutcome::Candidates(paths) => {
                let mut reindexed = 0;
                for path in &paths {
                    match self.reindex_file(path, governor).await {
                        Ok(()) => reindexed += 1,
                        Err(err) => warn!(path = %path, error = %err, "reindex failed"),
                    }
                }
                self.drain_cascade(governor).await?;
                Ok(reindexed)
            }
        }
    }

    async fn handle_deletion(&self, relative_path: &str) -> Result<(), LibrarianError> {
        self.storage.delete_file(relative_path).await?;
        self.storage.invalidate_context_packs(relative_path).await?;
        self.staleness.mark_closed(relative_path);
        Ok(())
    }

    /// Reindex one file: compute its checksum, skip re-embedding if unchanged (the
    /// checksum-idempotence invariant from spec §8), update the retrieval index and
    /// knowledge-graph import edges, then enqueue its dependents for cascade reindex.
    pub async fn reindex_file(&self, relative_path: &str, governor: &Governor) -> Result<(), LibrarianError> {
        if self.quarantine.is_quarantined(relative_path) {
            return Ok(());
        }

        let absolute = self.workspace_root.join(relative_path);
        let result = self.do_reindex(relative_path, &absolute, governor).await;

        match &result {
            Ok(()) => self.quarantine.record_success(relative_path),
            Err(_) => {
                if self.quarantine.record_failure(relative_path) {
                    self.emit_staleness_defeater(relative_path).await?;
                }
            }
        }
        result
    }

    async fn do_reindex(&self, relative_path: &str, absolute: &Path, governor: &Governor) -> Result<(), LibrarianError> {
        let bytes = tokio::fs::read(absolute)
            .await
            .map_err(|e| ValidationError::new(format!("cannot read {relative_path}: {e}")))?;
        if bytes.len() as u64 > self.config.max_file_size_bytes {
            return Err(ValidationError::new(format!("{relative_path} exceeds max_file_size_bytes")).into());
        }

        let checksum = content_checksum(&bytes);
        if let Some(existing) = self.storage.get_file_checksum(relative_path).await? {
            if existing == checksum {
                self.staleness.mark_indexed(relative_path, Utc::now());
                return Ok(());
            }
        }

        let contents = String::from_utf8_lossy(&bytes).into_owned();
        let (category, role, language) = classify_file(relative_path);
        let imports = extract_imports(&contents);

        let metadata = tokio::fs::metadata(absolute)
            .await
            .map_err(|e| ValidationError::new(format!("cannot stat {relative_path}: {e}")))?;
        let last_modified = metadata
            .modified()
            .ok()
            .map(chrono::DateTime::<Utc>::from)
            .unwrap_or_else(Utc::now);

        let now = Utc::now();
        let file = File {
            path: relative_path.to_string(),
            checksum: checksum.clone(),
            size_bytes: bytes.len() as u64,
            last_modified,
            last_indexed: now,
            category,
            role,
            language,
            imports: imports.clone(),
            exported_symbols: Vec::new(),
        };

        self.storage.upsert_file(file.clone()).await?;

        let purpose_text = format!("{relative_path} ({})", role_label(role));
        self.retrieval_index
            .index_file(&self.embeddings, governor, &file, &purpose_text)
            .await?;

        for target in &imports {
            let edge = KnowledgeEdge::new(
                relative_path,
                target.as_str(),
                EdgeType::Structural(StructuralEdgeType::Imports),
            );
            self.storage.upsert_knowledge_edge(edge).await?;
        }

        self.staleness.mark_indexed(relative_path, now);
        self.enqueue_dependents(relative_path).await?;
        Ok(())
    }

    /// Push every file that imports `relative_path` onto the cascade queue (spec §4.5
    /// "Cascade", §8 "cascade causality").
    async fn enqueue_dependents(&self, relative_path: &str) -> Result<(), LibrarianError> {
        if !self.config.cascade_enabled {
            return Ok(());
        }
        let incoming = self.storage.get_knowledge_edges_to(relative_path).await?;
        let dependents: Vec<String> = incoming
            .into_iter()
            .filter(|e| matches!(e.edge_type, EdgeType::Structural(StructuralEdgeType::Imports)))
            .map(|e| e.source_id)
            .collect();
        if !dependents.is_empty() {
            self.cascade.lock().enqueue(dependents);
        }
        Ok(())
    }

    async fn drain_cascade(&self, governor: &Governor) -> Result<(), LibrarianError> {
        let ready = self.cascade.lock().drain_ready(StdInstant::now());
        for path in ready {
            if let Err(err) = self.reindex_file(&path, governor).await {
                warn!(path = %path, error = %err, "cascade reindex failed");
            }
        }
        Ok(())
    }

    /// A file quarantined after repeated failures gets an active staleness defeater
    /// against every claim whose subject references it, so downstream packs surface a
    /// `unverified_by_trace` disclosure instead of silently trusting stale evidence.
    /// `ClaimQuery` has no subject/path filter (see DESIGN.md "Gap noted"), so this
    /// scans and filters client-side.
    async fn emit_staleness_defeater(&self, relative_path: &str) -> Result<(), LibrarianError> {
        let claims = self
            .storage
            .query_claims(librarian_storage::ClaimQuery {
                page: librarian_storage::Page { limit: 10_000, offset: 0 },
                ..Default::default()
            })
            .await?;
        let affected: Vec<_> = claims
            .into_iter()
            .filter(|c| {
                c.subject.id == relative_path
                    || c.subject.location.as_deref() == Some(relative_path)
            })
            .map(|c| c.id)
            .collect();
        if affected.is_empty() {
            return Ok(());
        }

        let mut defeater = Defeater::new(
            DefeaterId::generate(),
            DefeaterType::Staleness,
            DefeaterSeverity::Significant,
            affected,
            0.6,
        );
        defeater.activate();
        self.evidence.upsert_defeater(defeater).await?;
        Ok(())
    }

    /// Record that an agent has a file open, tightening its staleness SLA (spec §4.8).
    pub fn mark_open(&self, relative_path: &str) {
        self.staleness.mark_open(relative_path);
    }

    pub fn mark_closed(&self, relative_path: &str) {
        self.staleness.mark_closed(relative_path);
    }
}

fn role_label(role: FileRole) -> &'static str {
    match role {
        FileRole::Source => "source",
        FileRole::Test => "test",
        FileRole::Config => "config",
        FileRole::Documentation => "documentation",
        FileRole::Build => "build",
    }
}
