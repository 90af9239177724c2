//! The `Storage` trait: durable key-value + relational access for every entity in the
//! data model (spec §4.1). `librarian-storage::SqliteStore` is the only implementation
//! shipped here; tests may provide an in-memory fake behind the same trait.

use async_trait::async_trait;
use librarian_core::error::StorageError;
use librarian_core::model::{
    Claim, Contradiction, ContextPack, Defeater, EvidenceGraphMeta, File, Function, KnowledgeEdge,
    LedgerEntry, Module,
};
use serde_json::Value;

use crate::query::{ClaimQuery, EdgeQuery, PackQuery};

/// Outcome reported on a context pack access, feeding its per-outcome counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    Success,
    Failure,
}

#[async_trait]
pub trait Storage: Send + Sync {
    // -- Files --------------------------------------------------------------
    async fn upsert_file(&self, file: File) -> Result<(), StorageError>;
    async fn get_file(&self, path: &str) -> Result<Option<File>, StorageError>;
    async fn get_files(&self) -> Result<Vec<File>, StorageError>;
    async fn get_file_checksum(&self, path: &str) -> Result<Option<String>, StorageError>;
    async fn delete_file(&self, path: &str) -> Result<(), StorageError>;

    // -- Functions / modules --------------------------------------------------
    async fn upsert_function(&self, function: Function) -> Result<(), StorageError>;
    async fn get_function(&self, id: &str) -> Result<Option<Function>, StorageError>;
    async fn delete_function(&self, id: &str) -> Result<(), StorageError>;

    async fn upsert_module(&self, module: Module) -> Result<(), StorageError>;
    async fn get_module(&self, id: &str) -> Result<Option<Module>, StorageError>;
    async fn delete_module(&self, id: &str) -> Result<(), StorageError>;

    // -- Context packs --------------------------------------------------------
    async fn upsert_pack(&self, pack: ContextPack) -> Result<(), StorageError>;
    async fn get_pack(&self, id: &str) -> Result<Option<ContextPack>, StorageError>;
    async fn query_packs(&self, query: PackQuery) -> Result<Vec<ContextPack>, StorageError>;
    async fn delete_pack(&self, id: &str) -> Result<(), StorageError>;
    /// Soft-invalidate every pack whose invalidation triggers match `trigger_tag`
    /// (e.g. a changed file path, or `"version_bump"`). Returns the number invalidated.
    async fn invalidate_context_packs(&self, trigger_tag: &str) -> Result<usize, StorageError>;
    async fn record_context_pack_access(
        &self,
        pack_id: &str,
        outcome: AccessOutcome,
    ) -> Result<(), StorageError>;

    // -- Knowledge graph edges -------------------------------------------------
    async fn upsert_knowledge_edge(&self, edge: KnowledgeEdge) -> Result<(), StorageError>;
    async fn get_knowledge_edges_from(&self, id: &str) -> Result<Vec<KnowledgeEdge>, StorageError>;
    async fn get_knowledge_edges_to(&self, id: &str) -> Result<Vec<KnowledgeEdge>, StorageError>;
    async fn query_knowledge_edges(&self, query: EdgeQuery) -> Result<Vec<KnowledgeEdge>, StorageError>;

    // -- Evidence graph ---------------------------------------------------------
    async fn upsert_claim(&self, claim: Claim) -> Result<(), StorageError>;
    async fn get_claim(&self, id: &str) -> Result<Option<Claim>, StorageError>;
    async fn query_claims(&self, query: ClaimQuery) -> Result<Vec<Claim>, StorageError>;
    async fn delete_claim(&self, id: &str) -> Result<(), StorageError>;

    async fn upsert_evidence_edge(
        &self,
        source_id: &str,
        target_id: &str,
        edge_type: &str,
    ) -> Result<(), StorageError>;
    async fn get_evidence_edges_from(&self, id: &str) -> Result<Vec<(String, String)>, StorageError>;

    async fn upsert_defeater(&self, defeater: Defeater) -> Result<(), StorageError>;
    async fn get_defeater(&self, id: &str) -> Result<Option<Defeater>, StorageError>;
    async fn get_defeaters_for_claim(&self, claim_id: &str) -> Result<Vec<Defeater>, StorageError>;

    async fn upsert_contradiction(&self, contradiction: Contradiction) -> Result<(), StorageError>;
    async fn get_contradiction(&self, id: &str) -> Result<Option<Contradiction>, StorageError>;
    async fn get_unresolved_contradictions(&self) -> Result<Vec<Contradiction>, StorageError>;

    async fn get_evidence_graph_meta(&self, workspace: &str) -> Result<EvidenceGraphMeta, StorageError>;
    async fn set_evidence_graph_meta(&self, meta: EvidenceGraphMeta) -> Result<(), StorageError>;

    /// Multiply every claim's confidence components by `factor` (used to model aging
    /// evidence over time, spec §4.1).
    async fn apply_time_decay(&self, factor: f64) -> Result<usize, StorageError>;

    // -- Ledger ------------------------------------------------------------------
    async fn open_ledger_session(&self, session_id: &str) -> Result<(), StorageError>;
    async fn close_ledger_session(&self, session_id: &str) -> Result<(), StorageError>;
    async fn append_ledger_entry(&self, entry: LedgerEntry) -> Result<(), StorageError>;
    async fn get_session_entries(&self, session_id: &str) -> Result<Vec<LedgerEntry>, StorageError>;

    // -- State blobs ---------------------------------------------------------------
    async fn set_state(&self, key: &str, value: Value) -> Result<(), StorageError>;
    async fn get_state(&self, key: &str) -> Result<Option<Value>, StorageError>;

    // -- Maintenance -----------------------------------------------------------------
    async fn vacuum(&self) -> Result<(), StorageError>;
}
