//! Versioned schema migrations, applied in order and recorded in `schema_migrations`
//! (see the `SUPPLEMENTAL FEATURES` section of SPEC_FULL.md). The table list below
//! matches the persisted-state table list in spec §6 exactly.

pub const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS files (
        path TEXT PRIMARY KEY,
        checksum TEXT NOT NULL,
        size_bytes INTEGER NOT NULL,
        last_modified TEXT NOT NULL,
        last_indexed TEXT NOT NULL,
        category TEXT NOT NULL,
        role TEXT NOT NULL,
        language TEXT,
        imports TEXT NOT NULL DEFAULT '[]',
        exported_symbols TEXT NOT NULL DEFAULT '[]'
    );

    CREATE TABLE IF NOT EXISTS functions (
        id TEXT PRIMARY KEY,
        signature TEXT NOT NULL,
        purpose TEXT NOT NULL,
        confidence REAL NOT NULL,
        access_count INTEGER NOT NULL DEFAULT 0,
        successes INTEGER NOT NULL DEFAULT 0,
        failures INTEGER NOT NULL DEFAULT 0,
        file_path TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS modules (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        purpose TEXT NOT NULL,
        confidence REAL NOT NULL,
        access_count INTEGER NOT NULL DEFAULT 0,
        successes INTEGER NOT NULL DEFAULT 0,
        failures INTEGER NOT NULL DEFAULT 0,
        file_path TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS context_packs (
        id TEXT PRIMARY KEY,
        pack_json TEXT NOT NULL,
        pack_type TEXT NOT NULL,
        confidence REAL NOT NULL,
        created_at TEXT NOT NULL,
        invalidated INTEGER NOT NULL DEFAULT 0,
        access_count INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_context_packs_type_invalidated
        ON context_packs (pack_type, invalidated);

    CREATE TABLE IF NOT EXISTS knowledge_graph_edges (
        source_id TEXT NOT NULL,
        target_id TEXT NOT NULL,
        edge_json TEXT NOT NULL,
        weight REAL NOT NULL,
        confidence REAL NOT NULL,
        computed_at TEXT NOT NULL,
        PRIMARY KEY (source_id, target_id, edge_json)
    );
    CREATE INDEX IF NOT EXISTS idx_kg_edges_source_target
        ON knowledge_graph_edges (source_id, target_id);

    CREATE TABLE IF NOT EXISTS evidence_claims (
        id TEXT PRIMARY KEY,
        claim_json TEXT NOT NULL,
        status TEXT NOT NULL,
        claim_type TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_evidence_claims_type_status
        ON evidence_claims (claim_type, status);

    CREATE TABLE IF NOT EXISTS evidence_edges (
        source_id TEXT NOT NULL,
        target_id TEXT NOT NULL,
        edge_json TEXT NOT NULL,
        PRIMARY KEY (source_id, target_id, edge_json)
    );
    CREATE INDEX IF NOT EXISTS idx_evidence_edges_source_target
        ON evidence_edges (source_id, target_id);

    CREATE TABLE IF NOT EXISTS evidence_defeaters (
        id TEXT PRIMARY KEY,
        defeater_json TEXT NOT NULL,
        affected_claim_ids TEXT NOT NULL,
        status TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_evidence_defeaters_affected_claim_ids
        ON evidence_defeaters (affected_claim_ids);

    CREATE TABLE IF NOT EXISTS evidence_contradictions (
        id TEXT PRIMARY KEY,
        contradiction_json TEXT NOT NULL,
        status TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS evidence_graph_meta (
        workspace TEXT PRIMARY KEY,
        meta_json TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS state_blobs (
        key TEXT PRIMARY KEY,
        value_json TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS ledger_sessions (
        id TEXT PRIMARY KEY,
        opened_at TEXT NOT NULL,
        closed_at TEXT
    );

    CREATE TABLE IF NOT EXISTS ledger_entries (
        id TEXT PRIMARY KEY,
        session_id TEXT,
        timestamp TEXT NOT NULL,
        kind TEXT NOT NULL,
        entry_json TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_ledger_entries_timestamp ON ledger_entries (timestamp);
    CREATE INDEX IF NOT EXISTS idx_ledger_entries_session ON ledger_entries (session_id);
    "#,
];
