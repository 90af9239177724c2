//! SQLite-backed [`Storage`] implementation. Every entity is stored as a JSON blob plus
//! the indexed columns needed to filter without deserializing every row, mirroring the
//! schema in `migrations.rs` (spec §6).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use librarian_core::error::StorageError;
use librarian_core::model::{
    Claim, Contradiction, ContextPack, Defeater, EvidenceGraphMeta, File, Function, KnowledgeEdge,
    LedgerEntry, Module,
};
use rusqlite::{params, OptionalExtension};
use serde_json::Value;
use std::path::Path;

use crate::connection::ConnectionHandle;
use crate::query::{ClaimQuery, EdgeQuery, OrderBy, PackQuery, SortDirection};
use crate::store::{AccessOutcome, Storage};

/// SQLite-backed durable store. Cheap to clone; every clone shares the same underlying
/// connection handle.
#[derive(Clone)]
pub struct SqliteStore {
    conn: ConnectionHandle,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Ok(Self {
            conn: ConnectionHandle::open(path, true)?,
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self {
            conn: ConnectionHandle::open_in_memory()?,
        })
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&ConnectionHandle) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || f(&conn))
            .await
            .map_err(|e| StorageError::transient(format!("storage task panicked: {e}")))?
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| StorageError::corruption(format!("serialize failed: {e}")))
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, StorageError> {
    serde_json::from_str(raw).map_err(|e| StorageError::corruption(format!("deserialize failed: {e}")))
}

fn order_column(order_by: OrderBy) -> &'static str {
    match order_by {
        OrderBy::Weight => "weight",
        OrderBy::Confidence => "confidence",
        OrderBy::Time => "computed_at",
    }
}

fn direction_sql(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Ascending => "ASC",
        SortDirection::Descending => "DESC",
    }
}

#[async_trait]
impl Storage for SqliteStore {
    // -- Files --------------------------------------------------------------
    async fn upsert_file(&self, file: File) -> Result<(), StorageError> {
        self.blocking(move |conn| {
            let imports = to_json(&file.imports)?;
            let exported_symbols = to_json(&file.exported_symbols)?;
            conn.with_conn(|c| {
                c.execute(
                    "INSERT INTO files (path, checksum, size_bytes, last_modified, last_indexed, category, role, language, imports, exported_symbols)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                     ON CONFLICT(path) DO UPDATE SET
                         checksum = excluded.checksum,
                         size_bytes = excluded.size_bytes,
                         last_modified = excluded.last_modified,
                         last_indexed = excluded.last_indexed,
                         category = excluded.category,
                         role = excluded.role,
                         language = excluded.language,
                         imports = excluded.imports,
                         exported_symbols = excluded.exported_symbols",
                    params![
                        file.path,
                        file.checksum,
                        file.size_bytes as i64,
                        file.last_modified.to_rfc3339(),
                        file.last_indexed.to_rfc3339(),
                        format!("{:?}", file.category),
                        format!("{:?}", file.role),
                        file.language,
                        imports,
                        exported_symbols,
                    ],
                )
            })?;
            Ok(())
        })
        .await
    }

    async fn get_file(&self, path: &str) -> Result<Option<File>, StorageError> {
        let path = path.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                c.query_row(
                    "SELECT path, checksum, size_bytes, last_modified, last_indexed, category, role, language, imports, exported_symbols
                     FROM files WHERE path = ?1",
                    params![path],
                    row_to_file,
                )
                .optional()
            })
        })
        .await
    }

    async fn get_files(&self) -> Result<Vec<File>, StorageError> {
        self.blocking(|conn| {
            conn.with_conn(|c| {
                let mut stmt = c.prepare(
                    "SELECT path, checksum, size_bytes, last_modified, last_indexed, category, role, language, imports, exported_symbols
                     FROM files ORDER BY path",
                )?;
                let rows = stmt.query_map([], row_to_file)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
        })
        .await
    }

    async fn get_file_checksum(&self, path: &str) -> Result<Option<String>, StorageError> {
        let path = path.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                c.query_row("SELECT checksum FROM files WHERE path = ?1", params![path], |row| row.get(0))
                    .optional()
            })
        })
        .await
    }

    async fn delete_file(&self, path: &str) -> Result<(), StorageError> {
        let path = path.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| c.execute("DELETE FROM files WHERE path = ?1", params![path]))?;
            Ok(())
        })
        .await
    }

    // -- Functions / modules --------------------------------------------------
    async fn upsert_function(&self, function: Function) -> Result<(), StorageError> {
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                c.execute(
                    "INSERT INTO functions (id, signature, purpose, confidence, access_count, successes, failures, file_path)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(id) DO UPDATE SET
                         signature = excluded.signature,
                         purpose = excluded.purpose,
                         confidence = excluded.confidence,
                         access_count = excluded.access_count,
                         successes = excluded.successes,
                         failures = excluded.failures,
                         file_path = excluded.file_path",
                    params![
                        function.id.as_str(),
                        function.signature,
                        function.purpose,
                        function.confidence,
                        function.access_count as i64,
                        function.outcomes.successes as i64,
                        function.outcomes.failures as i64,
                        function.file_path,
                    ],
                )
            })?;
            Ok(())
        })
        .await
    }

    async fn get_function(&self, id: &str) -> Result<Option<Function>, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                c.query_row(
                    "SELECT id, signature, purpose, confidence, access_count, successes, failures, file_path
                     FROM functions WHERE id = ?1",
                    params![id],
                    row_to_function,
                )
                .optional()
            })
        })
        .await
    }

    async fn delete_function(&self, id: &str) -> Result<(), StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| c.execute("DELETE FROM functions WHERE id = ?1", params![id]))?;
            Ok(())
        })
        .await
    }

    async fn upsert_module(&self, module: Module) -> Result<(), StorageError> {
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                c.execute(
                    "INSERT INTO modules (id, name, purpose, confidence, access_count, successes, failures, file_path)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(id) DO UPDATE SET
                         name = excluded.name,
                         purpose = excluded.purpose,
                         confidence = excluded.confidence,
                         access_count = excluded.access_count,
                         successes = excluded.successes,
                         failures = excluded.failures,
                         file_path = excluded.file_path",
                    params![
                        module.id.as_str(),
                        module.name,
                        module.purpose,
                        module.confidence,
                        module.access_count as i64,
                        module.outcomes.successes as i64,
                        module.outcomes.failures as i64,
                        module.file_path,
                    ],
                )
            })?;
            Ok(())
        })
        .await
    }

    async fn get_module(&self, id: &str) -> Result<Option<Module>, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                c.query_row(
                    "SELECT id, name, purpose, confidence, access_count, successes, failures, file_path
                     FROM modules WHERE id = ?1",
                    params![id],
                    row_to_module,
                )
                .optional()
            })
        })
        .await
    }

    async fn delete_module(&self, id: &str) -> Result<(), StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| c.execute("DELETE FROM modules WHERE id = ?1", params![id]))?;
            Ok(())
        })
        .await
    }

    // -- Context packs --------------------------------------------------------
    async fn upsert_pack(&self, pack: ContextPack) -> Result<(), StorageError> {
        self.blocking(move |conn| {
            let pack_json = to_json(&pack)?;
            conn.with_conn(|c| {
                c.execute(
                    "INSERT INTO context_packs (id, pack_json, pack_type, confidence, created_at, invalidated, access_count)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(id) DO UPDATE SET
                         pack_json = excluded.pack_json,
                         pack_type = excluded.pack_type,
                         confidence = excluded.confidence,
                         invalidated = excluded.invalidated,
                         access_count = excluded.access_count",
                    params![
                        pack.id.as_str(),
                        pack_json,
                        pack.data.kind_label(),
                        pack.confidence,
                        pack.created_at.to_rfc3339(),
                        pack.invalidated as i64,
                        pack.access_count as i64,
                    ],
                )
            })?;
            Ok(())
        })
        .await
    }

    async fn get_pack(&self, id: &str) -> Result<Option<ContextPack>, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                c.query_row("SELECT pack_json FROM context_packs WHERE id = ?1", params![id], |row| {
                    row.get::<_, String>(0)
                })
                .optional()
            })?
            .map(|raw| from_json(&raw))
            .transpose()
        })
        .await
    }

    async fn query_packs(&self, query: PackQuery) -> Result<Vec<ContextPack>, StorageError> {
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                let mut sql = String::from("SELECT pack_json FROM context_packs WHERE 1=1");
                if !query.include_invalidated {
                    sql.push_str(" AND invalidated = 0");
                }
                if query.pack_type.is_some() {
                    sql.push_str(" AND pack_type = ?1");
                }
                if query.min_confidence.is_some() {
                    sql.push_str(" AND confidence >= ?2");
                }
                if let Some(order_by) = query.order_by {
                    let direction = query.direction.unwrap_or(SortDirection::Descending);
                    sql.push_str(&format!(
                        " ORDER BY {} {}",
                        order_column(order_by),
                        direction_sql(direction)
                    ));
                }
                sql.push_str(" LIMIT ?3 OFFSET ?4");

                let mut stmt = c.prepare(&sql)?;
                let rows = stmt.query_map(
                    params![
                        query.pack_type.clone().unwrap_or_default(),
                        query.min_confidence.unwrap_or(0.0),
                        query.page.limit as i64,
                        query.page.offset as i64,
                    ],
                    |row| row.get::<_, String>(0),
                )?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })?
            .into_iter()
            .map(|raw| from_json(&raw))
            .collect()
        })
        .await
    }

    async fn delete_pack(&self, id: &str) -> Result<(), StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| c.execute("DELETE FROM context_packs WHERE id = ?1", params![id]))?;
            Ok(())
        })
        .await
    }

    async fn invalidate_context_packs(&self, trigger_tag: &str) -> Result<usize, StorageError> {
        let trigger_tag = trigger_tag.to_string();
        self.blocking(move |conn| {
            conn.with_transaction(|tx| {
                let mut stmt = tx.prepare("SELECT id, pack_json FROM context_packs WHERE invalidated = 0")?;
                let rows: Vec<(String, String)> = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                drop(stmt);

                let mut invalidated = 0usize;
                for (id, raw) in rows {
                    let Ok(mut pack) = serde_json::from_str::<ContextPack>(&raw) else {
                        continue;
                    };
                    let matches = pack.related_files.iter().any(|p| p == &trigger_tag)
                        || trigger_tag == "version_bump";
                    if !matches {
                        continue;
                    }
                    pack.invalidate(librarian_core::model::InvalidationTrigger::FileChanged(
                        trigger_tag.clone(),
                    ));
                    let pack_json = serde_json::to_string(&pack)
                        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                    tx.execute(
                        "UPDATE context_packs SET pack_json = ?1, invalidated = 1 WHERE id = ?2",
                        params![pack_json, id],
                    )?;
                    invalidated += 1;
                }
                Ok(invalidated)
            })
        })
        .await
    }

    async fn record_context_pack_access(&self, pack_id: &str, outcome: AccessOutcome) -> Result<(), StorageError> {
        let pack_id = pack_id.to_string();
        self.blocking(move |conn| {
            conn.with_transaction(|tx| {
                let raw: Option<String> = tx
                    .query_row("SELECT pack_json FROM context_packs WHERE id = ?1", params![pack_id], |row| row.get(0))
                    .optional()?;
                let Some(raw) = raw else { return Ok(()) };
                let mut pack: ContextPack = serde_json::from_str(&raw)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                pack.access_count += 1;
                pack.outcomes.record(matches!(outcome, AccessOutcome::Success));
                let pack_json = serde_json::to_string(&pack)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                tx.execute(
                    "UPDATE context_packs SET pack_json = ?1, access_count = ?2 WHERE id = ?3",
                    params![pack_json, pack.access_count as i64, pack_id],
                )?;
                Ok(())
            })
        })
        .await
    }

    // -- Knowledge graph edges -------------------------------------------------
    async fn upsert_knowledge_edge(&self, edge: KnowledgeEdge) -> Result<(), StorageError> {
        self.blocking(move |conn| {
            let edge_json = to_json(&edge)?;
            conn.with_conn(|c| {
                c.execute(
                    "INSERT INTO knowledge_graph_edges (source_id, target_id, edge_json, weight, confidence, computed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(source_id, target_id, edge_json) DO UPDATE SET
                         weight = excluded.weight,
                         confidence = excluded.confidence,
                         computed_at = excluded.computed_at",
                    params![
                        edge.source_id,
                        edge.target_id,
                        edge_json,
                        edge.weight,
                        edge.confidence,
                        edge.computed_at.to_rfc3339(),
                    ],
                )
            })?;
            Ok(())
        })
        .await
    }

    async fn get_knowledge_edges_from(&self, id: &str) -> Result<Vec<KnowledgeEdge>, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                let mut stmt = c.prepare("SELECT edge_json FROM knowledge_graph_edges WHERE source_id = ?1")?;
                let rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })?
            .into_iter()
            .map(|raw| from_json(&raw))
            .collect()
        })
        .await
    }

    async fn get_knowledge_edges_to(&self, id: &str) -> Result<Vec<KnowledgeEdge>, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                let mut stmt = c.prepare("SELECT edge_json FROM knowledge_graph_edges WHERE target_id = ?1")?;
                let rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })?
            .into_iter()
            .map(|raw| from_json(&raw))
            .collect()
        })
        .await
    }

    async fn query_knowledge_edges(&self, query: EdgeQuery) -> Result<Vec<KnowledgeEdge>, StorageError> {
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                let mut sql = String::from("SELECT edge_json FROM knowledge_graph_edges WHERE 1=1");
                if query.source_id.is_some() {
                    sql.push_str(" AND source_id = ?1");
                }
                if query.target_id.is_some() {
                    sql.push_str(" AND target_id = ?2");
                }
                if let Some(order_by) = query.order_by {
                    let direction = query.direction.unwrap_or(SortDirection::Descending);
                    sql.push_str(&format!(
                        " ORDER BY {} {}",
                        order_column(order_by),
                        direction_sql(direction)
                    ));
                }
                sql.push_str(" LIMIT ?3 OFFSET ?4");

                let mut stmt = c.prepare(&sql)?;
                let rows = stmt.query_map(
                    params![
                        query.source_id.clone().unwrap_or_default(),
                        query.target_id.clone().unwrap_or_default(),
                        query.page.limit as i64,
                        query.page.offset as i64,
                    ],
                    |row| row.get::<_, String>(0),
                )?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })?
            .into_iter()
            .map(|raw| from_json(&raw))
            .collect()
        })
        .await
    }

    // -- Evidence graph ---------------------------------------------------------
    async fn upsert_claim(&self, claim: Claim) -> Result<(), StorageError> {
        self.blocking(move |conn| {
            let claim_json = to_json(&claim)?;
            let status = format!("{:?}", claim.status);
            conn.with_conn(|c| {
                c.execute(
                    "INSERT INTO evidence_claims (id, claim_json, status, claim_type)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO UPDATE SET
                         claim_json = excluded.claim_json,
                         status = excluded.status,
                         claim_type = excluded.claim_type",
                    params![claim.id.as_str(), claim_json, status, claim.claim_type],
                )
            })?;
            Ok(())
        })
        .await
    }

    async fn get_claim(&self, id: &str) -> Result<Option<Claim>, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                c.query_row("SELECT claim_json FROM evidence_claims WHERE id = ?1", params![id], |row| {
                    row.get::<_, String>(0)
                })
                .optional()
            })?
            .map(|raw| from_json(&raw))
            .transpose()
        })
        .await
    }

    async fn query_claims(&self, query: ClaimQuery) -> Result<Vec<Claim>, StorageError> {
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                let mut sql = String::from("SELECT claim_json FROM evidence_claims WHERE 1=1");
                if query.claim_type.is_some() {
                    sql.push_str(" AND claim_type = ?1");
                }
                if query.status.is_some() {
                    sql.push_str(" AND status = ?2");
                }
                sql.push_str(" LIMIT ?3 OFFSET ?4");

                let mut stmt = c.prepare(&sql)?;
                let rows = stmt.query_map(
                    params![
                        query.claim_type.clone().unwrap_or_default(),
                        query.status.clone().unwrap_or_default(),
                        query.page.limit as i64,
                        query.page.offset as i64,
                    ],
                    |row| row.get::<_, String>(0),
                )?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })?
            .into_iter()
            .map(|raw| from_json(&raw))
            .collect()
        })
        .await
    }

    async fn delete_claim(&self, id: &str) -> Result<(), StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| c.execute("DELETE FROM evidence_claims WHERE id = ?1", params![id]))?;
            Ok(())
        })
        .await
    }

    async fn upsert_evidence_edge(&self, source_id: &str, target_id: &str, edge_type: &str) -> Result<(), StorageError> {
        let (source_id, target_id, edge_type) = (source_id.to_string(), target_id.to_string(), edge_type.to_string());
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                c.execute(
                    "INSERT OR IGNORE INTO evidence_edges (source_id, target_id, edge_json) VALUES (?1, ?2, ?3)",
                    params![source_id, target_id, edge_type],
                )
            })?;
            Ok(())
        })
        .await
    }

    async fn get_evidence_edges_from(&self, id: &str) -> Result<Vec<(String, String)>, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                let mut stmt = c.prepare("SELECT target_id, edge_json FROM evidence_edges WHERE source_id = ?1")?;
                let rows = stmt.query_map(params![id], |row| Ok((row.get(0)?, row.get(1)?)))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
        })
        .await
    }

    async fn upsert_defeater(&self, defeater: Defeater) -> Result<(), StorageError> {
        self.blocking(move |conn| {
            let defeater_json = to_json(&defeater)?;
            let affected = to_json(&defeater.affected_claim_ids.iter().map(|id| id.as_str().to_string()).collect::<Vec<_>>())?;
            let status = format!("{:?}", defeater.status);
            conn.with_conn(|c| {
                c.execute(
                    "INSERT INTO evidence_defeaters (id, defeater_json, affected_claim_ids, status)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO UPDATE SET
                         defeater_json = excluded.defeater_json,
                         affected_claim_ids = excluded.affected_claim_ids,
                         status = excluded.status",
                    params![defeater.id.as_str(), defeater_json, affected, status],
                )
            })?;
            Ok(())
        })
        .await
    }

    async fn get_defeater(&self, id: &str) -> Result<Option<Defeater>, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                c.query_row("SELECT defeater_json FROM evidence_defeaters WHERE id = ?1", params![id], |row| {
                    row.get::<_, String>(0)
                })
                .optional()
            })?
            .map(|raw| from_json(&raw))
            .transpose()
        })
        .await
    }

    async fn get_defeaters_for_claim(&self, claim_id: &str) -> Result<Vec<Defeater>, StorageError> {
        let needle = format!("%{claim_id}%");
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                let mut stmt = c.prepare("SELECT defeater_json FROM evidence_defeaters WHERE affected_claim_ids LIKE ?1")?;
                let rows = stmt.query_map(params![needle], |row| row.get::<_, String>(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })?
            .into_iter()
            .map(|raw| from_json(&raw))
            .collect()
        })
        .await
    }

    async fn upsert_contradiction(&self, contradiction: Contradiction) -> Result<(), StorageError> {
        self.blocking(move |conn| {
            let contradiction_json = to_json(&contradiction)?;
            let status = format!("{:?}", contradiction.status);
            conn.with_conn(|c| {
                c.execute(
                    "INSERT INTO evidence_contradictions (id, contradiction_json, status)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(id) DO UPDATE SET
                         contradiction_json = excluded.contradiction_json,
                         status = excluded.status",
                    params![contradiction.id.as_str(), contradiction_json, status],
                )
            })?;
            Ok(())
        })
        .await
    }

    async fn get_contradiction(&self, id: &str) -> Result<Option<Contradiction>, StorageError> {
        let id = id.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                c.query_row(
                    "SELECT contradiction_json FROM evidence_contradictions WHERE id = ?1",
                    params![id],
                    |row| row.get::<_, String>(0),
                )
                .optional()
            })?
            .map(|raw| from_json(&raw))
            .transpose()
        })
        .await
    }

    async fn get_unresolved_contradictions(&self) -> Result<Vec<Contradiction>, StorageError> {
        self.blocking(|conn| {
            conn.with_conn(|c| {
                let mut stmt = c.prepare("SELECT contradiction_json FROM evidence_contradictions WHERE status = 'Unresolved'")?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })?
            .into_iter()
            .map(|raw| from_json(&raw))
            .collect()
        })
        .await
    }

    async fn get_evidence_graph_meta(&self, workspace: &str) -> Result<EvidenceGraphMeta, StorageError> {
        let workspace = workspace.to_string();
        self.blocking(move |conn| {
            let raw: Option<String> = conn.with_conn(|c| {
                c.query_row("SELECT meta_json FROM evidence_graph_meta WHERE workspace = ?1", params![workspace], |row| {
                    row.get(0)
                })
                .optional()
            })?;
            match raw {
                Some(raw) => from_json(&raw),
                None => Ok(EvidenceGraphMeta::new(workspace)),
            }
        })
        .await
    }

    async fn set_evidence_graph_meta(&self, meta: EvidenceGraphMeta) -> Result<(), StorageError> {
        self.blocking(move |conn| {
            let meta_json = to_json(&meta)?;
            conn.with_conn(|c| {
                c.execute(
                    "INSERT INTO evidence_graph_meta (workspace, meta_json) VALUES (?1, ?2)
                     ON CONFLICT(workspace) DO UPDATE SET meta_json = excluded.meta_json",
                    params![meta.workspace, meta_json],
                )
            })?;
            Ok(())
        })
        .await
    }

    async fn apply_time_decay(&self, factor: f64) -> Result<usize, StorageError> {
        self.blocking(move |conn| {
            conn.with_transaction(|tx| {
                let mut stmt = tx.prepare("SELECT id, claim_json FROM evidence_claims")?;
                let rows: Vec<(String, String)> = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                drop(stmt);

                let mut decayed = 0usize;
                for (id, raw) in rows {
                    let Ok(mut claim) = serde_json::from_str::<Claim>(&raw) else {
                        continue;
                    };
                    claim.confidence.recency = (claim.confidence.recency * factor).clamp(0.01, 1.0);
                    let claim_json = serde_json::to_string(&claim)
                        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                    tx.execute("UPDATE evidence_claims SET claim_json = ?1 WHERE id = ?2", params![claim_json, id])?;
                    decayed += 1;
                }
                Ok(decayed)
            })
        })
        .await
    }

    // -- Ledger ------------------------------------------------------------------
    async fn open_ledger_session(&self, session_id: &str) -> Result<(), StorageError> {
        let session_id = session_id.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                c.execute(
                    "INSERT INTO ledger_sessions (id, opened_at) VALUES (?1, datetime('now'))
                     ON CONFLICT(id) DO NOTHING",
                    params![session_id],
                )
            })?;
            Ok(())
        })
        .await
    }

    async fn close_ledger_session(&self, session_id: &str) -> Result<(), StorageError> {
        let session_id = session_id.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                c.execute(
                    "UPDATE ledger_sessions SET closed_at = datetime('now') WHERE id = ?1",
                    params![session_id],
                )
            })?;
            Ok(())
        })
        .await
    }

    async fn append_ledger_entry(&self, entry: LedgerEntry) -> Result<(), StorageError> {
        self.blocking(move |conn| {
            let entry_json = to_json(&entry)?;
            let kind = format!("{:?}", entry.kind);
            conn.with_conn(|c| {
                c.execute(
                    "INSERT INTO ledger_entries (id, session_id, timestamp, kind, entry_json) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        entry.id.as_str(),
                        entry.session_id.as_ref().map(|s| s.as_str().to_string()),
                        entry.timestamp.to_rfc3339(),
                        kind,
                        entry_json,
                    ],
                )
            })?;
            Ok(())
        })
        .await
    }

    async fn get_session_entries(&self, session_id: &str) -> Result<Vec<LedgerEntry>, StorageError> {
        let session_id = session_id.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                let mut stmt = c.prepare(
                    "SELECT entry_json FROM ledger_entries WHERE session_id = ?1 ORDER BY timestamp ASC",
                )?;
                let rows = stmt.query_map(params![session_id], |row| row.get::<_, String>(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })?
            .into_iter()
            .map(|raw| from_json(&raw))
            .collect()
        })
        .await
    }

    // -- State blobs ---------------------------------------------------------------
    async fn set_state(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let key = key.to_string();
        self.blocking(move |conn| {
            let value_json = to_json(&value)?;
            conn.with_conn(|c| {
                c.execute(
                    "INSERT INTO state_blobs (key, value_json) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
                    params![key, value_json],
                )
            })?;
            Ok(())
        })
        .await
    }

    async fn get_state(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let key = key.to_string();
        self.blocking(move |conn| {
            conn.with_conn(|c| {
                c.query_row("SELECT value_json FROM state_blobs WHERE key = ?1", params![key], |row| {
                    row.get::<_, String>(0)
                })
                .optional()
            })?
            .map(|raw| from_json(&raw))
            .transpose()
        })
        .await
    }

    // -- Maintenance -----------------------------------------------------------------
    async fn vacuum(&self) -> Result<(), StorageError> {
        self.blocking(|conn| conn.vacuum()).await
    }
}

fn row_to_file(row: &rusqlite::Row<'_>) -> rusqlite::Result<File> {
    let last_modified: String = row.get(3)?;
    let last_indexed: String = row.get(4)?;
    let category: String = row.get(5)?;
    let role: String = row.get(6)?;
    let imports: String = row.get(8)?;
    let exported_symbols: String = row.get(9)?;
    Ok(File {
        path: row.get(0)?,
        checksum: row.get(1)?,
        size_bytes: row.get::<_, i64>(2)? as u64,
        last_modified: parse_rfc3339(&last_modified)?,
        last_indexed: parse_rfc3339(&last_indexed)?,
        category: parse_category(&category),
        role: parse_role(&role),
        language: row.get(7)?,
        imports: serde_json::from_str(&imports).unwrap_or_default(),
        exported_symbols: serde_json::from_str(&exported_symbols).unwrap_or_default(),
    })
}

fn row_to_function(row: &rusqlite::Row<'_>) -> rusqlite::Result<Function> {
    Ok(Function {
        id: row.get::<_, String>(0)?.into(),
        signature: row.get(1)?,
        purpose: row.get(2)?,
        confidence: row.get(3)?,
        access_count: row.get::<_, i64>(4)? as u64,
        outcomes: librarian_core::model::OutcomeCounters {
            successes: row.get::<_, i64>(5)? as u64,
            failures: row.get::<_, i64>(6)? as u64,
        },
        file_path: row.get(7)?,
    })
}

fn row_to_module(row: &rusqlite::Row<'_>) -> rusqlite::Result<Module> {
    Ok(Module {
        id: row.get::<_, String>(0)?.into(),
        name: row.get(1)?,
        purpose: row.get(2)?,
        confidence: row.get(3)?,
        access_count: row.get::<_, i64>(4)? as u64,
        outcomes: librarian_core::model::OutcomeCounters {
            successes: row.get::<_, i64>(5)? as u64,
            failures: row.get::<_, i64>(6)? as u64,
        },
        file_path: row.get(7)?,
    })
}

fn parse_rfc3339(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

fn parse_category(raw: &str) -> librarian_core::model::FileCategory {
    use librarian_core::model::FileCategory::*;
    match raw {
        "Dependency" => Dependency,
        "Generated" => Generated,
        "Test" => Test,
        "Vendor" => Vendor,
        _ => Project,
    }
}

fn parse_role(raw: &str) -> librarian_core::model::FileRole {
    use librarian_core::model::FileRole::*;
    match raw {
        "Test" => Test,
        "Config" => Config,
        "Documentation" => Documentation,
        "Build" => Build,
        _ => Source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use librarian_core::ids::{ClaimId, FunctionId, PackId};
    use librarian_core::model::{
        AggregationMethod, ClaimSource, ClaimSourceType, ClaimStatus, ClaimSubject, ClaimSubjectType,
        ConfidenceComponents, FileCategory, FileRole, PackData,
    };

    fn sample_file(path: &str) -> File {
        File {
            path: path.to_string(),
            checksum: "abc0000000000000".to_string(),
            size_bytes: 42,
            last_modified: Utc::now(),
            last_indexed: Utc::now(),
            category: FileCategory::Project,
            role: FileRole::Source,
            language: Some("rust".to_string()),
            imports: vec!["std::fmt".to_string()],
            exported_symbols: vec!["run".to_string()],
        }
    }

    #[tokio::test]
    async fn file_round_trips_through_upsert_and_get() {
        let store = SqliteStore::open_in_memory().unwrap();
        let file = sample_file("src/lib.rs");
        store.upsert_file(file.clone()).await.unwrap();
        let fetched = store.get_file("src/lib.rs").await.unwrap().unwrap();
        assert_eq!(fetched.checksum, file.checksum);
        assert_eq!(fetched.imports, file.imports);
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_unchanged_checksum() {
        let store = SqliteStore::open_in_memory().unwrap();
        let file = sample_file("src/main.rs");
        store.upsert_file(file.clone()).await.unwrap();
        store.upsert_file(file.clone()).await.unwrap();
        let all = store.get_files().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_checksum_is_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.get_file_checksum("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn pack_invalidation_is_soft_and_filterable() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut pack = ContextPack::new(
            PackId::generate(),
            PackData::Function {
                function_id: FunctionId::generate(),
                signature: "fn run()".to_string(),
            },
            "summary",
        );
        pack.related_files.push("src/lib.rs".to_string());
        store.upsert_pack(pack.clone()).await.unwrap();

        let invalidated = store.invalidate_context_packs("src/lib.rs").await.unwrap();
        assert_eq!(invalidated, 1);

        let visible = store
            .query_packs(PackQuery {
                include_invalidated: false,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(visible.is_empty());

        let all = store
            .query_packs(PackQuery {
                include_invalidated: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].invalidated);
    }

    #[tokio::test]
    async fn claim_query_filters_by_status() {
        let store = SqliteStore::open_in_memory().unwrap();
        let claim = Claim {
            id: ClaimId::generate(),
            proposition: "widget() is pure".to_string(),
            claim_type: "purity".to_string(),
            subject: ClaimSubject {
                subject_type: ClaimSubjectType::Function,
                id: "fn-1".to_string(),
                name: "widget".to_string(),
                location: None,
            },
            source: ClaimSource {
                source_type: ClaimSourceType::Retrieval,
                id: "src-1".to_string(),
                version: None,
                trace_id: None,
            },
            status: ClaimStatus::Active,
            confidence: ConfidenceComponents::new(0.8, 0.8, 0.8, 0.8, 0.8, AggregationMethod::GeometricMean),
            schema_version: 1,
            created_at: Utc::now(),
        };
        store.upsert_claim(claim.clone()).await.unwrap();

        let active = store
            .query_claims(ClaimQuery {
                status: Some("Active".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(active.len(), 1);

        let retracted = store
            .query_claims(ClaimQuery {
                status: Some("Retracted".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(retracted.is_empty());
    }

    #[tokio::test]
    async fn state_blob_round_trips() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set_state("librarian.watch_state.v1", serde_json::json!({"cursor": 7})).await.unwrap();
        let value = store.get_state("librarian.watch_state.v1").await.unwrap().unwrap();
        assert_eq!(value["cursor"], 7);
    }

    #[tokio::test]
    async fn evidence_graph_meta_defaults_when_absent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let meta = store.get_evidence_graph_meta("ws-1").await.unwrap();
        assert_eq!(meta.claim_count, 0);
        assert_eq!(meta.health(), 1.0);
    }

    #[tokio::test]
    async fn vacuum_does_not_error_on_empty_database() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.vacuum().await.unwrap();
    }
}
