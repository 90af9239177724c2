//! Indexed representation of a file (spec §4.3 "Indexing"): a semantic vector over a
//! compact purpose+identifier string, optional per-chunk vectors, and a multi-vector
//! representation with named facets. Indexed files are cached in memory and persisted
//! through [`Storage::set_state`]/`get_state` under a `retrieval_index:` key prefix —
//! this crate has no dedicated table of its own (see DESIGN.md).

use std::collections::HashMap;
use std::sync::Arc;

use librarian_core::error::LibrarianError;
use librarian_core::model::File;
use librarian_core::Governor;
use librarian_embeddings::{EmbeddingRequest, EmbeddingService};
use librarian_storage::Storage;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Per-facet weights used by `multi_vector_score` (spec §4.3 step 3). Not named as a
/// config knob in §4 — chosen to mirror the combined-score weighting in spirit, with
/// semantic given the largest share. Recorded as an open decision in DESIGN.md.
#[derive(Debug, Clone, Copy)]
pub struct FacetWeights {
    pub semantic: f64,
    pub lexical: f64,
    pub purpose: f64,
}

impl Default for FacetWeights {
    fn default() -> Self {
        Self {
            semantic: 0.5,
            lexical: 0.3,
            purpose: 0.2,
        }
    }
}

/// Width of the hashed bag-of-words lexical facet. Chosen independent of the
/// embedding provider's dimension since the lexical facet is computed locally rather
/// than via the provider (spec §4.3 names "lexical" as a facet but does not require
/// it to share the provider's embedding space).
pub const LEXICAL_VECTOR_DIM: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiVector {
    pub semantic: Vec<f64>,
    pub lexical: Vec<f64>,
    pub purpose: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedFile {
    pub path: String,
    pub content_hash: String,
    pub semantic_vector: Vec<f64>,
    pub chunk_vectors: Vec<Vec<f64>>,
    pub facets: MultiVector,
    pub identifiers: Vec<String>,
}

fn hash_term(term: &str) -> usize {
    let mut hash: u64 = 1469598103934665603;
    for byte in term.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    hash as usize
}

/// Deterministic, provider-free bag-of-words vector, L2-normalized.
pub fn lexical_vector(terms: &[String]) -> Vec<f64> {
    let mut v = vec![0.0_f64; LEXICAL_VECTOR_DIM];
    for term in terms {
        v[hash_term(term) % LEXICAL_VECTOR_DIM] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    v
}

fn state_key(path: &str) -> String {
    format!("retrieval_index:{path}")
}

/// In-memory cache of [`IndexedFile`] rows, backed by [`Storage`] state blobs so the
/// index survives process restarts without a dedicated schema migration.
pub struct RetrievalIndex {
    storage: Arc<dyn Storage>,
    cache: RwLock<HashMap<String, IndexedFile>>,
}

impl RetrievalIndex {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_cached(&self, path: &str) -> Option<IndexedFile> {
        self.cache.read().get(path).cloned()
    }

    pub async fn load(&self, path: &str) -> Result<Option<IndexedFile>, LibrarianError> {
        if let Some(hit) = self.get_cached(path) {
            return Ok(Some(hit));
        }
        if let Some(value) = self.storage.get_state(&state_key(path)).await? {
            let indexed: IndexedFile = serde_json::from_value(value)
                .map_err(|e| LibrarianError::Validation(librarian_core::error::ValidationError::new(e.to_string())))?;
            self.cache.write().insert(path.to_string(), indexed.clone());
            return Ok(Some(indexed));
        }
        Ok(None)
    }

    pub fn all_cached(&self) -> Vec<IndexedFile> {
        self.cache.read().values().cloned().collect()
    }

    /// Index `file`, skipping the embedding calls entirely when `file.checksum`
    /// matches the previously indexed content hash (spec §4.3 "integer content hash to
    /// skip re-embedding" — we reuse the existing 16-hex `File::checksum` rather than a
    /// second integer hash; see DESIGN.md).
    pub async fn index_file(
        &self,
        embeddings: &EmbeddingService,
        governor: &Governor,
        file: &File,
        purpose_text: &str,
    ) -> Result<IndexedFile, LibrarianError> {
        if let Some(existing) = self.load(&file.path).await? {
            if existing.content_hash == file.checksum {
                return Ok(existing);
            }
        }

        let mut identifiers = file.exported_symbols.clone();
        identifiers.extend(file.imports.clone());
        let identifier_text = identifiers.join(" ");
        let combined_text = format!("{purpose_text} {identifier_text}");

        let results = embeddings
            .embed(
                governor,
                vec![
                    EmbeddingRequest::new(combined_text),
                    EmbeddingRequest::new(purpose_text.to_string()),
                ],
            )
            .await?;
        let semantic_vector = results[0].vector.clone();
        let purpose_vector = results[1].vector.clone();
        let lexical = lexical_vector(&identifiers);

        let indexed = IndexedFile {
            path: file.path.clone(),
            content_hash: file.checksum.clone(),
            semantic_vector: semantic_vector.clone(),
            chunk_vectors: Vec::new(),
            facets: MultiVector {
                semantic: semantic_vector,
                lexical,
                purpose: purpose_vector,
            },
            identifiers,
        };

        self.storage
            .set_state(&state_key(&file.path), serde_json::to_value(&indexed).expect("IndexedFile always serializes"))
            .await?;
        self.cache.write().insert(file.path.clone(), indexed.clone());
        Ok(indexed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexical_vector_is_unit_norm_for_nonempty_terms() {
        let v = lexical_vector(&["get".to_string(), "user".to_string(), "id".to_string()]);
        let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn lexical_vector_is_zero_for_no_terms() {
        let v = lexical_vector(&[]);
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
