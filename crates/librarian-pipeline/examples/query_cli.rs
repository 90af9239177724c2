//! Exercises `Pipeline::execute_query` end to end against an in-memory store, a
//! hashing stand-in embedding provider, and the heuristic cross-encoder/LLM defaults —
//! no external process or network call required.
//!
//! Run with: `cargo run --package librarian-pipeline --example query_cli`

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use librarian_core::config::LibrarianConfig;
use librarian_core::error::ProviderError;
use librarian_core::ids::ClaimId;
use librarian_core::model::{
    content_checksum, AggregationMethod, Claim, ClaimSource, ClaimSourceType, ClaimStatus,
    ClaimSubject, ClaimSubjectType, ConfidenceComponents, File, FileCategory, FileRole,
};
use librarian_core::Governor;
use librarian_embeddings::provider::EmbeddingProvider;
use librarian_embeddings::EmbeddingService;
use librarian_evidence::EvidenceGraph;
use librarian_indexer::StalenessTracker;
use librarian_pipeline::{Capability, CapabilitySet, Depth, EchoLlmProvider, LlmRequirement, Pipeline, QueryRequest};
use librarian_retrieval::{HeuristicCrossEncoder, RetrievalEngine, RetrievalIndex};
use librarian_storage::sqlite_store::SqliteStore;
use librarian_storage::Storage;

const EMBEDDING_DIMENSION: usize = 384;

/// A network-free embedding provider: feature-hashed bag of words, matching the
/// dimension and model ID the workspace config expects, so the example runs with no
/// external process to discover or shell out to.
struct HashingProvider;

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn model_id(&self) -> &str {
        "all-MiniLM-L6-v2"
    }

    fn provider_name(&self) -> &str {
        "hashing-stub"
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }

    fn estimate_tokens(&self, text: &str) -> u32 {
        (text.split_whitespace().count() as u32).max(1)
    }

    async fn embed_raw(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, ProviderError> {
        Ok(texts.iter().map(|t| hash_embed(t)).collect())
    }
}

fn hash_embed(text: &str) -> Vec<f64> {
    let mut v = vec![0.0_f64; EMBEDDING_DIMENSION];
    for term in text.split_whitespace() {
        let mut hash: u64 = 1469598103934665603;
        for byte in term.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(1099511628211);
        }
        v[(hash as usize) % EMBEDDING_DIMENSION] += 1.0;
    }
    v
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    librarian_observability::init_tracing(librarian_observability::TracingConfig::default());

    let storage: Arc<dyn Storage> = Arc::new(SqliteStore::open_in_memory()?);
    let config = LibrarianConfig::default();

    // Seed a file and a claim about it, mirroring what the indexer would have done on
    // a real walk.
    let source = "fn resolve_imports(path: &Path) -> Vec<Import> { /* ... */ }";
    let checksum = content_checksum(source.as_bytes());
    let file = File {
        path: "/workspace/src/resolver.rs".to_string(),
        checksum: checksum.clone(),
        size_bytes: source.len() as u64,
        last_modified: Utc::now(),
        last_indexed: Utc::now(),
        category: FileCategory::Project,
        role: FileRole::Source,
        language: Some("rust".to_string()),
        imports: Vec::new(),
        exported_symbols: vec!["resolve_imports".to_string()],
    };
    storage.upsert_file(file.clone()).await?;

    let claim = Claim {
        id: ClaimId::generate(),
        proposition: "resolve_imports walks a file's use/import statements and returns their targets".to_string(),
        claim_type: "behavior".to_string(),
        subject: ClaimSubject {
            subject_type: ClaimSubjectType::File,
            id: file.path.clone(),
            name: "resolve_imports".to_string(),
            location: Some(file.path.clone()),
        },
        source: ClaimSource {
            source_type: ClaimSourceType::Indexer,
            id: "example-indexer-run".to_string(),
            version: None,
            trace_id: None,
        },
        status: ClaimStatus::Active,
        confidence: ConfidenceComponents::new(0.8, 0.7, 0.75, 0.5, 0.9, AggregationMethod::GeometricMean),
        schema_version: 1,
        created_at: Utc::now(),
    };
    let evidence = EvidenceGraph::new(Arc::clone(&storage));
    evidence.upsert_claim(claim.clone()).await?;
    evidence.link(&file.path, claim.id.as_str(), "supports").await?;

    // Index the same file into the retrieval engine so a query can find it.
    let embeddings = Arc::new(EmbeddingService::new(Arc::new(HashingProvider), config.embedding.clone()));
    let governor = Governor::new(config.governor.clone());
    let index = Arc::new(RetrievalIndex::new(Arc::clone(&storage)));
    index
        .index_file(&embeddings, &governor, &file, "resolve_imports import resolution for a source file")
        .await?;

    let retrieval = Arc::new(RetrievalEngine::new(
        Arc::clone(&storage),
        Arc::clone(&index),
        Arc::new(HeuristicCrossEncoder),
    ));

    let staleness = Arc::new(StalenessTracker::new(config.staleness.clone()));
    staleness.mark_indexed(&file.path, Utc::now());

    let capabilities = CapabilitySet::new()
        .with(Capability::StorageSqlite)
        .with(Capability::EmbeddingProvider)
        .with(Capability::CrossEncoder);

    let pipeline = Pipeline::new(
        storage,
        retrieval,
        embeddings,
        evidence,
        staleness,
        Arc::new(EchoLlmProvider),
        capabilities,
        config,
    );

    let mut request = QueryRequest::new("how does this codebase resolve imports?", Depth::L1);
    request.llm_requirement = LlmRequirement::Optional;
    request.affected_files = vec![file.path.clone()];

    let response = pipeline
        .execute_query(request, Some("example-session-1".to_string()))
        .await?;

    println!("traceId: {}", response.trace_id);
    println!("packs returned: {}", response.packs.len());
    for pack in &response.packs {
        println!("  - {} (confidence {:.2}): {}", pack.id.as_str(), pack.confidence, pack.summary);
    }
    if let Some(synthesis) = &response.synthesis {
        println!("synthesis answer: {}", synthesis.answer);
        println!("synthesis confidence: {:.2}", synthesis.confidence);
    }
    println!("adequacy blocking: {}", response.adequacy.map(|a| a.blocking).unwrap_or(false));
    for disclosure in &response.disclosures {
        println!("disclosure: {disclosure}");
    }

    Ok(())
}
