//! Ties query expansion, scoring, co-change boosting, graph expansion, and
//! cross-encoder rerank into the `query()` contract (spec §4.3 "Query scoring").

use std::sync::Arc;

use librarian_core::config::RetrievalWeights;
use librarian_core::error::{LibrarianError, ValidationError};
use librarian_core::Governor;
use librarian_embeddings::{EmbeddingRequest, EmbeddingService};
use librarian_storage::Storage;

use crate::cochange::CoChangeMatrix;
use crate::cross_encoder::CrossEncoder;
use crate::graph_expansion::{bfs_expand, graph_distance};
use crate::index::{lexical_vector, FacetWeights, RetrievalIndex};
use crate::query_expansion::expand_query;
use crate::scoring::{adversarial_penalty, combined_score, keyword_score, multi_vector_score};
use crate::vector_math::cosine_similarity;

#[derive(Debug, Clone)]
pub struct ScoredResult {
    pub path: String,
    pub score: f64,
    pub matched_aspects: usize,
}

pub struct RetrievalEngine {
    storage: Arc<dyn Storage>,
    index: Arc<RetrievalIndex>,
    cross_encoder: Arc<dyn CrossEncoder>,
    facet_weights: FacetWeights,
}

impl RetrievalEngine {
    pub fn new(storage: Arc<dyn Storage>, index: Arc<RetrievalIndex>, cross_encoder: Arc<dyn CrossEncoder>) -> Self {
        Self {
            storage,
            index,
            cross_encoder,
            facet_weights: FacetWeights::default(),
        }
    }

    /// Run the full query-scoring pipeline and return the top `weights.return_top_k`
    /// candidates at or above `weights.min_score`.
    ///
    /// `seeds` are the knowledge-graph IDs used both to widen the candidate set (graph
    /// expansion) and as the reference points for the adversarial penalty's structural
    /// distance check.
    pub async fn query(
        &self,
        embeddings: &EmbeddingService,
        governor: &Governor,
        query_text: &str,
        seeds: &[String],
        cochange: &CoChangeMatrix,
        weights: &RetrievalWeights,
    ) -> Result<Vec<ScoredResult>, LibrarianError> {
        let expanded_terms = expand_query(query_text);
        let expanded_text = expanded_terms.join(" ");

        let query_embedding = embeddings
            .embed(governor, vec![EmbeddingRequest::new(expanded_text)])
            .await?;
        let query_vector = &query_embedding[0].vector;

        let expected_dimension = query_vector.len();
        let query_lexical = lexical_vector(&expanded_terms);

        let expanded_seeds = bfs_expand(self.storage.as_ref(), seeds, weights.rerank_top_k.min(5), None).await?;

        let candidates = self.index.all_cached();
        if candidates
            .iter()
            .any(|c| !c.semantic_vector.is_empty() && c.semantic_vector.len() != expected_dimension)
        {
            return Err(LibrarianError::Validation(ValidationError::new(
                "indexed file embedding dimension does not match the query embedding model",
            )));
        }

        let top_k_paths: Vec<String> = candidates.iter().map(|c| c.path.clone()).collect();

        let mut scored: Vec<(ScoredResult, f64)> = Vec::new();
        for candidate in &candidates {
            let (multi_vector, matched_aspects) = multi_vector_score(query_vector, &query_lexical, candidate, &self.facet_weights);
            let semantic = cosine_similarity(query_vector, &candidate.semantic_vector);
            let keyword = keyword_score(&expanded_terms, &candidate.identifiers);
            let co_change_boost = cochange.boost(
                &candidate.path,
                &top_k_paths,
                weights.co_change,
                weights.co_change_max_boost,
                weights.co_change_min_support,
            );

            let mut nearest_distance = None;
            for seed in &expanded_seeds {
                if let Some(d) = graph_distance(self.storage.as_ref(), seed, &candidate.path, 4).await? {
                    nearest_distance = Some(nearest_distance.map_or(d, |best: usize| best.min(d)));
                }
            }
            let penalty = adversarial_penalty(semantic, nearest_distance, 4, weights.adversarial_penalty);

            let score = combined_score(multi_vector, semantic, keyword, co_change_boost, penalty, weights);
            scored.push((
                ScoredResult {
                    path: candidate.path.clone(),
                    score,
                    matched_aspects,
                },
                semantic,
            ));
        }

        scored.sort_by(|a, b| b.0.score.partial_cmp(&a.0.score).unwrap_or(std::cmp::Ordering::Equal).then(b.0.matched_aspects.cmp(&a.0.matched_aspects)));
        let rerank_pool: Vec<ScoredResult> = scored.into_iter().map(|(r, _)| r).take(weights.rerank_top_k).collect();

        let reranked = self.rerank(query_text, rerank_pool).await?;

        Ok(reranked
            .into_iter()
            .filter(|r| r.score >= weights.min_score)
            .take(weights.return_top_k)
            .collect())
    }

    async fn rerank(&self, query_text: &str, candidates: Vec<ScoredResult>) -> Result<Vec<ScoredResult>, LibrarianError> {
        if candidates.is_empty() {
            return Ok(candidates);
        }
        let pairs: Vec<(String, String)> = candidates.iter().map(|c| (query_text.to_string(), c.path.clone())).collect();
        let cross_scores = self.cross_encoder.score(&pairs).await?;

        let mut hybrid: Vec<(ScoredResult, f64)> = candidates
            .into_iter()
            .enumerate()
            .map(|(rank, candidate)| {
                let rank_score = 1.0 - (rank as f64 / pairs.len().max(1) as f64);
                let cross_score = cross_scores.get(rank).copied().unwrap_or(0.0) as f64;
                let hybrid_score = 0.5 * candidate.score + 0.3 * cross_score + 0.2 * rank_score;
                (candidate, hybrid_score)
            })
            .collect();

        hybrid.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(hybrid
            .into_iter()
            .map(|(mut r, hybrid_score)| {
                r.score = hybrid_score;
                r
            })
            .collect())
    }
}
