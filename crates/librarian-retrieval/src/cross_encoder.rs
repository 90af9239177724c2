//! Cross-encoder rerank stage (spec §4.3 step 5): score `(query, document)` pairs
//! directly rather than via two independent embeddings.

use async_trait::async_trait;
use librarian_core::error::ProviderError;

#[async_trait]
pub trait CrossEncoder: Send + Sync {
    async fn score(&self, pairs: &[(String, String)]) -> Result<Vec<f32>, ProviderError>;
}

/// A network-free cross-encoder used when no hosted reranker is configured: term
/// overlap between the query and the document's summary text, weighted toward exact
/// identifier matches. Real deployments plug in an HTTP-backed cross-encoder behind
/// the same trait.
pub struct HeuristicCrossEncoder;

#[async_trait]
impl CrossEncoder for HeuristicCrossEncoder {
    async fn score(&self, pairs: &[(String, String)]) -> Result<Vec<f32>, ProviderError> {
        Ok(pairs
            .iter()
            .map(|(query, doc)| {
                let query_lower = query.to_lowercase();
                let query_words: Vec<&str> = query_lower.split_whitespace().collect();
                if query_words.is_empty() {
                    return 0.0;
                }
                let doc_lower = doc.to_lowercase();
                let matches = query_words.iter().filter(|w| doc_lower.contains(*w)).count();
                matches as f32 / query_words.len() as f32
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn heuristic_encoder_scores_by_term_overlap() {
        let encoder = HeuristicCrossEncoder;
        let pairs = vec![
            ("rust error handling".to_string(), "this module implements rust error handling".to_string()),
            ("rust error handling".to_string(), "python data science utilities".to_string()),
        ];
        let scores = encoder.score(&pairs).await.unwrap();
        assert!(scores[0] > scores[1]);
    }
}
