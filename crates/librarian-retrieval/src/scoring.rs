//! Per-candidate scoring (spec §4.3 steps 3–4).

use librarian_core::config::RetrievalWeights;

use crate::index::{FacetWeights, IndexedFile};
use crate::vector_math::cosine_similarity;

/// `multiVectorScore`, weighted per facet. Returns `(score, matched_aspect_count)` so
/// callers can tie-break on the number of facets that cleared a relevance floor, per
/// spec §4.3 step 3.
pub fn multi_vector_score(
    query_semantic: &[f64],
    query_lexical: &[f64],
    candidate: &IndexedFile,
    weights: &FacetWeights,
) -> (f64, usize) {
    const RELEVANCE_FLOOR: f64 = 0.1;
    let semantic = cosine_similarity(query_semantic, &candidate.facets.semantic);
    let lexical = cosine_similarity(query_lexical, &candidate.facets.lexical);
    let purpose = cosine_similarity(query_semantic, &candidate.facets.purpose);

    let matched = [semantic, lexical, purpose].iter().filter(|s| **s > RELEVANCE_FLOOR).count();
    let score = weights.semantic * semantic + weights.lexical * lexical + weights.purpose * purpose;
    (score, matched)
}

/// Identifier + metadata overlap: the fraction of expanded query terms that appear in
/// the candidate's identifiers.
pub fn keyword_score(query_terms: &[String], candidate_identifiers: &[String]) -> f64 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let haystack: Vec<String> = candidate_identifiers.iter().map(|s| s.to_lowercase()).collect();
    let matches = query_terms
        .iter()
        .filter(|term| haystack.iter().any(|id| id.contains(term.as_str())))
        .count();
    (matches as f64 / query_terms.len() as f64).clamp(0.0, 1.0)
}

/// The adversarial penalty (spec §4.3 step 3): applied when a candidate's semantic
/// score is high but it is structurally unrelated (absent, or farther than
/// `max_depth`, in the dependency graph) — the pattern a coincidentally-similar
/// test/vendor file produces.
pub fn adversarial_penalty(semantic_score: f64, graph_distance: Option<usize>, max_depth: usize, penalty: f64) -> f64 {
    const HIGH_SEMANTIC_THRESHOLD: f64 = 0.6;
    let disconnected = graph_distance.map(|d| d > max_depth).unwrap_or(true);
    if semantic_score > HIGH_SEMANTIC_THRESHOLD && disconnected {
        penalty
    } else {
        1.0
    }
}

/// Combined score = weighted sum of the four signals, scaled by the adversarial
/// penalty (spec §4.3 step 4).
pub fn combined_score(
    multi_vector: f64,
    semantic: f64,
    keyword: f64,
    co_change_boost: f64,
    adversarial_penalty: f64,
    weights: &RetrievalWeights,
) -> f64 {
    let base = weights.multi_vector * multi_vector
        + weights.semantic * semantic
        + weights.keyword * keyword
        + weights.co_change * co_change_boost;
    base * adversarial_penalty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MultiVector;

    fn candidate(semantic: Vec<f64>, lexical: Vec<f64>, purpose: Vec<f64>) -> IndexedFile {
        IndexedFile {
            path: "src/lib.rs".to_string(),
            content_hash: "abc".to_string(),
            semantic_vector: semantic.clone(),
            chunk_vectors: Vec::new(),
            facets: MultiVector { semantic, lexical, purpose },
            identifiers: vec!["get_user".to_string(), "user_id".to_string()],
        }
    }

    #[test]
    fn keyword_score_counts_substring_matches() {
        let score = keyword_score(&["user".to_string(), "missing".to_string()], &["get_user".to_string()]);
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn adversarial_penalty_applies_only_when_semantic_is_high_and_disconnected() {
        assert_eq!(adversarial_penalty(0.9, None, 2, 0.7), 0.7);
        assert_eq!(adversarial_penalty(0.9, Some(1), 2, 0.7), 1.0);
        assert_eq!(adversarial_penalty(0.3, None, 2, 0.7), 1.0);
    }

    #[test]
    fn multi_vector_score_combines_three_facets() {
        let weights = FacetWeights::default();
        let c = candidate(vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]);
        let (score, matched) = multi_vector_score(&[1.0, 0.0], &[1.0, 0.0], &c, &weights);
        assert!((score - 1.0).abs() < 1e-9);
        assert_eq!(matched, 3);
    }
}
