//! Citation validation (spec §4.6 step 7): a synthesis answer may only cite pack IDs
//! that were actually assembled into the response. Unknown references are dropped, not
//! invented around — the model doesn't get to assert evidence that doesn't exist.

use std::collections::HashSet;

use librarian_core::ids::PackId;

/// Drop citations that don't name an assembled pack, returning the filtered list and
/// how many were dropped (callers surface the drop count as a disclosure if non-zero).
pub fn validate_citations(citations: &[String], assembled_pack_ids: &[PackId]) -> (Vec<String>, usize) {
    let known: HashSet<&str> = assembled_pack_ids.iter().map(PackId::as_str).collect();
    let mut kept = Vec::new();
    let mut dropped = 0;
    for citation in citations {
        if known.contains(citation.as_str()) {
            kept.push(citation.clone());
        } else {
            dropped += 1;
        }
    }
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_citations_that_name_an_assembled_pack() {
        let ids = vec![PackId::new("pack-a"), PackId::new("pack-b")];
        let (kept, dropped) = validate_citations(&["pack-a".to_string()], &ids);
        assert_eq!(kept, vec!["pack-a".to_string()]);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn drops_unknown_citations_instead_of_keeping_them() {
        let ids = vec![PackId::new("pack-a")];
        let (kept, dropped) = validate_citations(&["pack-a".to_string(), "pack-ghost".to_string()], &ids);
        assert_eq!(kept, vec!["pack-a".to_string()]);
        assert_eq!(dropped, 1);
    }
}
