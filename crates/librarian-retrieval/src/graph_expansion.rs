//! Knowledge-graph BFS expansion (spec §4.3 "Graph expansion"), shared by retrieval's
//! candidate widening and the adversarial-penalty's structural-distance check.

use std::collections::{HashSet, VecDeque};

use librarian_core::error::StorageError;
use librarian_core::model::EdgeType;
use librarian_storage::Storage;

/// BFS from `seeds` up to `max_depth` hops, optionally restricted to `edge_types`.
/// Returns every discovered ID including the seeds themselves.
pub async fn bfs_expand(
    storage: &dyn Storage,
    seeds: &[String],
    max_depth: usize,
    edge_types: Option<&HashSet<EdgeType>>,
) -> Result<HashSet<String>, StorageError> {
    let mut discovered: HashSet<String> = seeds.iter().cloned().collect();
    let mut frontier: Vec<String> = seeds.to_vec();

    for _ in 0..max_depth {
        let mut next = Vec::new();
        for id in &frontier {
            let mut neighbors = storage.get_knowledge_edges_from(id).await?;
            neighbors.extend(storage.get_knowledge_edges_to(id).await?);
            for edge in neighbors {
                if let Some(types) = edge_types {
                    if !types.contains(&edge.edge_type) {
                        continue;
                    }
                }
                let other = if edge.source_id == *id { edge.target_id } else { edge.source_id };
                if discovered.insert(other.clone()) {
                    next.push(other);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    Ok(discovered)
}

/// Shortest hop-count between `from` and `to`, capped at `max_depth` (used by the
/// adversarial penalty to decide whether a high-scoring candidate is structurally
/// reachable from the query's seed files).
pub async fn graph_distance(
    storage: &dyn Storage,
    from: &str,
    to: &str,
    max_depth: usize,
) -> Result<Option<usize>, StorageError> {
    if from == to {
        return Ok(Some(0));
    }
    let mut visited: HashSet<String> = HashSet::from([from.to_string()]);
    let mut queue: VecDeque<(String, usize)> = VecDeque::from([(from.to_string(), 0)]);

    while let Some((id, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        let mut neighbors = storage.get_knowledge_edges_from(&id).await?;
        neighbors.extend(storage.get_knowledge_edges_to(&id).await?);
        for edge in neighbors {
            let other = if edge.source_id == id { edge.target_id } else { edge.source_id };
            if other == to {
                return Ok(Some(depth + 1));
            }
            if visited.insert(other.clone()) {
                queue.push_back((other, depth + 1));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use librarian_storage::SqliteStore;

    #[tokio::test]
    async fn bfs_expand_includes_seeds_when_no_edges_exist() {
        let storage = SqliteStore::open_in_memory().expect("open in-memory store");
        let discovered = bfs_expand(&storage, &["a".to_string()], 2, None).await.unwrap();
        assert!(discovered.contains("a"));
        assert_eq!(discovered.len(), 1);
    }

    #[tokio::test]
    async fn graph_distance_is_none_when_unreachable() {
        let storage = SqliteStore::open_in_memory().expect("open in-memory store");
        let distance = graph_distance(&storage, "a", "z", 3).await.unwrap();
        assert_eq!(distance, None);
    }
}
