//! Evidence graph operations: claim/defeater/contradiction CRUD plus the traversal and
//! whole-graph operations named in spec §4.4. Traversal walks storage directly rather
//! than materializing the whole graph, so `traverse_from`/`find_path` stay cheap on a
//! large evidence base; `get_full_graph` is the one operation that pulls everything into
//! memory (as a [`petgraph::graphmap::DiGraphMap`]) to recompute graph-wide health.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use librarian_core::error::StorageError;
use librarian_core::model::{Claim, Contradiction, Defeater, EvidenceGraphMeta};
use librarian_storage::{ClaimQuery, Storage};
use petgraph::graphmap::DiGraphMap;

/// Materialized view of the full evidence graph for one workspace.
pub struct FullGraph {
    pub claims: Vec<Claim>,
    pub edges: Vec<(String, String, String)>,
    pub meta: EvidenceGraphMeta,
}

pub struct EvidenceGraph {
    storage: Arc<dyn Storage>,
}

impl EvidenceGraph {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn upsert_claim(&self, claim: Claim) -> Result<(), StorageError> {
        self.storage.upsert_claim(claim).await
    }

    pub async fn get_claim(&self, id: &str) -> Result<Option<Claim>, StorageError> {
        self.storage.get_claim(id).await
    }

    pub async fn delete_claim(&self, id: &str) -> Result<(), StorageError> {
        self.storage.delete_claim(id).await
    }

    pub async fn link(&self, source_id: &str, target_id: &str, edge_type: &str) -> Result<(), StorageError> {
        self.storage.upsert_evidence_edge(source_id, target_id, edge_type).await
    }

    pub async fn upsert_defeater(&self, defeater: Defeater) -> Result<(), StorageError> {
        self.storage.upsert_defeater(defeater).await
    }

    pub async fn defeaters_for_claim(&self, claim_id: &str) -> Result<Vec<Defeater>, StorageError> {
        self.storage.get_defeaters_for_claim(claim_id).await
    }

    pub async fn upsert_contradiction(&self, contradiction: Contradiction) -> Result<(), StorageError> {
        self.storage.upsert_contradiction(contradiction).await
    }

    pub async fn unresolved_contradictions(&self) -> Result<Vec<Contradiction>, StorageError> {
        self.storage.get_unresolved_contradictions().await
    }

    /// BFS from `claim_id`, returning every claim ID reached within `max_depth` hops
    /// along evidence edges (support/warrant/conflict chains).
    pub async fn traverse_from(&self, claim_id: &str, max_depth: usize) -> Result<HashSet<String>, StorageError> {
        let mut visited = HashSet::new();
        visited.insert(claim_id.to_string());
        let mut frontier = VecDeque::new();
        frontier.push_back((claim_id.to_string(), 0usize));

        while let Some((current, depth)) = frontier.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let edges = self.storage.get_evidence_edges_from(&current).await?;
            for (target, _edge_type) in edges {
                if visited.insert(target.clone()) {
                    frontier.push_back((target, depth + 1));
                }
            }
        }
        Ok(visited)
    }

    /// Shortest path by edge count between two claims, `None` if unreachable.
    pub async fn find_path(&self, from: &str, to: &str) -> Result<Option<Vec<String>>, StorageError> {
        if from == to {
            return Ok(Some(vec![from.to_string()]));
        }
        let mut predecessor: HashMap<String, String> = HashMap::new();
        let mut visited = HashSet::new();
        visited.insert(from.to_string());
        let mut frontier = VecDeque::new();
        frontier.push_back(from.to_string());

        while let Some(current) = frontier.pop_front() {
            let edges = self.storage.get_evidence_edges_from(&current).await?;
            for (target, _edge_type) in edges {
                if visited.insert(target.clone()) {
                    predecessor.insert(target.clone(), current.clone());
                    if target == to {
                        return Ok(Some(reconstruct_path(&predecessor, from, to)));
                    }
                    frontier.push_back(target);
                }
            }
        }
        Ok(None)
    }

    /// Materialize the full graph for `workspace`, recomputing and persisting its
    /// health meta (spec §4.4 "Health").
    pub async fn get_full_graph(&self, workspace: &str) -> Result<FullGraph, StorageError> {
        let claims = self
            .storage
            .query_claims(ClaimQuery {
                page: librarian_storage::Page {
                    limit: usize::MAX / 2,
                    offset: 0,
                },
                ..Default::default()
            })
            .await?;

        let mut graph: DiGraphMap<&str, &str> = DiGraphMap::new();
        let mut edges = Vec::new();
        for claim in &claims {
            graph.add_node(claim.id.as_str());
            let out_edges = self.storage.get_evidence_edges_from(claim.id.as_str()).await?;
            for (target, edge_type) in out_edges {
                edges.push((claim.id.as_str().to_string(), target, edge_type));
            }
        }

        let active_defeaters = {
            let mut count = 0u64;
            for claim in &claims {
                let defeaters = self.storage.get_defeaters_for_claim(claim.id.as_str()).await?;
                count += defeaters
                    .iter()
                    .filter(|d| d.status == librarian_core::model::DefeaterStatus::Active)
                    .count() as u64;
            }
            count
        };
        let unresolved = self.storage.get_unresolved_contradictions().await?.len() as u64;

        let meta = EvidenceGraphMeta {
            workspace: workspace.to_string(),
            claim_count: claims.len() as u64,
            active_defeater_count: active_defeaters,
            unresolved_contradiction_count: unresolved,
        };
        self.storage.set_evidence_graph_meta(meta).await?;

        Ok(FullGraph { claims, edges, meta })
    }

    /// Upsert every claim and edge in one pass. The storage trait exposes per-entity
    /// upserts rather than a single cross-table transaction, so "transactionally" here
    /// means sequential, retriable upserts rather than one SQL transaction (see
    /// DESIGN.md) — acceptable because every upsert is independently idempotent.
    pub async fn save_full_graph(
        &self,
        claims: Vec<Claim>,
        edges: Vec<(String, String, String)>,
    ) -> Result<(), StorageError> {
        for claim in claims {
            self.storage.upsert_claim(claim).await?;
        }
        for (source, target, edge_type) in edges {
            self.storage.upsert_evidence_edge(&source, &target, &edge_type).await?;
        }
        Ok(())
    }
}

fn reconstruct_path(predecessor: &HashMap<String, String>, from: &str, to: &str) -> Vec<String> {
    let mut path = vec![to.to_string()];
    let mut current = to.to_string();
    while current != from {
        let prev = predecessor.get(&current).expect("predecessor chain is complete by construction");
        path.push(prev.clone());
        current = prev.clone();
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use librarian_core::ids::ClaimId;
    use librarian_core::model::{
        AggregationMethod, ClaimSource, ClaimSourceType, ClaimStatus, ClaimSubject, ClaimSubjectType,
        ConfidenceComponents,
    };
    use librarian_storage::SqliteStore;

    fn sample_claim(id: &str) -> Claim {
        Claim {
            id: ClaimId::new(id),
            proposition: format!("proposition for {id}"),
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
            created_at: chrono::Utc::now(),
        }
    }

    async fn graph() -> EvidenceGraph {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        EvidenceGraph::new(store)
    }

    #[tokio::test]
    async fn traverse_from_follows_a_chain() {
        let g = graph().await;
        for id in ["a", "b", "c"] {
            g.upsert_claim(sample_claim(id)).await.unwrap();
        }
        g.link("a", "b", "supports").await.unwrap();
        g.link("b", "c", "supports").await.unwrap();

        let reached = g.traverse_from("a", 10).await.unwrap();
        assert!(reached.contains("a") && reached.contains("b") && reached.contains("c"));

        let shallow = g.traverse_from("a", 1).await.unwrap();
        assert!(shallow.contains("b") && !shallow.contains("c"));
    }

    #[tokio::test]
    async fn find_path_returns_shortest_chain() {
        let g = graph().await;
        for id in ["a", "b", "c", "d"] {
            g.upsert_claim(sample_claim(id)).await.unwrap();
        }
        g.link("a", "b", "supports").await.unwrap();
        g.link("b", "c", "supports").await.unwrap();
        g.link("a", "d", "supports").await.unwrap();
        g.link("d", "c", "supports").await.unwrap();

        let path = g.find_path("a", "c").await.unwrap().unwrap();
        assert_eq!(path.first().unwrap(), "a");
        assert_eq!(path.last().unwrap(), "c");
        assert_eq!(path.len(), 3);
    }

    #[tokio::test]
    async fn find_path_is_none_when_unreachable() {
        let g = graph().await;
        for id in ["a", "b"] {
            g.upsert_claim(sample_claim(id)).await.unwrap();
        }
        assert!(g.find_path("a", "b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn full_graph_recomputes_health_meta() {
        let g = graph().await;
        g.upsert_claim(sample_claim("a")).await.unwrap();
        let full = g.get_full_graph("ws").await.unwrap();
        assert_eq!(full.meta.claim_count, 1);
        assert_eq!(full.meta.health(), 1.0);
    }
}
