//! Workspace configuration, loaded from TOML with `Default` impls matching the numeric
//! defaults named throughout the component design (spec §4.2–§4.8).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StalenessConfig {
    pub open_file_sla_ms: u64,
    pub dependency_sla_ms: u64,
    pub project_file_sla_ms: u64,
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self {
            open_file_sla_ms: 1_000,
            dependency_sla_ms: 60 * 60 * 1_000,
            project_file_sla_ms: 5 * 60 * 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub debounce_ms: u64,
    pub batch_window_ms: u64,
    pub storm_threshold: usize,
    pub cascade_delay_ms: u64,
    pub cascade_batch_size: usize,
    pub cascade_enabled: bool,
    pub max_file_size_bytes: u64,
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            batch_window_ms: 1_000,
            storm_threshold: 200,
            cascade_delay_ms: 2_000,
            cascade_batch_size: 50,
            cascade_enabled: true,
            max_file_size_bytes: 5 * 1024 * 1024,
            include_globs: vec!["**/*".to_string()],
            exclude_globs: vec![
                "**/node_modules/**".to_string(),
                "**/.git/**".to_string(),
                "**/target/**".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalWeights {
    pub multi_vector: f64,
    pub semantic: f64,
    pub keyword: f64,
    pub co_change: f64,
    pub adversarial_penalty: f64,
    pub rerank_top_k: usize,
    pub return_top_k: usize,
    pub min_score: f64,
    pub co_change_max_boost: f64,
    pub co_change_min_support: u32,
}

impl Default for RetrievalWeights {
    fn default() -> Self {
        Self {
            multi_vector: 0.4,
            semantic: 0.3,
            keyword: 0.2,
            co_change: 0.1,
            adversarial_penalty: 0.7,
            rerank_top_k: 50,
            return_top_k: 10,
            min_score: 0.1,
            co_change_max_boost: 0.3,
            co_change_min_support: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorBudgets {
    pub max_cpu_time_ms: u64,
    pub max_tokens: u64,
    pub max_embeddings_per_batch: usize,
    pub max_concurrent_batches: usize,
}

impl Default for GovernorBudgets {
    fn default() -> Self {
        Self {
            max_cpu_time_ms: 60_000,
            max_tokens: 200_000,
            max_embeddings_per_batch: 64,
            max_concurrent_batches: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,
    pub norm_tolerance: f64,
    pub auto_normalize: bool,
    pub configured_batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 200,
            backoff_multiplier: 2.0,
            max_delay_ms: 5_000,
            jitter_factor: 0.2,
            norm_tolerance: 1e-3,
            auto_normalize: true,
            configured_batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub burst_capacity: u32,
    pub sustained_per_minute: u32,
    pub hourly_capacity: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            burst_capacity: 20,
            sustained_per_minute: 120,
            hourly_capacity: 2_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub failure_window_ms: u64,
    pub open_duration_ms: u64,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window_ms: 30_000,
            open_duration_ms: 15_000,
            success_threshold: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarianConfig {
    pub workspace_root: String,
    pub staleness: StalenessConfig,
    pub watcher: WatcherConfig,
    pub retrieval: RetrievalWeights,
    pub governor: GovernorBudgets,
    pub embedding: EmbeddingConfig,
    pub rate_limit: RateLimitConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub embedding_model_id: String,
    pub embedding_dimension: usize,
    pub journal_wal: bool,
}

impl Default for LibrarianConfig {
    fn default() -> Self {
        Self {
            workspace_root: ".".to_string(),
            staleness: StalenessConfig::default(),
            watcher: WatcherConfig::default(),
            retrieval: RetrievalWeights::default(),
            governor: GovernorBudgets::default(),
            embedding: EmbeddingConfig::default(),
            rate_limit: RateLimitConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            embedding_model_id: "all-MiniLM-L6-v2".to_string(),
            embedding_dimension: 384,
            journal_wal: true,
        }
    }
}

impl LibrarianConfig {
    /// Parse a TOML document, layering it over [`Default::default`] so partial configs
    /// only need to specify the fields they override.
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_named_spec_constants() {
        let cfg = LibrarianConfig::default();
        assert_eq!(cfg.staleness.open_file_sla_ms, 1_000);
        assert_eq!(cfg.staleness.dependency_sla_ms, 3_600_000);
        assert_eq!(cfg.staleness.project_file_sla_ms, 300_000);
        assert_eq!(cfg.embedding_dimension, 384);
    }

    #[test]
    fn partial_toml_overrides_layer_over_defaults() {
        let cfg: LibrarianConfig = toml::from_str(
            r#"
            workspace_root = "/repo"

            [staleness]
            open_file_sla_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(cfg.workspace_root, "/repo");
        assert_eq!(cfg.staleness.open_file_sla_ms, 500);
        // untouched fields keep their defaults
        assert_eq!(cfg.staleness.project_file_sla_ms, 300_000);
        assert_eq!(cfg.retrieval.multi_vector, 0.4);
    }
}
