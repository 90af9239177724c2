//! `tracing-subscriber` initialization. Plain-text by default; JSON when the
//! environment favors machine-readable logs (e.g. running under a log aggregator).

use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub json: bool,
    pub env_filter: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            json: false,
            env_filter: "info".to_string(),
        }
    }
}

impl TracingConfig {
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = filter.into();
        self
    }
}

/// Install a global `tracing` subscriber. Safe to call more than once in tests; later
/// calls are no-ops if a subscriber is already installed.
pub fn init_tracing(config: TracingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.env_filter.clone()));

    let result = if config.json {
        fmt().json().with_env_filter(filter).try_init()
    } else {
        fmt().with_env_filter(filter).try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already initialized, skipping");
    }
}
