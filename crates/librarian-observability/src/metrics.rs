//! A thin `prometheus` registry exposing the counters/gauges named in the ambient
//! stack notes: query latency, circuit state, and ledger entry volume. This crate
//! never pushes metrics anywhere — scraping is an external collaborator's job.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};

pub struct LibrarianMetrics {
    pub registry: Registry,
    pub query_latency_ms: Histogram,
    pub ledger_entries_total: IntCounter,
    pub circuit_open_gauge: IntGauge,
}

impl LibrarianMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let query_latency_ms = Histogram::with_opts(HistogramOpts::new(
            "librarian_query_latency_ms",
            "End-to-end executeQuery latency in milliseconds",
        ))?;
        registry.register(Box::new(query_latency_ms.clone()))?;

        let ledger_entries_total = IntCounter::new(
            "librarian_ledger_entries_total",
            "Total ledger entries appended across all sessions",
        )?;
        registry.register(Box::new(ledger_entries_total.clone()))?;

        let circuit_open_gauge = IntGauge::new(
            "librarian_circuit_open",
            "1 if any provider circuit breaker is currently open, else 0",
        )?;
        registry.register(Box::new(circuit_open_gauge.clone()))?;

        Ok(Self {
            registry,
            query_latency_ms,
            ledger_entries_total,
            circuit_open_gauge,
        })
    }
}

impl Default for LibrarianMetrics {
    fn default() -> Self {
        // Registration against a fresh `Registry` cannot fail for these well-formed
        // metric names; unwrap_or_else keeps this infallible for callers.
        Self::new().unwrap_or_else(|_| Self {
            registry: Registry::new(),
            query_latency_ms: Histogram::with_opts(HistogramOpts::new("fallback", "fallback"))
                .expect("static histogram opts are always valid"),
            ledger_entries_total: IntCounter::new("fallback_counter", "fallback")
                .expect("static counter opts are always valid"),
            circuit_open_gauge: IntGauge::new("fallback_gauge", "fallback")
                .expect("static gauge opts are always valid"),
        })
    }
}
