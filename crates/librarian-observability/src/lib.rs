//! Tracing and metrics initialization shared across the workspace's binaries and
//! integration tests: a `tracing-subscriber` exporter and a process-wide `prometheus`
//! registry, scaled down to what this workspace needs (no OTLP export — that's an
//! external collaborator).

pub mod metrics;
pub mod tracer;

pub use metrics::LibrarianMetrics;
pub use tracer::{init_tracing, TracingConfig};
