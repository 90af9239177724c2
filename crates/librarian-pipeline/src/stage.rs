//! The per-query state machine and its stage observer (spec §4.6, §5 "Ordering
//! guarantees": stage order is strict and observed within one query).

use std::time::Instant;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Received,
    Planned,
    Retrieving,
    Synthesizing,
    Verifying,
    Assembled,
    Closed,
}

impl QueryStage {
    pub fn label(&self) -> &'static str {
        match self {
            QueryStage::Received => "received",
            QueryStage::Planned => "planned",
            QueryStage::Retrieving => "retrieving",
            QueryStage::Synthesizing => "synthesizing",
            QueryStage::Verifying => "verifying",
            QueryStage::Assembled => "assembled",
            QueryStage::Closed => "closed",
        }
    }
}

/// Observes each stage transition as `(stage, durationMs, payload)`. The default
/// `TracingStageObserver` just logs; a test can supply a recording double instead.
pub trait StageObserver: Send + Sync {
    fn observe(&self, stage: QueryStage, duration_ms: u64, payload: Option<serde_json::Value>);
}

pub struct TracingStageObserver;

impl StageObserver for TracingStageObserver {
    fn observe(&self, stage: QueryStage, duration_ms: u64, payload: Option<serde_json::Value>) {
        debug!(stage = stage.label(), duration_ms, payload = ?payload, "query stage observed");
    }
}

/// Tracks the current stage and timestamps transitions so the pipeline can report a
/// `stages: [{stage, durationMs}]` trail on the response. `enter(next)` closes out the
/// stage currently in progress (observed under its own name) before starting the clock
/// on `next`; `finish()` closes out whichever stage was open when the query completes.
pub struct StageTracker<'a> {
    observer: &'a dyn StageObserver,
    current: QueryStage,
    stage_started_at: Instant,
    pub trail: Vec<(QueryStage, u64)>,
}

impl<'a> StageTracker<'a> {
    pub fn new(observer: &'a dyn StageObserver) -> Self {
        Self {
            observer,
            current: QueryStage::Received,
            stage_started_at: Instant::now(),
            trail: Vec::new(),
        }
    }

    fn close_current(&mut self, payload: Option<serde_json::Value>) {
        let duration_ms = self.stage_started_at.elapsed().as_millis() as u64;
        self.observer.observe(self.current, duration_ms, payload);
        self.trail.push((self.current, duration_ms));
    }

    pub fn enter(&mut self, next: QueryStage, payload: Option<serde_json::Value>) {
        self.close_current(payload);
        self.current = next;
        self.stage_started_at = Instant::now();
    }

    pub fn finish(&mut self, payload: Option<serde_json::Value>) {
        self.close_current(payload);
    }
}
