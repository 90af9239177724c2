//! Debounced, batched filesystem event coalescing (spec §4.5 "Watcher", §8 "watcher
//! storm safety"). The coalescing rule itself is a pure function over a vector of raw
//! events so it can be tested without driving a real filesystem watcher, the same
//! test-double split the co-change matrix uses for `git log` (see `cochange.rs`).

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub path: String,
}

impl RawEvent {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Deduplicated candidate paths to checksum-compare against storage.
    Candidates(Vec<String>),
    /// More than `storm_threshold` raw events arrived in one batch window; the whole
    /// batch is dropped and a full reconcile must be scheduled instead.
    Storm { event_count: usize },
}

/// Coalesce one batch window's worth of raw events. A path that fires many times in
/// the window still contributes exactly one reindex candidate (debounce), but every
/// raw event counts toward the storm threshold — a path that churns 500 times in one
/// window is exactly the storm the threshold exists to catch, even though it
/// deduplicates to a single candidate.
pub fn coalesce(events: &[RawEvent], storm_threshold: usize) -> BatchOutcome {
    if events.len() > storm_threshold {
        return BatchOutcome::Storm {
            event_count: events.len(),
        };
    }
    let mut seen = HashSet::with_capacity(events.len());
    let mut candidates = Vec::new();
    for event in events {
        if seen.insert(event.path.clone()) {
            candidates.push(event.path.clone());
        }
    }
    BatchOutcome::Candidates(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_events_for_one_path_coalesce_to_a_single_candidate() {
        let events = vec![
            RawEvent::new("src/a.rs"),
            RawEvent::new("src/a.rs"),
            RawEvent::new("src/a.rs"),
        ];
        let outcome = coalesce(&events, 200);
        assert_eq!(outcome, BatchOutcome::Candidates(vec!["src/a.rs".to_string()]));
    }

    #[test]
    fn distinct_paths_all_survive_coalescing_in_first_seen_order() {
        let events = vec![RawEvent::new("a.rs"), RawEvent::new("b.rs"), RawEvent::new("a.rs")];
        let outcome = coalesce(&events, 200);
        assert_eq!(
            outcome,
            BatchOutcome::Candidates(vec!["a.rs".to_string(), "b.rs".to_string()])
        );
    }

    #[test]
    fn more_than_storm_threshold_raw_events_drops_the_batch() {
        let events: Vec<RawEvent> = (0..201).map(|i| RawEvent::new(format!("f{i}.rs"))).collect();
        let outcome = coalesce(&events, 200);
        assert_eq!(outcome, BatchOutcome::Storm { event_count: 201 });
    }

    #[test]
    fn exactly_storm_threshold_events_does_not_trip_the_storm() {
        let events: Vec<RawEvent> = (0..200).map(|i| RawEvent::new(format!("f{i}.rs"))).collect();
        let outcome = coalesce(&events, 200);
        assert!(matches!(outcome, BatchOutcome::Candidates(_)));
    }

    #[test]
    fn a_single_path_churning_above_threshold_still_storms() {
        let events: Vec<RawEvent> = (0..250).map(|_| RawEvent::new("hot.rs")).collect();
        let outcome = coalesce(&events, 200);
        assert_eq!(outcome, BatchOutcome::Storm { event_count: 250 });
    }
}
