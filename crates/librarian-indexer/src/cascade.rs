//! Delayed cascade reindex queue (spec §4.5 "Cascade", §8 "Cascade causality"). After a
//! successful reindex of file F, the modules importing F are pushed here with a delay
//! so a burst of edits to a widely-imported file doesn't immediately fan out into a
//! second storm of reindexes.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CascadeEntry {
    path: String,
    ready_at: Instant,
}

/// Owned exclusively by the watcher (spec §3 "Ownership summary"); no other component
/// writes to it.
pub struct CascadeQueue {
    delay: Duration,
    batch_cap: usize,
    queue: VecDeque<CascadeEntry>,
}

impl CascadeQueue {
    pub fn new(delay_ms: u64, batch_cap: usize) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            batch_cap,
            queue: VecDeque::new(),
        }
    }

    /// Enqueue `paths`, each becoming ready `delay` from now. Duplicate paths already
    /// pending are not re-enqueued.
    pub fn enqueue(&mut self, paths: impl IntoIterator<Item = String>) {
        let ready_at = Instant::now() + self.delay;
        for path in paths {
            if self.queue.iter().any(|e| e.path == path) {
                continue;
            }
            self.queue.push_back(CascadeEntry { path, ready_at });
        }
    }

    /// Pop up to `batch_cap` entries whose delay has elapsed as of `now`, in
    /// first-enqueued order.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<String> {
        let mut ready = Vec::new();
        let mut remaining = VecDeque::new();
        while let Some(entry) = self.queue.pop_front() {
            if ready.len() < self.batch_cap && entry.ready_at <= now {
                ready.push(entry.path);
            } else {
                remaining.push_back(entry);
            }
        }
        self.queue = remaining;
        ready
    }

    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_drains_before_the_delay_elapses() {
        let mut queue = CascadeQueue::new(50, 10);
        queue.enqueue(["a.rs".to_string()]);
        assert!(queue.drain_ready(Instant::now()).is_empty());
    }

    #[test]
    fn entries_drain_once_their_delay_elapses() {
        let mut queue = CascadeQueue::new(10, 10);
        queue.enqueue(["a.rs".to_string()]);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(queue.drain_ready(Instant::now()), vec!["a.rs".to_string()]);
    }

    #[test]
    fn drain_respects_the_batch_cap() {
        let mut queue = CascadeQueue::new(5, 2);
        queue.enqueue(["a.rs".to_string(), "b.rs".to_string(), "c.rs".to_string()]);
        std::thread::sleep(Duration::from_millis(10));
        let drained = queue.drain_ready(Instant::now());
        assert_eq!(drained.len(), 2);
        assert_eq!(queue.pending_len(), 1);
    }

    #[test]
    fn duplicate_enqueues_of_a_pending_path_are_ignored() {
        let mut queue = CascadeQueue::new(1_000, 10);
        queue.enqueue(["a.rs".to_string()]);
        queue.enqueue(["a.rs".to_string()]);
        assert_eq!(queue.pending_len(), 1);
    }
}
