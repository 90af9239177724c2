//! Per-file quarantine after repeated reindex failures (spec §4.5 "Quarantine", §8
//! "per-file isolation"). A file that fails to parse/embed/persist `threshold` times in
//! a row is excluded from future reindex attempts until its content changes (a new
//! checksum clears the failure count), so one malformed file can't stall the whole
//! batch.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

pub struct QuarantineTracker {
    threshold: u32,
    failures: RwLock<HashMap<String, u32>>,
    quarantined: RwLock<HashSet<String>>,
}

impl QuarantineTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            failures: RwLock::new(HashMap::new()),
            quarantined: RwLock::new(HashSet::new()),
        }
    }

    /// Record a reindex failure for `path`. Returns `true` if this call pushed the file
    /// into quarantine.
    pub fn record_failure(&self, path: &str) -> bool {
        let mut failures = self.failures.write();
        let count = failures.entry(path.to_string()).or_insert(0);
        *count += 1;
        if *count >= self.threshold {
            self.quarantined.write().insert(path.to_string());
            return true;
        }
        false
    }

    /// Clear a file's failure history on a successful reindex (e.g. after its content
    /// changed and the new checksum parses cleanly).
    pub fn record_success(&self, path: &str) {
        self.failures.write().remove(path);
        self.quarantined.write().remove(path);
    }

    pub fn is_quarantined(&self, path: &str) -> bool {
        self.quarantined.read().contains(path)
    }

    pub fn quarantined_paths(&self) -> Vec<String> {
        self.quarantined.read().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_file_is_quarantined_after_reaching_the_threshold() {
        let tracker = QuarantineTracker::new(3);
        assert!(!tracker.record_failure("a.rs"));
        assert!(!tracker.record_failure("a.rs"));
        assert!(tracker.record_failure("a.rs"));
        assert!(tracker.is_quarantined("a.rs"));
    }

    #[test]
    fn success_clears_the_failure_count_and_quarantine() {
        let tracker = QuarantineTracker::new(2);
        tracker.record_failure("a.rs");
        tracker.record_failure("a.rs");
        assert!(tracker.is_quarantined("a.rs"));
        tracker.record_success("a.rs");
        assert!(!tracker.is_quarantined("a.rs"));
        assert!(!tracker.record_failure("a.rs"));
    }

    #[test]
    fn unrelated_files_are_unaffected() {
        let tracker = QuarantineTracker::new(1);
        tracker.record_failure("a.rs");
        assert!(tracker.is_quarantined("a.rs"));
        assert!(!tracker.is_quarantined("b.rs"));
    }
}
