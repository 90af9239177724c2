//! Sliding window counter for the hourly tier: a deque of request timestamps, pruned to
//! the window on each check.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub struct SlidingWindow {
    capacity: usize,
    window: Duration,
    events: Mutex<VecDeque<Instant>>,
}

impl SlidingWindow {
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            capacity,
            window,
            events: Mutex::new(VecDeque::new()),
        }
    }

    fn prune(&self, events: &mut VecDeque<Instant>, now: Instant) {
        while let Some(front) = events.front() {
            if now.duration_since(*front) > self.window {
                events.pop_front();
            } else {
                break;
            }
        }
    }

    /// Returns `Ok(())` and records the event, or `Err(retry_after_secs)` if the window
    /// is at capacity.
    pub fn try_record(&self) -> Result<(), f64> {
        let now = Instant::now();
        let mut events = self.events.lock();
        self.prune(&mut events, now);
        if events.len() >= self.capacity {
            let oldest = *events.front().expect("len >= capacity implies non-empty");
            let retry_after = (self.window - now.duration_since(oldest)).as_secs_f64();
            return Err(retry_after.max(0.0));
        }
        events.push_back(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_capacity_then_denies() {
        let window = SlidingWindow::new(2, Duration::from_secs(3600));
        assert!(window.try_record().is_ok());
        assert!(window.try_record().is_ok());
        assert!(window.try_record().is_err());
    }
}
