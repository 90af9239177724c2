//! The live recursive filesystem watcher: wraps `notify`'s recommended watcher, relays
//! raw path events into the debounce+batch windows from `debounce.rs`, and hands the
//! coalesced outcome to a caller-supplied async callback (spec §4.5 "Watcher").

use std::path::{Path, PathBuf};
use std::time::Duration;

use librarian_core::error::StorageError;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcherTrait};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::debounce::{coalesce, BatchOutcome, RawEvent};

/// Owns the underlying OS watch handle; dropping this drops the watch.
pub struct FsWatcher {
    _inner: RecommendedWatcher,
    events: UnboundedReceiver<RawEvent>,
}

fn relativize(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
}

impl FsWatcher {
    /// Start watching `root` recursively. Paths delivered on the returned channel are
    /// relative to `root` in POSIX form (see DESIGN NOTES "cross-file name collisions").
    pub fn start(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        let (tx, rx): (UnboundedSender<RawEvent>, UnboundedReceiver<RawEvent>) = mpsc::unbounded_channel();
        let watch_root = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else { return };
            for path in event.paths {
                if let Some(relative) = relativize(&path, &watch_root) {
                    let _ = tx.send(RawEvent::new(relative));
                }
            }
        })
        .map_err(|e| StorageError::transient(format!("failed to start filesystem watcher: {e}")))?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| StorageError::transient(format!("failed to watch {}: {e}", root.display())))?;

        Ok(Self {
            _inner: watcher,
            events: rx,
        })
    }

    /// Drive the debounce window then the batch window and return one coalesced
    /// outcome. Suspends on the channel (a named suspension point per spec §5) until
    /// at least one raw event arrives, then blocks on the event loop to drain the
    /// case until both windows elapse.
    pub async fn next_batch(&mut self, debounce_ms: u64, batch_window_ms: u64, storm_threshold: usize) -> Option<BatchOutcome> {
        let first = self.events.recv().await?;
        let mut buffer = vec![first];

        drain_for(&mut self.events, Duration::from_millis(debounce_ms), &mut buffer).await;
        drain_for(&mut self.events, Duration::from_millis(batch_window_ms), &mut buffer).await;

        Some(coalesce(&buffer, storm_threshold))
    }
}

async fn drain_for(rx: &mut UnboundedReceiver<RawEvent>, window: Duration, buffer: &mut Vec<RawEvent>) {
    let deadline = tokio::time::sleep(window);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            maybe = rx.recv() => {
                match maybe {
                    Some(event) => buffer.push(event),
                    None => break,
                }
            }
        }
    }
}
