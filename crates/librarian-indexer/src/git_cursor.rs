//! Git-cursor reconciliation (spec §4.5 "Reconcile", §8 scenario "watcher reconcile with
//! git"). On startup (or after a gap in watch coverage) the indexer prefers diffing
//! against the last-indexed commit SHA; if the workspace has no `.git` or the diff
//! otherwise fails, it falls back to an mtime sweep. Any git failure here is non-fatal —
//! methods return `Option`, not `Result`, mirroring `cochange.rs`'s `Ok(Vec::new())`
//! fallback but pushed one step further since reconciliation must never abort on a git
//! error.

use std::path::{Path, PathBuf};
use std::process::Command;

use librarian_core::model::watch_state::{WatchCursor, WatchState};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitChangeSet {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

impl GitChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    pub fn touched_paths(&self) -> Vec<String> {
        self.added
            .iter()
            .chain(self.modified.iter())
            .cloned()
            .collect()
    }
}

/// Abstracts `git` subprocess access so reconciliation can be unit-tested without a real
/// repository, the same split `cochange.rs` uses for `git log`.
pub trait GitBoundary {
    fn current_sha(&self) -> Option<String>;
    fn diff_names(&self, old_sha: &str, new_sha: &str) -> Option<GitChangeSet>;
    fn status_changes(&self) -> Option<GitChangeSet>;
}

pub struct ProcessGitBoundary {
    pub repo_root: PathBuf,
}

impl ProcessGitBoundary {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    fn has_git_dir(&self) -> bool {
        Path::new(&self.repo_root).join(".git").exists()
    }

    fn run(&self, args: &[&str]) -> Option<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_root)
            .args(args)
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn parse_name_status(text: &str) -> GitChangeSet {
        let mut set = GitChangeSet::default();
        for line in text.lines() {
            let mut parts = line.splitn(2, '\t');
            let Some(status) = parts.next() else { continue };
            let Some(path) = parts.next() else { continue };
            let path = path.trim().to_string();
            match status.chars().next() {
                Some('A') => set.added.push(path),
                Some('M') => set.modified.push(path),
                Some('D') => set.deleted.push(path),
                Some('R') | Some('C') => set.modified.push(path),
                _ => {}
            }
        }
        set
    }
}

impl GitBoundary for ProcessGitBoundary {
    fn current_sha(&self) -> Option<String> {
        if !self.has_git_dir() {
            return None;
        }
        self.run(&["rev-parse", "HEAD"]).map(|s| s.trim().to_string())
    }

    fn diff_names(&self, old_sha: &str, new_sha: &str) -> Option<GitChangeSet> {
        if !self.has_git_dir() {
            return None;
        }
        let range = format!("{old_sha}..{new_sha}");
        let text = self.run(&["diff", "--name-status", &range])?;
        Some(Self::parse_name_status(&text))
    }

    fn status_changes(&self) -> Option<GitChangeSet> {
        if !self.has_git_dir() {
            return None;
        }
        let text = self.run(&["status", "--porcelain"])?;
        let mut set = GitChangeSet::default();
        for line in text.lines() {
            if line.len() < 4 {
                continue;
            }
            let code = &line[..2];
            let path = line[3..].trim().to_string();
            if code.contains('D') {
                set.deleted.push(path);
            } else if code.contains('?') || code.contains('A') {
                set.added.push(path);
            } else {
                set.modified.push(path);
            }
        }
        Some(set)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The cursor was a git SHA and the diff against HEAD succeeded.
    GitDiff(GitChangeSet),
    /// No usable git cursor (no repo, no prior SHA, or the diff failed); caller must
    /// fall back to a full mtime sweep of the workspace.
    NeedsMtimeSweep,
}

/// Resolve what changed since `state` was last persisted, preferring the git cursor and
/// degrading to an mtime sweep signal on any failure (spec §8 "watcher reconcile with
/// git").
pub fn reconcile(git: &dyn GitBoundary, state: &WatchState) -> ReconcileOutcome {
    let WatchCursor::Git {
        last_indexed_commit_sha: Some(old_sha),
    } = &state.cursor
    else {
        return ReconcileOutcome::NeedsMtimeSweep;
    };

    let Some(new_sha) = git.current_sha() else {
        return ReconcileOutcome::NeedsMtimeSweep;
    };

    if *old_sha == new_sha {
        return ReconcileOutcome::GitDiff(GitChangeSet::default());
    }

    match git.diff_names(old_sha, &new_sha) {
        Some(changes) => ReconcileOutcome::GitDiff(changes),
        None => ReconcileOutcome::NeedsMtimeSweep,
    }
}

/// Advance `state`'s cursor to `new_sha` after a successful reconcile, clearing
/// `needs_catchup`.
pub fn advance_cursor(state: &mut WatchState, new_sha: String) {
    state.cursor = WatchCursor::Git {
        last_indexed_commit_sha: Some(new_sha),
    };
    state.needs_catchup = false;
    state.last_error = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeGit {
        sha: Option<String>,
        diff: Option<GitChangeSet>,
    }

    impl GitBoundary for FakeGit {
        fn current_sha(&self) -> Option<String> {
            self.sha.clone()
        }
        fn diff_names(&self, _old_sha: &str, _new_sha: &str) -> Option<GitChangeSet> {
            self.diff.clone()
        }
        fn status_changes(&self) -> Option<GitChangeSet> {
            None
        }
    }

    #[test]
    fn missing_prior_sha_requires_an_mtime_sweep() {
        let state = WatchState::new_git("/repo");
        let git = FakeGit {
            sha: Some("deadbeef".to_string()),
            diff: None,
        };
        assert_eq!(reconcile(&git, &state), ReconcileOutcome::NeedsMtimeSweep);
    }

    #[test]
    fn unchanged_sha_yields_an_empty_diff() {
        let mut state = WatchState::new_git("/repo");
        state.cursor = WatchCursor::Git {
            last_indexed_commit_sha: Some("abc123".to_string()),
        };
        let git = FakeGit {
            sha: Some("abc123".to_string()),
            diff: None,
        };
        assert_eq!(
            reconcile(&git, &state),
            ReconcileOutcome::GitDiff(GitChangeSet::default())
        );
    }

    #[test]
    fn a_successful_diff_is_returned_directly() {
        let mut state = WatchState::new_git("/repo");
        state.cursor = WatchCursor::Git {
            last_indexed_commit_sha: Some("abc123".to_string()),
        };
        let changes = GitChangeSet {
            added: vec!["new.rs".to_string()],
            modified: vec!["old.rs".to_string()],
            deleted: vec![],
        };
        let git = FakeGit {
            sha: Some("def456".to_string()),
            diff: Some(changes.clone()),
        };
        assert_eq!(reconcile(&git, &state), ReconcileOutcome::GitDiff(changes));
    }

    #[test]
    fn a_diff_failure_falls_back_to_an_mtime_sweep() {
        let mut state = WatchState::new_git("/repo");
        state.cursor = WatchCursor::Git {
            last_indexed_commit_sha: Some("abc123".to_string()),
        };
        let git = FakeGit {
            sha: Some("def456".to_string()),
            diff: None,
        };
        assert_eq!(reconcile(&git, &state), ReconcileOutcome::NeedsMtimeSweep);
    }

    #[test]
    fn advancing_the_cursor_clears_catchup_and_error() {
        let mut state = WatchState::new_git("/repo");
        state.needs_catchup = true;
        state.last_error = Some("boom".to_string());
        advance_cursor(&mut state, "newsha".to_string());
        assert!(!state.needs_catchup);
        assert!(state.last_error.is_none());
        assert_eq!(
            state.cursor,
            WatchCursor::Git {
                last_indexed_commit_sha: Some("newsha".to_string())
            }
        );
    }
}
