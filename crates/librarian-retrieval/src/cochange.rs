//! Co-change matrix built from `git log` (spec §4.3 "Co-change matrix").

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::process::Command;

use librarian_core::error::StorageError;

#[derive(Debug, Clone)]
pub struct Commit {
    pub files: Vec<String>,
}

/// Source of historical commits, abstracted so tests can supply fixtures instead of
/// shelling out to `git` (the real implementation is a suspension point per spec §5).
pub trait CommitSource {
    fn commits(&self) -> Result<Vec<Commit>, StorageError>;
}

pub struct GitLogSource {
    pub repo_root: std::path::PathBuf,
    pub max_commits: usize,
}

impl CommitSource for GitLogSource {
    fn commits(&self) -> Result<Vec<Commit>, StorageError> {
        if !Path::new(&self.repo_root).join(".git").exists() {
            return Ok(Vec::new());
        }
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_root)
            .arg("log")
            .arg(format!("-n{}", self.max_commits))
            .arg("--name-only")
            .arg("--pretty=format:--commit--")
            .output()
            .map_err(|e| StorageError::transient(format!("git log failed: {e}")))?;
        if !output.status.success() {
            return Err(StorageError::transient("git log exited with a non-zero status"));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let mut commits = Vec::new();
        let mut current: Vec<String> = Vec::new();
        for line in text.lines() {
            if line == "--commit--" {
                if !current.is_empty() {
                    commits.push(Commit { files: std::mem::take(&mut current) });
                }
            } else if !line.trim().is_empty() {
                current.push(line.trim().to_string());
            }
        }
        if !current.is_empty() {
            commits.push(Commit { files: current });
        }
        Ok(commits)
    }
}

fn is_excluded(path: &str) -> bool {
    path.contains("/test/") || path.contains("/tests/") || path.starts_with("test")
        || path.contains("node_modules/") || path.contains("vendor/") || path.contains(".pnpm/")
}

pub struct CoChangePair {
    pub jaccard: f64,
    pub score: f64,
}

/// Pairwise co-change statistics across a bounded commit window, excluding
/// single-file commits (no pairs to learn), huge refactors (`max_files_per_commit`),
/// and test/vendor paths.
pub struct CoChangeMatrix {
    pair_counts: HashMap<(String, String), u32>,
    file_counts: HashMap<String, u32>,
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl CoChangeMatrix {
    pub fn build(commits: &[Commit], max_files_per_commit: usize) -> Self {
        let mut pair_counts: HashMap<(String, String), u32> = HashMap::new();
        let mut file_counts: HashMap<String, u32> = HashMap::new();

        for commit in commits {
            let files: Vec<&String> = commit
                .files
                .iter()
                .filter(|f| !is_excluded(f))
                .collect();
            if files.len() < 2 || files.len() > max_files_per_commit {
                continue;
            }
            let unique: HashSet<&String> = files.into_iter().collect();
            let unique: Vec<&String> = unique.into_iter().collect();
            for f in &unique {
                *file_counts.entry((*f).clone()).or_insert(0) += 1;
            }
            for i in 0..unique.len() {
                for j in (i + 1)..unique.len() {
                    let key = pair_key(unique[i], unique[j]);
                    *pair_counts.entry(key).or_insert(0) += 1;
                }
            }
        }

        Self { pair_counts, file_counts }
    }

    fn pair(&self, a: &str, b: &str) -> Option<CoChangePair> {
        let key = pair_key(a, b);
        let count = *self.pair_counts.get(&key)? as f64;
        let count_a = *self.file_counts.get(a)? as f64;
        let count_b = *self.file_counts.get(b)? as f64;
        let union = count_a + count_b - count;
        let jaccard = if union > 0.0 { count / union } else { 0.0 };
        let p_b_given_a = count / count_a;
        let p_a_given_b = count / count_b;
        let score = (p_b_given_a * p_a_given_b).sqrt();
        Some(CoChangePair { jaccard, score })
    }

    /// Additive boost for `candidate` against the current top-k set, capped at
    /// `max_boost` and gated by `min_support` co-occurrences.
    pub fn boost(&self, candidate: &str, top_k: &[String], weight: f64, max_boost: f64, min_support: u32) -> f64 {
        let mut best: f64 = 0.0;
        for other in top_k {
            if other == candidate {
                continue;
            }
            let key = pair_key(candidate, other);
            let Some(&count) = self.pair_counts.get(&key) else { continue };
            if count < min_support {
                continue;
            }
            if let Some(pair) = self.pair(candidate, other) {
                best = best.max((pair.score * weight).min(max_boost));
            }
        }
        best.min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(files: &[&str]) -> Commit {
        Commit { files: files.iter().map(|s| s.to_string()).collect() }
    }

    #[test]
    fn single_file_commits_contribute_no_pairs() {
        let matrix = CoChangeMatrix::build(&[commit(&["a.rs"])], 10);
        assert_eq!(matrix.boost("a.rs", &["b.rs".to_string()], 0.5, 0.3, 1), 0.0);
    }

    #[test]
    fn frequent_co_changes_boost_above_min_support() {
        let commits = vec![
            commit(&["a.rs", "b.rs"]),
            commit(&["a.rs", "b.rs"]),
            commit(&["a.rs", "b.rs"]),
        ];
        let matrix = CoChangeMatrix::build(&commits, 10);
        let boost = matrix.boost("a.rs", &["b.rs".to_string()], 0.5, 0.3, 2);
        assert!(boost > 0.0);
        assert!(boost <= 0.3);
    }

    #[test]
    fn huge_refactor_commits_are_excluded() {
        let files: Vec<String> = (0..50).map(|i| format!("f{i}.rs")).collect();
        let file_refs: Vec<&str> = files.iter().map(|s| s.as_str()).collect();
        let matrix = CoChangeMatrix::build(&[commit(&file_refs)], 10);
        assert_eq!(matrix.boost("f0.rs", &["f1.rs".to_string()], 0.5, 0.3, 1), 0.0);
    }

    #[test]
    fn test_and_vendor_paths_are_excluded() {
        let commits = vec![commit(&["src/a.rs", "tests/a_test.rs"])];
        let matrix = CoChangeMatrix::build(&commits, 10);
        assert_eq!(matrix.boost("src/a.rs", &["tests/a_test.rs".to_string()], 0.5, 0.3, 1), 0.0);
    }

    /// Worked example (spec §8 scenario 4): 100 commits where X and Y change together
    /// 60 times, X alone (with some other file) 20 more times for 80 total, Y alone 15
    /// more times for 75 total. `score = sqrt(P(Y|X)*P(X|Y)) = sqrt(0.75*0.8) ≈ 0.775`;
    /// with `weight=0.3, maxBoost=0.3` the additive boost is `min(0.3, 0.775*0.3) ≈
    /// 0.233`, and a 0.5 semantic baseline boosts to ≈0.733.
    #[test]
    fn co_change_boost_matches_the_spec_worked_example() {
        let mut commits = Vec::new();
        for _ in 0..60 {
            commits.push(commit(&["x.rs", "y.rs"]));
        }
        for i in 0..20 {
            commits.push(commit(&["x.rs", &format!("other_x{i}.rs")]));
        }
        for i in 0..15 {
            commits.push(commit(&["y.rs", &format!("other_y{i}.rs")]));
        }
        for i in 0..5 {
            commits.push(commit(&[&format!("unrelated{i}.rs"), &format!("unrelated{i}b.rs")]));
        }
        assert_eq!(commits.len(), 100);

        let matrix = CoChangeMatrix::build(&commits, 10);
        let pair = matrix.pair("x.rs", "y.rs").expect("pair exists");
        assert!((pair.score - 0.7746).abs() < 1e-3, "score was {}", pair.score);

        let boost = matrix.boost("y.rs", &["x.rs".to_string()], 0.3, 0.3, 1);
        assert!((boost - 0.2324).abs() < 1e-3, "boost was {boost}");

        let semantic_baseline = 0.5;
        let boosted = (semantic_baseline + boost).min(1.0);
        assert!((boosted - 0.7324).abs() < 1e-3, "boosted total was {boosted}");
    }
}
