//! File entity: keyed by absolute path, carries the content checksum used to decide
//! whether a reindex is a no-op (see the checksum-idempotence invariant in spec §8).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse classification used by the staleness tracker to pick an SLA (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileCategory {
    Project,
    Dependency,
    Generated,
    Test,
    Vendor,
}

/// Role a file plays in the repository, used by retrieval's adversarial-pair penalty
/// to down-rank look-alikes (spec §4.3 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileRole {
    Source,
    Test,
    Config,
    Documentation,
    Build,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    /// Absolute POSIX path — the primary key (see DESIGN NOTES on path normalization).
    pub path: String,
    /// 16-hex truncated content checksum.
    pub checksum: String,
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
    pub last_indexed: DateTime<Utc>,
    pub category: FileCategory,
    pub role: FileRole,
    pub language: Option<String>,
    pub imports: Vec<String>,
    pub exported_symbols: Vec<String>,
}

impl File {
    /// `last-indexed ≥ last-modified` implies "fresh" per the data-model invariant.
    pub fn is_fresh(&self) -> bool {
        self.last_indexed >= self.last_modified
    }

    pub fn matches_dependency_path(path: &str) -> bool {
        path.contains("node_modules/") || path.contains("vendor/") || path.contains(".pnpm/")
    }
}

/// Compute the 16-hex truncated checksum used throughout the data model.
///
/// The algorithm is SHA-1 of the raw bytes, truncated to 16 hex characters (64 bits) —
/// enough to make accidental collisions within one workspace's file count negligible
/// while keeping stored checksums short.
pub fn content_checksum(bytes: &[u8]) -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let full = hex_encode(&digest);
    full[..16].to_string()
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_sixteen_hex_chars() {
        let checksum = content_checksum(b"fn main() {}");
        assert_eq!(checksum.len(), 16);
        assert!(checksum.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn checksum_is_stable_for_identical_content() {
        assert_eq!(content_checksum(b"abc"), content_checksum(b"abc"));
        assert_ne!(content_checksum(b"abc"), content_checksum(b"abd"));
    }

    #[test]
    fn dependency_path_detection() {
        assert!(File::matches_dependency_path("project/node_modules/left-pad/index.js"));
        assert!(File::matches_dependency_path("vendor/github.com/pkg/errors/errors.go"));
        assert!(!File::matches_dependency_path("src/main.rs"));
    }
}
