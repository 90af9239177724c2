//! Full workspace directory walk, used as the mtime-sweep fallback when no usable git
//! cursor exists (spec §4.5 "Reconcile"). Applies the same include/exclude glob
//! patterns the live watcher is configured with.

use std::path::{Path, PathBuf};

use glob::Pattern;

fn compile(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|p| Pattern::new(p).ok())
        .collect()
}

fn matches_any(patterns: &[Pattern], relative: &str) -> bool {
    patterns.iter().any(|p| p.matches(relative))
}

/// Recursively list every file under `root` whose path (relative, POSIX form) matches
/// an include glob and no exclude glob.
pub fn walk_workspace(root: &Path, include_globs: &[String], exclude_globs: &[String]) -> Vec<String> {
    let includes = compile(include_globs);
    let excludes = compile(exclude_globs);
    let mut out = Vec::new();
    walk_dir(root, root, &includes, &excludes, &mut out);
    out
}

fn walk_dir(root: &Path, dir: &Path, includes: &[Pattern], excludes: &[Pattern], out: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(relative) = relativize(&path, root) else { continue };
        if matches_any(excludes, &relative) {
            continue;
        }
        let Ok(file_type) = entry.file_type() else { continue };
        if file_type.is_dir() {
            walk_dir(root, &path, includes, excludes, out);
        } else if file_type.is_file() && (includes.is_empty() || matches_any(includes, &relative)) {
            out.push(relative);
        }
    }
}

fn relativize(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn walks_nested_files_excluding_configured_globs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.js"), "module.exports = {}").unwrap();

        let found = walk_workspace(
            dir.path(),
            &["**/*".to_string()],
            &["**/node_modules/**".to_string()],
        );
        assert!(found.iter().any(|p| p == "src/main.rs"));
        assert!(!found.iter().any(|p| p.contains("node_modules")));
    }
}
