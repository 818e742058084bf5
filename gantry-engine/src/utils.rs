// Utility Functions
// Run-root discovery for pipeline execution

use std::path::{Path, PathBuf};

/// Find the enclosing git repository root by walking up from `start`.
///
/// Returns `None` when no ancestor directory contains a `.git` entry, e.g.
/// when the path is not inside a repository at all.
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    // Canonicalize to resolve symlinks before walking ancestors
    let start = start.canonicalize().ok()?;
    for ancestor in start.ancestors() {
        if ancestor.join(".git").exists() {
            return Some(ancestor.to_path_buf());
        }
    }
    None
}

/// Resolve the default run root that relative working directories resolve
/// against: the enclosing repository root, falling back to the current
/// directory.
pub fn resolve_run_root() -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_repo_root(&cwd).unwrap_or(cwd)
}
