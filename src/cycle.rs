//! Symlink traversal guard.
//!
//! Walking through symlinks can revisit directories (two links to one
//! target) or descend forever (a link to an ancestor). The guard keeps a
//! registry of resolved targets already traversed, shared across every
//! root scanner so the same real directory is only ever walked once per
//! process no matter which root reached it first.
//!
//! The registry is additive only. Entries are never pruned within a run;
//! a very long-lived process that deletes and recreates linked trees can
//! therefore miss a re-traversal, which is an accepted tradeoff.

use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashSet;
use parking_lot::Mutex;

/// Registry of real (symlink-resolved) directory paths already entered.
#[derive(Debug, Default)]
pub struct CycleGuard {
    visited: Mutex<AHashSet<PathBuf>>,
}

impl CycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether the symlink at `link` (a directory entry of `parent`)
    /// should be traversed as a directory.
    ///
    /// Returns true exactly once per resolved target: the first caller wins
    /// and traverses, racing callers are denied. Resolution failures
    /// (dangling link, permission error) and non-directory targets are
    /// never traversed, and never surface an error.
    pub fn should_traverse(&self, parent: &Path, link: &Path) -> bool {
        let Ok(target) = fs::canonicalize(link) else {
            return false;
        };
        let Ok(meta) = fs::metadata(&target) else {
            return false;
        };
        if !meta.is_dir() {
            return false;
        }
        let Ok(real_parent) = fs::canonicalize(parent) else {
            return false;
        };
        // A target containing the link's own directory is a cycle.
        if real_parent.starts_with(&target) {
            return false;
        }
        self.visited.lock().insert(target)
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    #[test]
    fn first_entry_wins_repeats_denied() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("target");
        fs::create_dir(&target).unwrap();
        let link = tmp.path().join("link");
        symlink(&target, &link).unwrap();

        let guard = CycleGuard::new();
        assert!(guard.should_traverse(tmp.path(), &link));
        assert!(!guard.should_traverse(tmp.path(), &link));
    }

    #[test]
    fn two_links_to_one_target_traverse_once() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("target");
        fs::create_dir(&target).unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        symlink(&target, &a).unwrap();
        symlink(&target, &b).unwrap();

        let guard = CycleGuard::new();
        assert!(guard.should_traverse(tmp.path(), &a));
        assert!(!guard.should_traverse(tmp.path(), &b));
    }

    #[test]
    fn ancestor_link_is_a_cycle() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        let link = nested.join("up");
        symlink(tmp.path(), &link).unwrap();

        let guard = CycleGuard::new();
        assert!(!guard.should_traverse(&nested, &link));
    }

    #[test]
    fn dangling_link_denied() {
        let tmp = TempDir::new().unwrap();
        let link = tmp.path().join("dangling");
        symlink(tmp.path().join("gone"), &link).unwrap();

        let guard = CycleGuard::new();
        assert!(!guard.should_traverse(tmp.path(), &link));
    }

    #[test]
    fn file_target_denied() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("plain.txt");
        fs::write(&file, "x").unwrap();
        let link = tmp.path().join("link");
        symlink(&file, &link).unwrap();

        let guard = CycleGuard::new();
        assert!(!guard.should_traverse(tmp.path(), &link));
    }
}
