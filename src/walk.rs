//! Parallel directory walker with visitor-driven control flow.
//!
//! The walker calls the visitor for every file, directory, and symlink it
//! encounters and interprets the returned [`Flow`] to decide what to do
//! next. One directory's entries are always visited in readdir order from
//! a single worker, so a `SkipFiles` decision reliably covers the rest of
//! that directory; sibling directories descend concurrently on the rayon
//! pool, so anything the visitor shares must be synchronized.
//!
//! Unreadable subdirectories are skipped silently; an unreadable root is
//! an error. The first visitor error aborts the walk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::error::{Error, Result};

/// What kind of filesystem entry the visitor is looking at. Symlinks are
/// reported as such, not followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
}

/// Visitor verdict for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep going.
    Continue,
    /// Do not descend into this directory (directories only).
    SkipDir,
    /// Skip the remaining non-directory entries of the current directory;
    /// subdirectories are still visited.
    SkipFiles,
    /// Traverse through this symlink as if it were a directory
    /// (symlinks only).
    TraverseSymlink,
}

struct WalkState<'a, F> {
    visitor: &'a F,
    aborted: AtomicBool,
    first_error: Mutex<Option<Error>>,
}

impl<F> WalkState<'_, F> {
    fn abort(&self, err: Error) {
        let mut slot = self.first_error.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
        self.aborted.store(true, Ordering::Relaxed);
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Relaxed)
    }
}

/// Walk the tree rooted at `root`, calling `visitor` for every entry.
///
/// The root itself is visited first (as a directory); returning
/// [`Flow::SkipDir`] for it makes the walk a no-op.
pub fn walk<F>(root: &Path, visitor: F) -> Result<()>
where
    F: Fn(&Path, EntryKind) -> Result<Flow> + Sync,
{
    if visitor(root, EntryKind::Dir)? == Flow::SkipDir {
        return Ok(());
    }
    let state = WalkState {
        visitor: &visitor,
        aborted: AtomicBool::new(false),
        first_error: Mutex::new(None),
    };
    walk_dir(root, &state).map_err(|source| Error::Walk {
        path: root.to_path_buf(),
        source,
    })?;
    match state.first_error.into_inner() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Visit one directory's entries, then recurse into its subdirectories in
/// parallel. Only the caller's own `read_dir` failure is reported;
/// recursion swallows them (the subdirectory is simply skipped).
fn walk_dir<F>(dir: &Path, state: &WalkState<'_, F>) -> std::io::Result<()>
where
    F: Fn(&Path, EntryKind) -> Result<Flow> + Sync,
{
    if state.is_aborted() {
        return Ok(());
    }
    let entries = fs::read_dir(dir)?;

    let mut descend: Vec<PathBuf> = Vec::new();
    let mut skip_files = false;
    for entry in entries.flatten() {
        if state.is_aborted() {
            return Ok(());
        }
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let kind = if file_type.is_dir() {
            EntryKind::Dir
        } else if file_type.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::File
        };
        if skip_files && kind != EntryKind::Dir {
            continue;
        }
        let path = entry.path();
        match (state.visitor)(&path, kind) {
            Ok(Flow::Continue) => {
                if kind == EntryKind::Dir {
                    descend.push(path);
                }
            }
            Ok(Flow::SkipDir) => {}
            Ok(Flow::SkipFiles) => skip_files = true,
            Ok(Flow::TraverseSymlink) => {
                if kind == EntryKind::Symlink {
                    descend.push(path);
                }
            }
            Err(err) => {
                state.abort(err);
                return Ok(());
            }
        }
    }

    descend.par_iter().for_each(|sub| {
        let _ = walk_dir(sub, state);
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs::File;
    use tempfile::TempDir;

    fn collect_walk(root: &Path, decide: impl Fn(&Path, EntryKind) -> Flow + Sync) -> Vec<PathBuf> {
        let seen = Mutex::new(Vec::new());
        walk(root, |path, kind| {
            seen.lock().push(path.to_path_buf());
            Ok(decide(path, kind))
        })
        .unwrap();
        seen.into_inner()
    }

    #[test]
    fn visits_every_entry() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        File::create(tmp.path().join("a.txt")).unwrap();
        File::create(tmp.path().join("sub/b.txt")).unwrap();

        let seen: BTreeSet<PathBuf> = collect_walk(tmp.path(), |_, _| Flow::Continue)
            .into_iter()
            .collect();
        assert!(seen.contains(tmp.path()));
        assert!(seen.contains(&tmp.path().join("a.txt")));
        assert!(seen.contains(&tmp.path().join("sub")));
        assert!(seen.contains(&tmp.path().join("sub/b.txt")));
    }

    #[test]
    fn skip_dir_prunes_subtree() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("pruned")).unwrap();
        File::create(tmp.path().join("pruned/hidden.txt")).unwrap();
        fs::create_dir(tmp.path().join("kept")).unwrap();
        File::create(tmp.path().join("kept/seen.txt")).unwrap();

        let seen = collect_walk(tmp.path(), |path, kind| {
            if kind == EntryKind::Dir && path.ends_with("pruned") {
                Flow::SkipDir
            } else {
                Flow::Continue
            }
        });
        assert!(!seen.contains(&tmp.path().join("pruned/hidden.txt")));
        assert!(seen.contains(&tmp.path().join("kept/seen.txt")));
    }

    #[test]
    fn skip_files_spares_subdirectories() {
        let tmp = TempDir::new().unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            File::create(tmp.path().join(name)).unwrap();
        }
        fs::create_dir(tmp.path().join("sub")).unwrap();
        File::create(tmp.path().join("sub/d.txt")).unwrap();

        let seen = collect_walk(tmp.path(), |_, kind| {
            if kind == EntryKind::File {
                Flow::SkipFiles
            } else {
                Flow::Continue
            }
        });
        // First file answered SkipFiles, so no sibling file after it was
        // visited, in whatever order readdir produced them.
        let top_level_files = seen
            .iter()
            .filter(|p| p.extension().is_some() && p.parent() == Some(tmp.path()))
            .count();
        assert_eq!(top_level_files, 1);
        // The subdirectory still descends; its file answers SkipFiles too.
        assert!(seen.contains(&tmp.path().join("sub/d.txt")));
    }

    #[test]
    fn visitor_error_aborts_walk() {
        let tmp = TempDir::new().unwrap();
        File::create(tmp.path().join("boom.txt")).unwrap();

        let result = walk(tmp.path(), |path, _| {
            if path.extension().is_some() {
                Err(Error::Io(std::io::Error::other("visitor failure")))
            } else {
                Ok(Flow::Continue)
            }
        });
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let result = walk(&tmp.path().join("nope"), |_, _| Ok(Flow::Continue));
        assert!(matches!(result, Err(Error::Walk { .. })));
    }

    #[test]
    fn skip_dir_on_root_is_a_noop() {
        let tmp = TempDir::new().unwrap();
        File::create(tmp.path().join("a.txt")).unwrap();

        let seen = collect_walk(tmp.path(), |_, _| Flow::SkipDir);
        assert_eq!(seen.len(), 1);
    }
}
