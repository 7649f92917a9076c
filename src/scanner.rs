//! Per-root package scanner: discovery, confirmation, and eviction.
//!
//! Each configured source root gets one scanner. A refresh pass bumps the
//! scanner's generation counter, re-walks the source tree (and the
//! compiled-archive tree mirroring it), marks every package directory it
//! can still confirm with the new generation, and finally sweeps out the
//! entries the pass did not re-confirm. The index therefore stays live
//! across passes without ever being rebuilt from scratch.
//!
//! Visitor callbacks run on walker worker threads; the package map is the
//! only shared state and is guarded by a `RwLock`. Confirming an existing
//! entry only needs the read lock (the generation lives in an atomic), so
//! steady-state passes over an unchanged tree are read-mostly.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::context::BuildContext;
use crate::cycle::CycleGuard;
use crate::error::Result;
use crate::importpath::{devendor, has_internal_segment, has_path_prefix, to_slash};
use crate::walk::{self, EntryKind, Flow};

/// Directory names that never contain importable packages.
const SKIPPED_DIR_NAMES: &[&str] = &["testdata", "node_modules"];

/// Compiled archive extension produced by the gc toolchain.
const ARCHIVE_SUFFIX: &str = ".a";

/// One discovered package.
#[derive(Debug)]
pub struct Pkg {
    /// Declared package name; many distinct packages declare `main`.
    pub name: String,
    /// Absolute package directory.
    pub dir: PathBuf,
    /// Root-relative import path, possibly still vendored.
    pub import_path: String,
    /// Devendorized import path, the identifier callers see.
    pub import_path_short: String,
    pub vendored: bool,
    /// Last refresh pass that confirmed this package still exists.
    /// Stored in an atomic so confirmation can run under the read lock.
    generation: AtomicU64,
}

/// Serializable snapshot of a [`Pkg`] for listings.
#[derive(Debug, Clone, Serialize)]
pub struct PkgInfo {
    pub name: String,
    pub import_path: String,
    pub dir: PathBuf,
}

/// Scanner state for one source root.
#[derive(Debug)]
pub struct RootScanner {
    src_dir: PathBuf,
    /// Mirror tree of compiled archives for this root and target.
    pkg_dir: PathBuf,
    /// Standard-library roots have no archive tree worth scanning.
    stdlib: bool,
    ctx: Arc<BuildContext>,
    cycles: Arc<CycleGuard>,
    /// Module-cache escape hatches next to this root; matched by full path.
    ignored_dirs: Vec<PathBuf>,
    pkgs: RwLock<AHashMap<PathBuf, Pkg>>,
    generation: AtomicU64,
    refresh_mu: Mutex<()>,
}

impl RootScanner {
    pub fn new(src_dir: PathBuf, ctx: Arc<BuildContext>, cycles: Arc<CycleGuard>) -> Result<Self> {
        let root_base = src_dir.parent().unwrap_or(&src_dir).to_path_buf();
        let pkg_dir = root_base.join(ctx.pkg_target_root()?);
        let stdlib = ctx.is_stdlib_root(&src_dir);
        let ignored_dirs = vec![root_base.join("pkg/mod"), root_base.join("pkg/v")];
        Ok(Self {
            src_dir,
            pkg_dir,
            stdlib,
            ctx,
            cycles,
            ignored_dirs,
            pkgs: RwLock::new(AHashMap::new()),
            generation: AtomicU64::new(0),
            refresh_mu: Mutex::new(()),
        })
    }

    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    /// Run one refresh pass: mark everything the walkers can confirm with
    /// a fresh generation, then sweep out what they could not.
    ///
    /// The sweep runs even when a walk failed, so a partial pass still
    /// prunes the stale entries it invalidated instead of wedging the
    /// index; the first walk error is returned afterwards.
    pub fn refresh(&self, scope: &str) -> Result<()> {
        let _pass = self.refresh_mu.lock();
        let gen = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // Source before archives: first-writer-wins within a pass, so
        // source-derived entries take precedence for the same directory.
        let mut first_err = walk::walk(&self.src_dir, |path, kind| {
            self.visit_source(path, kind, scope, gen)
        })
        .err();

        if !self.stdlib && self.pkg_dir.is_dir() {
            let err = walk::walk(&self.pkg_dir, |path, kind| {
                self.visit_archive(path, kind, gen)
            })
            .err();
            if first_err.is_none() {
                first_err = err;
            }
        }

        let mut pkgs = self.pkgs.write();
        pkgs.retain(|_, pkg| pkg.generation.load(Ordering::Relaxed) == gen);
        let live = pkgs.len();
        drop(pkgs);

        tracing::debug!(
            root = %self.src_dir.display(),
            generation = gen,
            packages = live,
            "refresh pass complete"
        );
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn visit_source(&self, path: &Path, kind: EntryKind, scope: &str, gen: u64) -> Result<Flow> {
        match kind {
            EntryKind::File => {
                let Some(dir) = path.parent() else {
                    return Ok(Flow::Continue);
                };
                // Files directly in the root are not package members.
                if dir == self.src_dir {
                    return Ok(Flow::Continue);
                }
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    return Ok(Flow::Continue);
                };
                if !name.ends_with(".go") || name.ends_with("_test.go") {
                    return Ok(Flow::Continue);
                }
                if self.confirm(dir, gen) {
                    return Ok(Flow::SkipFiles);
                }
                // Unclassifiable files (build-tag excluded, malformed
                // header) are skipped; a sibling may still qualify.
                let Some(pkg_name) = self.ctx.short_import(path) else {
                    return Ok(Flow::Continue);
                };
                self.insert(dir.to_path_buf(), pkg_name, gen);
                Ok(Flow::SkipFiles)
            }
            EntryKind::Dir => {
                if self.skip_dir(path, scope) {
                    Ok(Flow::SkipDir)
                } else {
                    Ok(Flow::Continue)
                }
            }
            EntryKind::Symlink => {
                let Some(base) = path.file_name().and_then(|n| n.to_str()) else {
                    return Ok(Flow::Continue);
                };
                // Emacs lock files.
                if base.starts_with(".#") {
                    return Ok(Flow::Continue);
                }
                let Some(parent) = path.parent() else {
                    return Ok(Flow::Continue);
                };
                if self.cycles.should_traverse(parent, path) {
                    Ok(Flow::TraverseSymlink)
                } else {
                    Ok(Flow::Continue)
                }
            }
        }
    }

    /// Archive-tree visitor: `<pkgDir>/x/y.a` re-confirms or creates the
    /// package at `<srcDir>/x/y`, named after the archive. Covers packages
    /// whose source was deleted but whose compiled archive remains.
    fn visit_archive(&self, path: &Path, kind: EntryKind, gen: u64) -> Result<Flow> {
        if kind != EntryKind::File {
            return Ok(Flow::Continue);
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return Ok(Flow::Continue);
        };
        if !name.ends_with(ARCHIVE_SUFFIX) {
            return Ok(Flow::Continue);
        }
        let Ok(rel) = path.strip_prefix(&self.pkg_dir) else {
            return Ok(Flow::Continue);
        };
        let dir = self.src_dir.join(rel.with_extension(""));
        if self.confirm(&dir, gen) {
            return Ok(Flow::Continue);
        }
        let Some(base) = dir.file_name().and_then(|n| n.to_str()) else {
            return Ok(Flow::Continue);
        };
        self.insert(dir.clone(), base.to_string(), gen);
        Ok(Flow::Continue)
    }

    /// Directory skip policy for the source walk.
    fn skip_dir(&self, dir: &Path, scope: &str) -> bool {
        let Some(base) = dir.file_name().and_then(|n| n.to_str()) else {
            return true;
        };
        if base.is_empty() || base.starts_with('.') || base.starts_with('_') {
            return true;
        }
        if SKIPPED_DIR_NAMES.contains(&base) {
            return true;
        }
        if (base == "v" || base == "mod") && self.ignored_dirs.iter().any(|d| d == dir) {
            return true;
        }
        // Vendored and internal subtrees are only visible to queries
        // scoped inside them.
        if (base == "vendor" || base == "internal") && !scope.is_empty() {
            let Ok(rel) = dir.strip_prefix(&self.src_dir) else {
                return false;
            };
            if !has_path_prefix(&to_slash(rel), scope) {
                return true;
            }
        }
        false
    }

    /// Refresh the generation of an existing entry for `dir`, if any.
    fn confirm(&self, dir: &Path, gen: u64) -> bool {
        let pkgs = self.pkgs.read();
        if let Some(pkg) = pkgs.get(dir) {
            pkg.generation.store(gen, Ordering::Relaxed);
            return true;
        }
        false
    }

    /// Create the entry for `dir` unless some other visit claimed it
    /// first (first-writer-wins within a pass).
    fn insert(&self, dir: PathBuf, name: String, gen: u64) {
        let Ok(rel) = dir.strip_prefix(&self.src_dir) else {
            return;
        };
        let import_path = to_slash(rel);
        let (short, vendored) = devendor(&import_path);
        let import_path_short = short.to_string();
        let mut pkgs = self.pkgs.write();
        pkgs.entry(dir.clone()).or_insert_with(|| Pkg {
            name,
            dir,
            import_path,
            import_path_short,
            vendored,
            generation: AtomicU64::new(gen),
        });
    }

    /// Append this root's visible import paths to `out`.
    ///
    /// `main` packages are not importable and never listed. Vendored and
    /// internal entries require the scope to reach into them; everything
    /// else is listed regardless of scope.
    pub fn append_import_paths(&self, out: &mut Vec<String>, scope: &str) {
        let pkgs = self.pkgs.read();
        for pkg in pkgs.values() {
            if pkg.name == "main" {
                continue;
            }
            let restricted = pkg.vendored || has_internal_segment(&pkg.import_path);
            if restricted && (scope.is_empty() || !has_path_prefix(&pkg.import_path, scope)) {
                continue;
            }
            out.push(pkg.import_path_short.clone());
        }
    }

    /// Append a snapshot of every entry, listable or not.
    pub fn append_packages(&self, out: &mut Vec<PkgInfo>) {
        let pkgs = self.pkgs.read();
        for pkg in pkgs.values() {
            out.push(PkgInfo {
                name: pkg.name.clone(),
                import_path: pkg.import_path.clone(),
                dir: pkg.dir.clone(),
            });
        }
    }
}
