//! Aggregate package index across every configured source root.
//!
//! The index owns one [`RootScanner`] per root plus the shared
//! [`CycleGuard`], and answers listing queries by refreshing every root
//! and merging their entries into one sorted, deduplicated view. Roots
//! are independent: a failing root contributes whatever it had while the
//! others refresh normally, and queries return the partial result
//! alongside the first error instead of nothing.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::BuildContext;
use crate::cycle::CycleGuard;
use crate::error::{Error, Result};
use crate::scanner::{PkgInfo, RootScanner};

/// The queryable, incrementally re-validated package index.
#[derive(Debug)]
pub struct PackageIndex {
    scanners: Vec<RootScanner>,
    update_mu: Mutex<()>,
}

impl PackageIndex {
    /// Build an index over the context's source roots. Roots whose
    /// scanner cannot be constructed are omitted; if none survive, the
    /// first construction error (or [`Error::NoRoots`]) is returned.
    pub fn new(ctx: BuildContext) -> Result<Self> {
        let ctx = Arc::new(ctx);
        let cycles = Arc::new(CycleGuard::new());
        let src_dirs = ctx.src_dirs();
        if src_dirs.is_empty() {
            return Err(Error::NoRoots);
        }

        let mut scanners = Vec::with_capacity(src_dirs.len());
        let mut first_err = None;
        for src_dir in src_dirs {
            match RootScanner::new(src_dir.clone(), Arc::clone(&ctx), Arc::clone(&cycles)) {
                Ok(scanner) => scanners.push(scanner),
                Err(err) => {
                    tracing::warn!(
                        root = %src_dir.display(),
                        error = %err,
                        "skipping unusable root"
                    );
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
            }
        }
        if scanners.is_empty() {
            return Err(first_err.unwrap_or(Error::NoRoots));
        }
        Ok(Self {
            scanners,
            update_mu: Mutex::new(()),
        })
    }

    /// Refresh every root. Roots refresh independently; the first error
    /// is returned after all of them have run.
    pub fn refresh(&self, scope: &str) -> Result<()> {
        let _update = self.update_mu.lock();
        let mut first_err = None;
        for scanner in &self.scanners {
            if let Err(err) = scanner.refresh(scope) {
                tracing::warn!(
                    root = %scanner.src_dir().display(),
                    error = %err,
                    "root refresh failed"
                );
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// List visible import paths, sorted and deduplicated across roots.
    ///
    /// A non-empty scope widens the listing to vendored and internal
    /// packages reachable from it. On error the listing is best-effort:
    /// whatever the surviving roots hold, plus the first error.
    pub fn list(&self, scope: &str) -> (Vec<String>, Option<Error>) {
        let err = self.refresh(scope).err();
        let mut paths = Vec::new();
        for scanner in &self.scanners {
            scanner.append_import_paths(&mut paths, scope);
        }
        paths.sort_unstable();
        paths.dedup();
        (paths, err)
    }

    /// Snapshot every indexed package across roots, sorted by directory.
    /// Includes entries the listing hides (`main` packages, vendored
    /// packages out of scope).
    pub fn packages(&self) -> (Vec<PkgInfo>, Option<Error>) {
        let err = self.refresh("").err();
        let mut pkgs = Vec::new();
        for scanner in &self.scanners {
            scanner.append_packages(&mut pkgs);
        }
        pkgs.sort_unstable_by(|a, b| a.dir.cmp(&b.dir));
        (pkgs, err)
    }

    /// Sorted directories backing every indexed package.
    pub fn package_dirs(&self) -> (Vec<PathBuf>, Option<Error>) {
        let (pkgs, err) = self.packages();
        (pkgs.into_iter().map(|p| p.dir).collect(), err)
    }
}
