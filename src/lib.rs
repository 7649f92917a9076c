//! pkgdex: an incrementally re-validated index of Go packages.
//!
//! The index walks every configured source root (GOROOT and GOPATH
//! entries), records each directory that declares a package, and answers
//! "what can I import" queries with a sorted, deduplicated list of
//! vendorless import paths. Repeated queries re-walk the roots but reuse
//! the existing index: entries still on disk are confirmed in place, and
//! only entries that disappeared since the previous pass are dropped.
//! This keeps steady-state refreshes cheap enough to run on every
//! completion request.
//!
//! # Example
//!
//! ```no_run
//! use pkgdex::{BuildContext, PackageIndex};
//!
//! let index = PackageIndex::new(BuildContext::from_env())?;
//! let (paths, err) = index.list("");
//! for path in &paths {
//!     println!("{path}");
//! }
//! if let Some(err) = err {
//!     eprintln!("index may be incomplete: {err}");
//! }
//! # Ok::<(), pkgdex::Error>(())
//! ```

pub mod cli;
pub mod context;
pub mod cycle;
pub mod error;
pub mod importpath;
pub mod index;
pub mod scanner;
pub mod walk;

// Re-export commonly used types
pub use cli::{Cli, Commands, OutputFormat};
pub use context::BuildContext;
pub use cycle::CycleGuard;
pub use error::{Error, Result};
pub use index::PackageIndex;
pub use scanner::{Pkg, PkgInfo, RootScanner};
pub use walk::{EntryKind, Flow};
