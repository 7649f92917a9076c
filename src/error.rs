//! Error types and exit codes for pkgdex

use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Main error type for pkgdex operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown compiler {name:?} (expected \"gc\" or \"gccgo\")")]
    UnknownCompiler { name: String },

    #[error("no source roots found (set GOROOT and/or GOPATH)")]
    NoRoots,

    #[error("walk failed at {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Convert error to appropriate exit code:
    /// - 0: Success
    /// - 1: IO / walk / encoding error
    /// - 2: Configuration error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::UnknownCompiler { .. } | Self::NoRoots => ExitCode::from(2),
            Self::Walk { .. } | Self::Io(_) | Self::Json(_) => ExitCode::from(1),
        }
    }
}

/// Result type alias for pkgdex operations
pub type Result<T> = std::result::Result<T, Error>;
