//! Error types for import runs
//!
//! Per-record problems (parse, normalize, unresolved reference, store
//! rejection) never surface here: they are counted as skipped records. These
//! errors stop a run before it starts.

use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

/// Result type alias for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Errors that prevent an import run from producing a tally
#[derive(Error, Debug)]
pub enum ImportError {
    /// The dump could not be read at all
    #[error("Cannot read dump '{}': {source}. Verify the file path exists and is readable.", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables or command-line flags.")]
    Config(String),

    /// The destination store could not be set up
    #[error("Store setup failed: {0}")]
    Store(#[from] StoreError),
}

impl ImportError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a source-unavailable error for `path`
    pub fn source_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            source,
        }
    }
}
