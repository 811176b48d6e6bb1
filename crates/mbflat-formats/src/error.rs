//! Error types for format handling.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while reading or writing format artifacts.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Underlying I/O failure
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A record or manifest failed to parse as JSON
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A record was missing its mandatory `id` field
    #[error("Record has no id")]
    MissingId,

    /// An atomic replacement could not be completed
    #[error("Atomic write to {path} failed: {source}")]
    AtomicWrite {
        /// Destination that failed to materialize
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Crate-local result alias.
pub type Result<T> = std::result::Result<T, FormatError>;
