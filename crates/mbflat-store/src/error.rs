//! Error types for the document store.

use std::io;
use thiserror::Error;

/// Errors produced by store reads and writes.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A stored document failed to parse
    #[error("Invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The requested document does not exist
    #[error("{kind} document not found: {mbid}")]
    NotFound {
        /// Document kind (`artist` or `album`)
        kind: &'static str,
        /// MBID that was requested
        mbid: String,
    },

    /// Format-layer failure (atomic writes)
    #[error(transparent)]
    Format(#[from] mbflat_formats::FormatError),
}

/// Crate-local result alias.
pub type Result<T> = std::result::Result<T, StoreError>;
