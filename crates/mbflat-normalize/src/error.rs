//! Error types for normalization and processing.

use thiserror::Error;

/// Errors produced by the per-artist processor.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Underlying I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A record failed to parse
    #[error("Invalid record JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Index-layer failure
    #[error(transparent)]
    Index(#[from] mbflat_index::IndexError),

    /// Store-layer failure
    #[error(transparent)]
    Store(#[from] mbflat_store::StoreError),

    /// Search-database failure
    #[error(transparent)]
    Search(#[from] mbflat_search::SearchError),

    /// Format-layer failure (manifests)
    #[error(transparent)]
    Format(#[from] mbflat_formats::FormatError),

    /// More artists failed than the configured bound allows
    #[error("{failed} artists failed, exceeding the bound of {bound}")]
    TooManyFailures {
        /// Artists that failed during the run
        failed: u64,
        /// Configured failure bound
        bound: u64,
    },
}

/// Crate-local result alias.
pub type Result<T> = std::result::Result<T, NormalizeError>;
