//! Error types for the search index and service.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by index building and query execution.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Underlying I/O failure
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// SQLite-level failure
    #[error("Search database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The FTS database has not been built
    #[error("Search index not available: {0}")]
    IndexUnavailable(PathBuf),

    /// Document store failure while hydrating results
    #[error(transparent)]
    Store(#[from] mbflat_store::StoreError),

    /// Format-layer failure (manifests)
    #[error(transparent)]
    Format(#[from] mbflat_formats::FormatError),

    /// Failed to bind the HTTP listener
    #[error("Failed to bind {addr}: {source}")]
    BindFailed {
        /// Address that failed to bind
        addr: std::net::SocketAddr,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Crate-local result alias.
pub type Result<T> = std::result::Result<T, SearchError>;
