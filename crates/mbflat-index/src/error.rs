//! Error types for index building and lookup.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while building, persisting, or reading indexes.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Underlying I/O failure
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// An index file failed to parse
    #[error("Invalid index file {path}: {source}")]
    InvalidIndex {
        /// Index file that failed to load
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Serialization of an index failed
    #[error("Index serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A required index file is missing; the index stage has not run
    #[error("Index file not found: {0}")]
    IndexNotFound(PathBuf),

    /// Format-layer failure (manifests, atomic writes)
    #[error(transparent)]
    Format(#[from] mbflat_formats::FormatError),
}

/// Crate-local result alias.
pub type Result<T> = std::result::Result<T, IndexError>;
