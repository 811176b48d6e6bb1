//! Error types for dump extraction and filtering.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the extraction and filter stages.
#[derive(Debug, Error)]
pub enum DumpError {
    /// Underlying I/O failure
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A required source archive does not exist
    #[error("Source archive not found: {0}")]
    ArchiveNotFound(PathBuf),

    /// The archive did not contain the expected NDJSON member
    #[error("Member {member} not found in {archive}")]
    MemberNotFound {
        /// Expected member path inside the archive
        member: String,
        /// Archive that was searched
        archive: PathBuf,
    },

    /// Extraction produced no usable output after a retry
    #[error("Extraction of {0} failed after retry")]
    ExtractionFailed(PathBuf),

    /// The invalid-line ratio exceeded the configured tolerance
    #[error("{invalid} of {total} lines failed to parse (tolerance {tolerance})")]
    TooManyInvalidLines {
        /// Lines that failed to parse
        invalid: u64,
        /// Total lines seen
        total: u64,
        /// Configured invalid-line ratio bound
        tolerance: f64,
    },

    /// Format-layer failure (manifests, atomic writes)
    #[error(transparent)]
    Format(#[from] mbflat_formats::FormatError),
}

/// Crate-local result alias.
pub type Result<T> = std::result::Result<T, DumpError>;
