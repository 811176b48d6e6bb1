//! Byte-offset and join indexes over the filtered dump files.
//!
//! One pass per file converts NDJSON into a map from MBID to the byte
//! offset of its line, so later stages can fetch any record with a single
//! seek instead of scanning gigabytes. The release-group pass additionally
//! emits artist → [release-group MBID], and the release pass emits
//! release-group → [release MBID].
//!
//! The lookup contract is the only thing callers may rely on: given MBID
//! `k`, `lookup(k)` returns the byte offset of the line whose `id == k`,
//! or nothing. Indexes load into owned maps and are shared read-only
//! across workers.

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod builder;
pub mod error;
pub mod join;
pub mod offset;
pub mod reader;
pub mod stage;

pub use builder::{build_artist_offsets, build_release_group_indexes, build_release_indexes};
pub use error::{IndexError, Result};
pub use join::JoinIndex;
pub use offset::OffsetIndex;
pub use reader::LineReader;
pub use stage::{IndexPaths, LoadedIndexes, load_indexes, run_index};
