//! Sharded document store.
//!
//! Normalized documents live under `<root>/<kind>/<xx>/<yy>/<mbid>.json`,
//! where `xx`/`yy` are the first two and next two characters of the MBID.
//! All writes are atomic (same-directory temp file, fsync, rename) so a
//! document exists if and only if its entire normalization succeeded —
//! partial documents are never visible, and existence doubles as the
//! resume check for the per-artist processor.
//!
//! An MBID → path manifest is emitted at the end of a run for consumers
//! that prefer a direct index over recomputing shard paths; both access
//! styles are equivalent.

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod mapping;
pub mod store;

pub use error::{Result, StoreError};
pub use mapping::PathMapping;
pub use store::{DocumentKind, DocumentStore};
