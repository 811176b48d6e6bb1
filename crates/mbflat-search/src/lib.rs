//! Artist search: index builder and query service.
//!
//! Two halves live here:
//!
//! - `fts`: the build-time side. A single pass over the filtered artist
//!   file produces an FTS5 database of `(id, name, sort_name, folded_name,
//!   phonetic_primary, phonetic_secondary)` rows, compacted into a
//!   read-only friendly single file. The album writer streamed into by the
//!   per-artist processor also lives here, behind a single-writer handle.
//! - the service: an axum HTTP server answering ranked, accent- and
//!   typo-tolerant artist lookups over the index and the sharded document
//!   store, with request coalescing, an optional debounce, and a bounded
//!   TTL result cache.
//!
//! # Architecture
//!
//! - `config`: service configuration from CLI args and environment
//! - `server`: shared state and server orchestration
//! - `http`: router and request handlers
//! - `query`: the ranking and fuzzy-fallback engine (blocking side)
//! - `cache` / `cancel` / `metrics`: result cache, coalescing, counters
//! - `text`: ASCII folding, phonetic codes, FTS match expressions

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod cache;
pub mod cancel;
pub mod config;
pub mod error;
pub mod fts;
pub mod http;
pub mod metrics;
pub mod query;
pub mod server;
pub mod text;

pub use cache::ResultCache;
pub use cancel::{CancellationToken, RequestCoalescer};
pub use config::SearchConfig;
pub use error::{Result, SearchError};
pub use fts::{ALBUM_DB, ARTIST_DB, AlbumFtsWriter, build_artist_fts, run_fts};
pub use metrics::Metrics;
pub use query::{SearchResult, execute_search};
pub use server::{AppState, Server};
