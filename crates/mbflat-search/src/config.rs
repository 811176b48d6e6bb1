//! Search service configuration.
//!
//! Configuration is built once from CLI arguments and environment
//! variables and passed into the server; there is no global configuration
//! state.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::fts::{ALBUM_DB, ARTIST_DB};

/// Service configuration loaded from CLI args and environment variables.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mbflat-search",
    about = "Artist search service over the mbflat dataset",
    version
)]
pub struct SearchConfig {
    /// Directory containing the search databases
    #[arg(long, env = "MBFLAT_SEARCH_DB_DIR", default_value = "/data/processed")]
    pub db_dir: PathBuf,

    /// Root of the sharded document trees
    #[arg(long, env = "MBFLAT_DOCS_ROOT", default_value = "/data/processed")]
    pub docs_root: PathBuf,

    /// HTTP bind address
    #[arg(long, env = "MBFLAT_SEARCH_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Queries shorter than this return an empty list without searching
    #[arg(long, env = "MBFLAT_MIN_QUERY_LEN", default_value_t = 3)]
    pub min_query_len: usize,

    /// Minimum query length for the fuzzy fallback
    #[arg(long, env = "MBFLAT_FUZZY_MIN_LEN", default_value_t = 4)]
    pub fuzzy_min_len: usize,

    /// Inner candidate set multiplier over the requested limit
    #[arg(long, env = "MBFLAT_INNER_LIMIT_MULT", default_value_t = 10)]
    pub inner_limit_mult: usize,

    /// Hard cap on the inner candidate set
    #[arg(long, env = "MBFLAT_INNER_LIMIT_MAX", default_value_t = 500)]
    pub inner_limit_max: usize,

    /// Result cache time-to-live in milliseconds
    #[arg(long, env = "MBFLAT_CACHE_TTL_MS", default_value_t = 10_000)]
    pub cache_ttl_ms: u64,

    /// Result cache capacity in entries
    #[arg(long, env = "MBFLAT_CACHE_MAX_SIZE", default_value_t = 256)]
    pub cache_max_size: usize,

    /// Cooperative debounce before expensive work; zero disables
    #[arg(long, env = "MBFLAT_DEBOUNCE_MS", default_value_t = 0)]
    pub debounce_ms: u64,
}

impl SearchConfig {
    /// Parse configuration from command-line arguments.
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Path of the artist search database.
    pub fn artist_db(&self) -> PathBuf {
        self.db_dir.join(ARTIST_DB)
    }

    /// Path of the album search database.
    pub fn album_db(&self) -> PathBuf {
        self.db_dir.join(ALBUM_DB)
    }

    /// Inner candidate set size for a request limit.
    pub fn inner_limit(&self, limit: usize) -> usize {
        (limit * self.inner_limit_mult)
            .max(100)
            .min(self.inner_limit_max)
    }
}
