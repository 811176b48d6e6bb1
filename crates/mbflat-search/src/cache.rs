//! Bounded TTL result cache.
//!
//! Repeat queries during typing short-circuit here. Entries expire after
//! the configured TTL; expiry is lazy on read, and LRU eviction bounds the
//! capacity on insert. Access is serialized by a short-held lock.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::query::SearchResult;

struct CacheEntry {
    inserted_at: Instant,
    results: Vec<SearchResult>,
}

/// An LRU cache of search responses keyed by lowercased query and limit.
pub struct ResultCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl ResultCache {
    /// Create a cache with the given capacity and TTL.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Cache key for a query/limit pair; comparisons are case-insensitive.
    pub fn key(query: &str, limit: usize) -> String {
        format!("artists::{}::{limit}", query.to_lowercase())
    }

    /// Fetch a non-expired entry, refreshing its LRU position. Expired
    /// entries are dropped on the way out.
    pub fn get(&self, key: &str) -> Option<Vec<SearchResult>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() <= self.ttl => Some(entry.results.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    /// Insert a response, evicting the least-recently-used entry when at
    /// capacity.
    pub fn put(&self, key: String, results: Vec<SearchResult>) {
        self.entries.lock().put(
            key,
            CacheEntry {
                inserted_at: Instant::now(),
                results,
            },
        );
    }

    /// Number of live entries (expired entries may still be counted until
    /// read).
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("ttl", &self.ttl)
            .field("len", &self.len())
            .finish()
    }
}
