//! Server state and orchestration.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::TcpListener;
use tracing::{debug, info};

use mbflat_store::DocumentStore;

use crate::cache::ResultCache;
use crate::cancel::RequestCoalescer;
use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::metrics::Metrics;
use crate::query::{SearchResult, execute_search};

/// Shared application state for the search service.
///
/// The store and index are read-only; the only mutable state is the
/// result cache, the coalescing table, and the metrics counters, each
/// behind its own short-held synchronization.
#[derive(Debug)]
pub struct AppState {
    /// Service configuration.
    pub config: SearchConfig,
    /// Read-only document store.
    pub store: DocumentStore,
    /// Request counters.
    pub metrics: Metrics,
    /// Bounded TTL result cache.
    pub cache: ResultCache,
    /// Per-client-key cancellation tokens.
    pub coalescer: RequestCoalescer,
}

impl AppState {
    /// Create state from configuration.
    pub fn new(config: SearchConfig) -> Self {
        let store = DocumentStore::new(&config.docs_root);
        let cache = ResultCache::new(
            config.cache_max_size,
            Duration::from_millis(config.cache_ttl_ms),
        );
        Self {
            config,
            store,
            metrics: Metrics::default(),
            cache,
            coalescer: RequestCoalescer::new(),
        }
    }

    /// Run one artist search with gating, coalescing, debounce, cache,
    /// and metrics around the blocking engine.
    pub async fn search(
        self: &Arc<Self>,
        client_key: String,
        query: String,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let started = Instant::now();
        self.metrics.incr(&self.metrics.requests_total);
        self.metrics.incr(&self.metrics.requests_active);
        let outcome = self.search_inner(client_key, query, limit, started).await;
        self.metrics.decr_active();
        outcome
    }

    async fn search_inner(
        self: &Arc<Self>,
        client_key: String,
        query: String,
        limit: usize,
        started: Instant,
    ) -> Result<Vec<SearchResult>> {
        // Gate very short queries before any other work.
        if query.trim().chars().count() < self.config.min_query_len {
            debug!("Query below minimum length, returning no results");
            self.metrics.incr(&self.metrics.short_queries);
            return Ok(Vec::new());
        }

        // A newer request from the same client cancels this one.
        let token = self.coalescer.begin(&client_key);

        if self.config.debounce_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.debounce_ms)).await;
            if token.is_cancelled() {
                debug!("Debounced request superseded, returning early");
                self.metrics.incr(&self.metrics.debounced_cancelled);
                self.coalescer.finish(&client_key, &token);
                return Ok(Vec::new());
            }
        }

        let cache_key = ResultCache::key(&query, limit);
        if let Some(hit) = self.cache.get(&cache_key) {
            debug!("Cache hit for '{query}' (limit {limit})");
            self.metrics.incr(&self.metrics.cache_hits);
            self.complete(hit.len(), started);
            self.coalescer.finish(&client_key, &token);
            return Ok(hit);
        }
        self.metrics.incr(&self.metrics.cache_misses);

        let state = Arc::clone(self);
        let engine_token = token.clone();
        let engine_query = query.clone();
        let joined = tokio::task::spawn_blocking(move || {
            execute_search(
                &state.config,
                &state.store,
                &state.metrics,
                &engine_token,
                &engine_query,
                limit,
            )
        })
        .await;

        self.coalescer.finish(&client_key, &token);

        let results = match joined {
            Ok(outcome) => outcome?,
            Err(join_err) => return Err(SearchError::Io(std::io::Error::other(join_err))),
        };

        // A cancelled request may have aborted mid-accumulation; its
        // partial result list must not poison the cache.
        if !token.is_cancelled() {
            self.cache.put(cache_key, results.clone());
        }
        self.complete(results.len(), started);
        Ok(results)
    }

    fn complete(&self, returned: usize, started: Instant) {
        self.metrics.incr(&self.metrics.requests_completed);
        self.metrics
            .add(&self.metrics.results_returned_total, returned as u64);
        self.metrics.add(
            &self.metrics.execution_ms_total,
            started.elapsed().as_millis() as u64,
        );
    }
}

/// The search HTTP server.
pub struct Server {
    state: Arc<AppState>,
    bind: SocketAddr,
}

impl Server {
    /// Create a server from configuration.
    pub fn new(config: SearchConfig) -> Self {
        let bind = config.bind;
        Self {
            state: Arc::new(AppState::new(config)),
            bind,
        }
    }

    /// Shared application state (for tests).
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Run until interrupted.
    pub async fn run(self) -> Result<()> {
        let app = crate::http::create_router(self.state.clone());
        let listener = TcpListener::bind(self.bind)
            .await
            .map_err(|source| SearchError::BindFailed {
                addr: self.bind,
                source,
            })?;

        info!("Search service listening on {}", self.bind);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .map_err(SearchError::Io)?;

        Ok(())
    }
}
