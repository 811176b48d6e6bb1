//! HTTP router and request handlers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{ConnectInfo, FromRequestParts, Query, State};
use axum::http::{HeaderMap, StatusCode, request::Parts};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::error::SearchError;
use crate::query::SearchResult;
use crate::server::AppState;

/// Create the HTTP router with all endpoints.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/search/artists", get(search_artists))
        .route("/api/v1/search", get(api_search))
        .route("/stats", get(stats))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Peer address, when the server was built with connect info. Never
/// rejects, so handlers stay directly callable in tests.
struct ClientAddr(Option<SocketAddr>);

impl<S: Send + Sync> FromRequestParts<S> for ClientAddr {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0),
        ))
    }
}

/// Coalescing key: forwarded-for header first, then the peer IP, plus the
/// request path so different endpoints never cancel each other.
fn client_key(headers: &HeaderMap, addr: Option<SocketAddr>, path: &str) -> String {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .or_else(|| addr.map(|a| a.ip().to_string()))
        .unwrap_or_else(|| "no-client".to_string());
    format!("{ip}:{path}")
}

#[derive(Debug, Deserialize)]
struct ArtistSearchParams {
    q: String,
    limit: Option<usize>,
}

/// Handle `GET /search/artists?q=...&limit=...`.
async fn search_artists(
    State(state): State<Arc<AppState>>,
    ClientAddr(addr): ClientAddr,
    headers: HeaderMap,
    Query(params): Query<ArtistSearchParams>,
) -> Result<Json<Vec<SearchResult>>, AppError> {
    let limit = params.limit.unwrap_or(100).clamp(1, 100);
    let key = client_key(&headers, addr, "/search/artists");
    let results = state.search(key, params.q, limit).await?;
    Ok(Json(results))
}

#[derive(Debug, Deserialize)]
struct ApiSearchParams {
    #[serde(rename = "type", default = "default_search_type")]
    search_type: String,
    query: String,
}

fn default_search_type() -> String {
    "all".to_string()
}

/// Handle `GET /api/v1/search?type=...&query=...`.
///
/// Identical to the artist search with the limit fixed at 100; only the
/// `all` and `artist` types are supported.
async fn api_search(
    State(state): State<Arc<AppState>>,
    ClientAddr(addr): ClientAddr,
    headers: HeaderMap,
    Query(params): Query<ApiSearchParams>,
) -> Result<Json<Vec<SearchResult>>, AppError> {
    let search_type = params.search_type.to_lowercase();
    if search_type != "all" && search_type != "artist" {
        return Err(AppError::UnsupportedType(params.search_type));
    }
    let key = client_key(&headers, addr, "/api/v1/search");
    let results = state.search(key, params.query, 100).await?;
    Ok(Json(results))
}

/// Handle `GET /stats`.
async fn stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut indexes = serde_json::Map::new();
    let mut total_mb = 0.0f64;
    for db_path in [state.config.artist_db(), state.config.album_db()] {
        let name = db_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match std::fs::metadata(&db_path) {
            Ok(meta) => {
                let size_mb = meta.len() as f64 / 1_048_576.0;
                total_mb += size_mb;
                indexes.insert(
                    name,
                    json!({"exists": true, "size_mb": (size_mb * 100.0).round() / 100.0}),
                );
            }
            Err(_) => {
                indexes.insert(name, json!({"exists": false, "size_mb": 0}));
            }
        }
    }

    let config = &state.config;
    Json(json!({
        "search_indexes": indexes,
        "total_size_mb": (total_mb * 100.0).round() / 100.0,
        "metrics": state.metrics.snapshot(),
        "config": {
            "MIN_QUERY_LEN": config.min_query_len,
            "DEBOUNCE_MS": config.debounce_ms,
            "FUZZY_MIN_LEN": config.fuzzy_min_len,
            "CACHE_TTL_MS": config.cache_ttl_ms,
            "CACHE_MAX_SIZE": config.cache_max_size,
            "INNER_LIMIT_MULT": config.inner_limit_mult,
            "INNER_LIMIT_MAX": config.inner_limit_max,
        },
    }))
}

/// Handle `GET /health`. Liveness only.
async fn health() -> Json<Value> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();
    Json(json!({
        "status": "healthy",
        "service": "mbflat-search",
        "timestamp": timestamp,
    }))
}

/// Application-level error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Unsupported search type (400)
    UnsupportedType(String),
    /// Search failure: missing index (503) or unexpected error (500)
    Search(SearchError),
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        Self::Search(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::UnsupportedType(kind) => (
                StatusCode::BAD_REQUEST,
                format!("Only 'artist' and 'all' search types supported, got '{kind}'"),
            ),
            Self::Search(SearchError::IndexUnavailable(path)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Search index not available: {}", path.display()),
            ),
            Self::Search(err) => {
                error!("Search failed: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Search failed: {err}"))
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
