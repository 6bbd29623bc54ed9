//! API Handlers
//!
//! HTTP request handlers for the cache and rate limit endpoints.

use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::cache::{Cache, CacheOptions};
use crate::config::Config;
use crate::error::{Result, ToolkitError};
use crate::models::{
    ClearResponse, DeleteResponse, EntriesResponse, GetResponse, HealthResponse, SetRequest,
    SetResponse, StorageQuery,
};
use crate::rate_limit::{RateLimitResult, RateLimiter};
use crate::storage::ExternalStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<RwLock<Cache>>,
    pub limiter: Arc<RwLock<RateLimiter>>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates a new AppState from prepared engines.
    pub fn new(cache: Cache, limiter: RateLimiter, config: Config) -> Self {
        Self {
            cache: Arc::new(RwLock::new(cache)),
            limiter: Arc::new(RwLock::new(limiter)),
            config: Arc::new(config),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// `external` backs the limiter when `RATE_LIMIT_STORAGE=redis`.
    pub fn from_config(config: Config, external: Option<Arc<dyn ExternalStore>>) -> Self {
        let cache = Cache::new(config.cache_defaults());
        let mut defaults = config.rate_limit_defaults();
        defaults.external = external;
        Self::new(cache, RateLimiter::new(defaults), config)
    }
}

/// Handler for PUT /cache
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ToolkitError::InvalidRequest(error_msg));
    }

    let mut cache = state.cache.write().await;
    cache.set(&req.key, &req.value, Some(req.options))?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /cache/:key
///
/// Takes the write lock: every read spends a use.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<StorageQuery>,
) -> Result<Json<GetResponse>> {
    let options = CacheOptions {
        storage: query.storage,
        ..CacheOptions::default()
    };

    let mut cache = state.cache.write().await;
    let value: Value = cache
        .get(&key, Some(options))?
        .ok_or_else(|| ToolkitError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<StorageQuery>,
) -> Result<Json<DeleteResponse>> {
    let mut cache = state.cache.write().await;
    cache.reset(&key, query.storage)?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /cache
pub async fn list_handler(
    State(state): State<AppState>,
    Query(query): Query<StorageQuery>,
) -> Json<EntriesResponse> {
    let cache = state.cache.read().await;
    let storage = query
        .storage
        .or(cache.defaults().storage)
        .unwrap_or_default();

    Json(EntriesResponse::new(storage, cache.get_all(Some(storage))))
}

/// Handler for DELETE /cache
pub async fn clear_handler(
    State(state): State<AppState>,
    Query(query): Query<StorageQuery>,
) -> Result<Json<ClearResponse>> {
    let mut cache = state.cache.write().await;
    let storage = query
        .storage
        .or(cache.defaults().storage)
        .unwrap_or_default();
    cache.clear_all(Some(storage))?;

    Ok(Json(ClearResponse::new(storage)))
}

/// Handler for POST /limit/:key
///
/// Responds 429 with the same body once the key is blocked.
pub async fn limit_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<(StatusCode, Json<RateLimitResult>)> {
    let options = state.config.rate_limit_options(&key);

    // External counters live outside the limiter, so a shared lock suffices
    let external = state.limiter.read().await.uses_external(&options);
    let result = if external {
        state.limiter.read().await.check_external(options).await?
    } else {
        state.limiter.write().await.check(options).await?
    };

    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::TOO_MANY_REQUESTS
    };
    Ok((status, Json(result)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
