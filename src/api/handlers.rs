//! API Handlers
//!
//! Every key endpoint that reads a key also renews it, so clients keep a
//! session alive simply by using it.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use crate::cache::{CacheMap, ExpiryCallback};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_key, AppendRequest, ExpiryInfo, ExpiryResponse, HealthResponse, PutRequest,
    StatsResponse, ValueResponse, WheelInfo,
};
use crate::tasks::TokioTicker;

/// Application state shared across all handlers.
///
/// The cache map synchronizes internally, so it is shared through a bare `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheMap<String, String>>,
    /// Timeout applied when a put does not carry one
    pub default_ttl: Duration,
}

impl AppState {
    pub fn new(cache: CacheMap<String, String>, default_ttl: Duration) -> Self {
        Self {
            cache: Arc::new(cache),
            default_ttl,
        }
    }

    /// Builds the map from configuration and ticks it from a task on the
    /// current tokio runtime.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = CacheMap::with_driver(
            &TokioTicker::current(),
            config.tick_interval(),
            config.ttl_limit(),
        )?;
        Ok(Self::new(cache, config.default_ttl()))
    }

    /// Where the wheel will release a key accessed now with `timeout`.
    fn expiry_of(&self, timeout: Duration) -> Option<ExpiryInfo> {
        self.cache
            .expiry_ticks(timeout)
            .map(|ticks| ExpiryInfo::new(timeout, self.cache.effective_timeout(timeout), ticks))
    }
}

/// Handler for PUT /keys/:key
///
/// Replaces the value and timeout. Expiry is logged at debug level.
pub async fn put_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<PutRequest>,
) -> Result<Json<ExpiryResponse>> {
    validate_key(&key)?;

    let timeout = req.timeout_or(state.default_ttl);
    let on_expire: Option<ExpiryCallback> = if timeout.is_zero() {
        None
    } else {
        let expired = key.clone();
        Some(Box::new(move || debug!(key = %expired, "Key expired")))
    };
    state.cache.insert(key.clone(), req.value, timeout, on_expire);

    Ok(Json(ExpiryResponse::new(key, state.expiry_of(timeout))))
}

/// Handler for GET /keys/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ValueResponse>> {
    match state.cache.get(&key) {
        Some(value) => Ok(Json(ValueResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for POST /keys/:key/touch
///
/// Renews a key without transferring its value.
pub async fn touch_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ExpiryResponse>> {
    let timeout = state
        .cache
        .renew(&key)
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;
    Ok(Json(ExpiryResponse::new(key, state.expiry_of(timeout))))
}

/// Handler for POST /keys/:key/append
///
/// Appends to the stored value, creating a permanent empty entry first when
/// the key is absent. An existing key keeps its timeout and is renewed.
pub async fn append_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<AppendRequest>,
) -> Result<Json<ValueResponse>> {
    validate_key(&key)?;

    let value = {
        let mut value = state.cache.get_or_create(key.clone());
        value.push_str(&req.value);
        value.clone()
    };
    Ok(Json(ValueResponse::new(key, value)))
}

/// Handler for DELETE /keys/:key
///
/// Erases the key without running its expiry callback.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode> {
    if state.cache.erase(&key) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(CacheError::NotFound(key))
    }
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = &state.cache;
    let wheel = WheelInfo::new(cache.interval(), cache.limit(), cache.capacity());
    Json(StatsResponse::new(cache.stats(), wheel))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.len()))
}
