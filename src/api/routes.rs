//! API Routes

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    append_handler, delete_handler, get_handler, health_handler, put_handler, stats_handler,
    touch_handler, AppState,
};

/// Builds the router.
///
/// # Endpoints
/// - `PUT /keys/:key` - Store a value with an optional TTL
/// - `GET /keys/:key` - Read and renew a value
/// - `DELETE /keys/:key` - Erase a key silently
/// - `POST /keys/:key/touch` - Renew a key and report its expiry
/// - `POST /keys/:key/append` - Append to a value, creating it if absent
/// - `GET /stats` - Counters and wheel geometry
/// - `GET /health` - Liveness
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/keys/:key",
            get(get_handler).put(put_handler).delete(delete_handler),
        )
        .route("/keys/:key/touch", post(touch_handler))
        .route("/keys/:key/append", post(append_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
