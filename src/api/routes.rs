//! API Routes
//!
//! Configures the Axum router with all product lookup endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    health_handler, passthrough_handler, rebuild_filter_handler, stats_handler, strategy_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /api/products/:id` - Direct store lookup
/// - `GET /api/products/:strategy/:id` - Lookup through `cache`, `null-cache`,
///   `bloom-filter`, `lock` or `wait-lock`
/// - `POST /api/admin/bloom-filter/rebuild` - Rebuild the existence filter
/// - `GET /stats` - Lookup, backend and filter statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/products/:id", get(passthrough_handler))
        .route("/api/products/:strategy/:id", get(strategy_handler))
        .route("/api/admin/bloom-filter/rebuild", post(rebuild_filter_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
