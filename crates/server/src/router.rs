//! Router configuration and route composition.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{data_storage, documents, health};
use crate::state::AppState;

/// Creates the application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/:kind/all", get(documents::get_all))
        .route("/:kind/update", get(documents::update))
        .route("/:kind/reload", get(documents::reload))
        .route("/:kind/ensure-full-persistence", get(documents::ensure_full_persistence))
        .route("/:kind/reset-sync", get(documents::reset_sync))
        .route("/data-storage/stats", get(data_storage::stats))
        .route("/data-storage/ensure-full-persistence", post(data_storage::ensure_full_persistence))
        .route("/data-storage/reload-all", post(data_storage::reload_all))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
