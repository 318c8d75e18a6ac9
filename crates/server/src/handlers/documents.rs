//! Per-kind document endpoints.
//!
//! Every route takes the document kind as a path segment (`invoices` or
//! `bills`) and the store as a query parameter. Unknown stores come back as
//! 400 with the list of valid ids.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use searcher_client::CachedView;
use searcher_core::DocKind;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StoreQuery {
    pub store: String,
}

/// Acknowledgement body for operations that return no data.
#[derive(Debug, Serialize)]
pub struct OpResponse {
    pub status: &'static str,
    pub store: String,
    pub kind: DocKind,
}

/// `GET /:kind/all?store=` — the cached snapshot, newest first.
pub async fn get_all(
    State(state): State<AppState>,
    Path(kind): Path<DocKind>,
    Query(q): Query<StoreQuery>,
) -> Result<Json<CachedView>, ApiError> {
    Ok(Json(state.engine.get_cached(&q.store, kind).await?))
}

/// `GET /:kind/update?store=` — incremental update, then the snapshot.
pub async fn update(
    State(state): State<AppState>,
    Path(kind): Path<DocKind>,
    Query(q): Query<StoreQuery>,
) -> Result<Json<CachedView>, ApiError> {
    state.engine.trigger_update(&q.store, kind).await?;
    Ok(Json(state.engine.get_cached(&q.store, kind).await?))
}

/// `GET /:kind/reload?store=` — forced full reload, then the snapshot.
pub async fn reload(
    State(state): State<AppState>,
    Path(kind): Path<DocKind>,
    Query(q): Query<StoreQuery>,
) -> Result<Json<CachedView>, ApiError> {
    state.engine.clear_and_reload(&q.store, kind).await?;
    Ok(Json(state.engine.get_cached(&q.store, kind).await?))
}

/// `GET /:kind/ensure-full-persistence?store=` — synchronous full load.
pub async fn ensure_full_persistence(
    State(state): State<AppState>,
    Path(kind): Path<DocKind>,
    Query(q): Query<StoreQuery>,
) -> Result<Json<OpResponse>, ApiError> {
    state.engine.ensure_full_persistence(&q.store, kind).await?;
    Ok(Json(OpResponse { status: "ok", store: q.store.to_lowercase(), kind }))
}

/// `GET /:kind/reset-sync?store=` — clear stuck sync flags.
pub async fn reset_sync(
    State(state): State<AppState>,
    Path(kind): Path<DocKind>,
    Query(q): Query<StoreQuery>,
) -> Result<Json<OpResponse>, ApiError> {
    state.engine.reset_sync_status(&q.store, kind).await?;
    Ok(Json(OpResponse { status: "ok", store: q.store.to_lowercase(), kind }))
}
