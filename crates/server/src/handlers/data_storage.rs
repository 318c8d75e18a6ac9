//! Cross-store storage management endpoints.
//!
//! The bulk operations walk every configured store (or one, when `store` is
//! given) and both document kinds, collecting per-target outcomes instead of
//! aborting on the first failure.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use searcher_client::StoreKindStats;
use searcher_core::DocKind;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OptionalStoreQuery {
    pub store: Option<String>,
}

/// Outcome for one (store, kind) in a bulk operation.
#[derive(Debug, Serialize)]
pub struct BulkOutcome {
    pub store: String,
    pub kind: DocKind,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkResponse {
    pub results: Vec<BulkOutcome>,
}

/// `GET /data-storage/stats` — status summary for every store and kind.
pub async fn stats(State(state): State<AppState>) -> Result<Json<Vec<StoreKindStats>>, ApiError> {
    Ok(Json(state.engine.stats().await?))
}

/// `POST /data-storage/ensure-full-persistence?store=` — synchronous full
/// loads across stores; all stores when `store` is omitted.
pub async fn ensure_full_persistence(
    State(state): State<AppState>,
    Query(q): Query<OptionalStoreQuery>,
) -> Result<Json<BulkResponse>, ApiError> {
    let stores = target_stores(&state, q.store)?;
    let mut results = Vec::new();
    for store in stores {
        for kind in DocKind::all() {
            let outcome = state.engine.ensure_full_persistence(&store, kind).await;
            results.push(to_outcome(&store, kind, outcome));
        }
    }
    Ok(Json(BulkResponse { results }))
}

/// `POST /data-storage/reload-all?store=` — forced reload across stores.
pub async fn reload_all(
    State(state): State<AppState>,
    Query(q): Query<OptionalStoreQuery>,
) -> Result<Json<BulkResponse>, ApiError> {
    let stores = target_stores(&state, q.store)?;
    let mut results = Vec::new();
    for store in stores {
        for kind in DocKind::all() {
            let outcome = state.engine.clear_and_reload(&store, kind).await;
            results.push(to_outcome(&store, kind, outcome));
        }
    }
    Ok(Json(BulkResponse { results }))
}

/// Explicit store must exist; otherwise every configured store.
fn target_stores(state: &AppState, store: Option<String>) -> Result<Vec<String>, ApiError> {
    match store {
        Some(store) => {
            state.engine.registry().resolve(&store)?;
            Ok(vec![store.to_lowercase()])
        }
        None => Ok(state.engine.registry().store_ids()),
    }
}

fn to_outcome(store: &str, kind: DocKind, result: Result<(), searcher_core::Error>) -> BulkOutcome {
    match result {
        Ok(()) => BulkOutcome { store: store.to_string(), kind, success: true, error: None },
        Err(e) => {
            tracing::error!(store, kind = %kind, error = %e, "bulk operation failed for store");
            BulkOutcome { store: store.to_string(), kind, success: false, error: Some(e.to_string()) }
        }
    }
}
