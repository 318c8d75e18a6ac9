//! Health check endpoint.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Liveness probe: always healthy while the process serves requests.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy", version: env!("CARGO_PKG_VERSION") })
}
