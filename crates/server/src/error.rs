//! HTTP error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use searcher_core::Error;

/// API error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_stores: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone()),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg.clone())
            }
        };

        let body = Json(ErrorResponse { error: error_type.to_string(), message, valid_stores: None });
        (status, body).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match &err {
            Error::InvalidTenant { .. } => ApiError::BadRequest(err.to_string()),
            Error::Upstream(_) | Error::RateLimited(_) => ApiError::ServiceUnavailable(err.to_string()),
            Error::Database(_) | Error::MigrationFailed(_) | Error::InvalidDocument(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_tenant_maps_to_bad_request() {
        let err = Error::InvalidTenant { store: "bogota".into(), valid: vec!["pasto".into()] };
        let api: ApiError = err.into();
        assert!(matches!(api, ApiError::BadRequest(msg) if msg.contains("bogota") && msg.contains("pasto")));
    }

    #[test]
    fn test_upstream_maps_to_service_unavailable() {
        let api: ApiError = Error::Upstream("boom".into()).into();
        assert!(matches!(api, ApiError::ServiceUnavailable(_)));

        let api: ApiError = Error::RateLimited("slow down".into()).into();
        assert!(matches!(api, ApiError::ServiceUnavailable(_)));
    }
}
