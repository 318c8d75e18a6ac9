//! Upstream feed client error types.

use std::sync::Arc;

/// Errors from the upstream document feed client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UpstreamError {
    /// Authentication failed (invalid API key).
    #[error("authentication failed: upstream rejected the API key")]
    AuthFailed,

    /// Rate limited by the upstream API.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// Non-success HTTP response.
    #[error("HTTP error: {status}")]
    HttpStatus { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response body did not match any known page shape.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { UpstreamError::Timeout } else { UpstreamError::Network(Arc::new(err)) }
    }
}

impl From<UpstreamError> for searcher_core::Error {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::RateLimited => searcher_core::Error::RateLimited(err.to_string()),
            other => searcher_core::Error::Upstream(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = UpstreamError::HttpStatus { status: 502 };
        assert!(err.to_string().contains("502"));

        let err = UpstreamError::RateLimited;
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_rate_limit_maps_to_core_rate_limited() {
        let core: searcher_core::Error = UpstreamError::RateLimited.into();
        assert!(matches!(core, searcher_core::Error::RateLimited(_)));

        let core: searcher_core::Error = UpstreamError::Timeout.into();
        assert!(matches!(core, searcher_core::Error::Upstream(_)));
    }
}
