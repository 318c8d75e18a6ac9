//! Unified error types for the document mirror.

use tokio_rusqlite::rusqlite;

/// Unified error type shared across the cache, registry, and sync engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown store id. Rejected before any upstream I/O; the message
    /// enumerates the configured stores so callers can self-correct.
    #[error("invalid store '{store}', valid stores: {}", .valid.join(", "))]
    InvalidTenant { store: String, valid: Vec<String> },

    /// Upstream API unreachable or returned a non-retryable failure.
    #[error("upstream unavailable: {0}")]
    Upstream(String),

    /// Upstream rate limit still in effect after all retries.
    #[error("rate limited: retries exhausted: {0}")]
    RateLimited(String),

    /// A fetched payload could not be keyed (missing or non-integer id).
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Database operation failed.
    #[error("cache error: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("cache error: migration failed: {0}")]
    MigrationFailed(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_tenant_lists_valid_stores() {
        let err = Error::InvalidTenant {
            store: "bogota".into(),
            valid: vec!["medellin".into(), "pasto".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("bogota"));
        assert!(msg.contains("medellin, pasto"));
    }

    #[test]
    fn test_upstream_display() {
        let err = Error::Upstream("connection refused".into());
        assert!(err.to_string().contains("upstream unavailable"));
    }
}
