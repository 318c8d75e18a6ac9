//! Configuration validation rules.
//!
//! Validation runs after all layers are merged, so a bad env override is
//! caught the same way as a bad config file.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is under 100ms or over 5 minutes
    /// - `sync_hours_utc` is empty or contains an hour outside 0-23
    /// - any tenant has an empty api_key or endpoint URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.sync_hours_utc.is_empty() {
            return Err(ConfigError::Invalid {
                field: "sync_hours_utc".into(),
                reason: "must list at least one hour".into(),
            });
        }
        if let Some(hour) = self.sync_hours_utc.iter().find(|h| **h > 23) {
            return Err(ConfigError::Invalid {
                field: "sync_hours_utc".into(),
                reason: format!("hour {hour} is out of range 0-23"),
            });
        }

        for (store, creds) in &self.tenants {
            if creds.api_key.is_empty() {
                return Err(ConfigError::Invalid {
                    field: format!("tenants.{store}.api_key"),
                    reason: "must not be empty".into(),
                });
            }
            if creds.invoices_url.is_empty() || creds.bills_url.is_empty() {
                return Err(ConfigError::Invalid {
                    field: format!("tenants.{store}"),
                    reason: "invoices_url and bills_url must not be empty".into(),
                });
            }
        }

        if self.tenants.is_empty() {
            tracing::warn!("no tenants configured; every request will be rejected as an invalid store");
        }

        Ok(())
    }
}
