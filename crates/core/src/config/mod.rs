//! Application configuration with layered loading.
//!
//! Configuration is assembled with figment from three layers:
//!
//! 1. Environment variables (SEARCHER_*)
//! 2. TOML config file (if SEARCHER_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Tenants live under `[tenants.<store>]` tables in TOML, or
//! `SEARCHER_TENANTS__<STORE>__API_KEY` style environment variables.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::tenants::TenantCredentials;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SEARCHER_*)
/// 2. TOML config file (if SEARCHER_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache database.
    ///
    /// Set via SEARCHER_DB_PATH.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address the HTTP server binds to.
    ///
    /// Set via SEARCHER_LISTEN_ADDR.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// User-Agent string for upstream requests.
    ///
    /// Set via SEARCHER_USER_AGENT.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upstream request timeout in milliseconds.
    ///
    /// Set via SEARCHER_TIMEOUT_MS.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// UTC hours at which the scheduled full resync fires.
    ///
    /// Set via SEARCHER_SYNC_HOURS_UTC (e.g. `[1, 18]` in TOML).
    #[serde(default = "default_sync_hours")]
    pub sync_hours_utc: Vec<u32>,

    /// Store id -> upstream credentials.
    #[serde(default)]
    pub tenants: BTreeMap<String, TenantCredentials>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./searcher-cache.sqlite")
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".into()
}

fn default_user_agent() -> String {
    "searcher/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_sync_hours() -> Vec<u32> {
    vec![1, 18]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            listen_addr: default_listen_addr(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            sync_hours_utc: default_sync_hours(),
            tenants: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a layer cannot be read or validation fails
    /// after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SEARCHER_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SEARCHER_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./searcher-cache.sqlite"));
        assert_eq!(config.listen_addr, "127.0.0.1:3000");
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.sync_hours_utc, vec![1, 18]);
        assert!(config.tenants.is_empty());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }
}
