//! Tenant registry: store id -> upstream credentials.
//!
//! Each store is an independent tenant with its own API key and feed
//! endpoints. The registry is built once at startup from configuration and
//! is read-only afterwards. Unknown store ids are rejected here, before any
//! upstream I/O happens.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Upstream credentials and endpoints for one store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantCredentials {
    /// API key sent as Basic auth on every upstream request.
    pub api_key: String,

    /// Paginated sales-invoice feed endpoint.
    pub invoices_url: String,

    /// Paginated purchase-bill feed endpoint.
    pub bills_url: String,

    /// Human-readable name for logs and responses (defaults to the store id).
    #[serde(default)]
    pub display_name: Option<String>,
}

impl TenantCredentials {
    /// Feed endpoint for a document kind.
    pub fn endpoint(&self, kind: crate::DocKind) -> &str {
        match kind {
            crate::DocKind::Invoices => &self.invoices_url,
            crate::DocKind::Bills => &self.bills_url,
        }
    }
}

/// Immutable map from store id to credentials.
///
/// Store ids are normalized to lowercase both at build time and at lookup.
#[derive(Debug, Clone)]
pub struct TenantRegistry {
    tenants: BTreeMap<String, TenantCredentials>,
}

impl TenantRegistry {
    /// Build a registry from the configured tenant map.
    pub fn new(tenants: &BTreeMap<String, TenantCredentials>) -> Self {
        let tenants = tenants
            .iter()
            .map(|(id, creds)| (id.to_lowercase(), creds.clone()))
            .collect();
        Self { tenants }
    }

    /// Resolve a store id to its credentials.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTenant` with the list of valid store ids if
    /// the store is unknown.
    pub fn resolve(&self, store: &str) -> Result<&TenantCredentials, Error> {
        self.tenants
            .get(&store.to_lowercase())
            .ok_or_else(|| Error::InvalidTenant { store: store.to_string(), valid: self.store_ids() })
    }

    /// Whether a store id is configured.
    pub fn is_valid(&self, store: &str) -> bool {
        self.tenants.contains_key(&store.to_lowercase())
    }

    /// All configured store ids, sorted.
    pub fn store_ids(&self) -> Vec<String> {
        self.tenants.keys().cloned().collect()
    }

    /// Display name for a store, falling back to the id itself.
    pub fn display_name(&self, store: &str) -> String {
        self.tenants
            .get(&store.to_lowercase())
            .and_then(|creds| creds.display_name.clone())
            .unwrap_or_else(|| store.to_lowercase())
    }
}
