//! In-memory feed and fixtures for engine tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use searcher_core::{TenantCredentials, TenantRegistry};
use searcher_core::cache::documents::extract_id;

use crate::upstream::{DocumentFeed, Page, PageQuery, UpstreamError};

type Handler = dyn Fn(&str, &PageQuery) -> Result<Page, UpstreamError> + Send + Sync;

/// Programmable [`DocumentFeed`] with a call counter.
pub struct FakeFeed {
    calls: AtomicU64,
    handler: Box<Handler>,
}

impl FakeFeed {
    pub fn new(handler: impl Fn(&str, &PageQuery) -> Result<Page, UpstreamError> + Send + Sync + 'static) -> Self {
        Self { calls: AtomicU64::new(0), handler: Box::new(handler) }
    }

    /// Number of fetch_page calls made so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentFeed for FakeFeed {
    async fn fetch_page(&self, endpoint: &str, _api_key: &str, query: &PageQuery) -> Result<Page, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.handler)(endpoint, query)
    }
}

/// A feed backed by a fixed upstream dataset, honoring start/limit paging,
/// the metadata flag, and both day filters the way the real feed does.
pub fn dataset_feed(items: Vec<Value>) -> FakeFeed {
    FakeFeed::new(move |_endpoint, query| {
        let mut matching: Vec<Value> = items
            .iter()
            .filter(|item| {
                let day = item.get("date").and_then(Value::as_str).unwrap_or("");
                if let Some(after) = &query.date_after {
                    return day > after.as_str();
                }
                if let Some(on) = &query.date {
                    return day == on.as_str();
                }
                true
            })
            .cloned()
            .collect();

        // newest first, like the real feed
        matching.sort_by(|a, b| {
            let key = |v: &Value| {
                (
                    v.get("datetime").and_then(Value::as_str).unwrap_or("").to_string(),
                    v.get("date").and_then(Value::as_str).unwrap_or("").to_string(),
                    extract_id(v).unwrap_or(0),
                )
            };
            key(b).cmp(&key(a))
        });

        let total = matching.len() as u64;
        let page: Vec<Value> = matching
            .into_iter()
            .skip(query.start as usize)
            .take(query.limit as usize)
            .collect();
        Ok(Page { total: query.metadata.then_some(total), items: page })
    })
}

/// Two-store registry used across the engine tests.
pub fn sample_registry() -> TenantRegistry {
    let mut tenants = BTreeMap::new();
    tenants.insert(
        "pasto".to_string(),
        TenantCredentials {
            api_key: "key-pasto".into(),
            invoices_url: "https://api.example.com/pasto/invoices".into(),
            bills_url: "https://api.example.com/pasto/bills".into(),
            display_name: Some("Smart Gadgets Pasto".into()),
        },
    );
    tenants.insert(
        "medellin".to_string(),
        TenantCredentials {
            api_key: "key-medellin".into(),
            invoices_url: "https://api.example.com/medellin/invoices".into(),
            bills_url: "https://api.example.com/medellin/bills".into(),
            display_name: None,
        },
    );
    TenantRegistry::new(&tenants)
}
