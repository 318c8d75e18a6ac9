//! Upstream feed client and sync engine.
//!
//! This crate talks to the paginated upstream document feeds (rate-limit
//! aware) and drives the cache-synchronization state machine on top of
//! searcher-core's storage.

pub mod sync;
pub mod upstream;

pub use sync::{CachedView, StoreKindStats, SyncEngine};
pub use upstream::{ApiClient, ApiClientConfig, DocumentFeed, Page, PageQuery, UpstreamError};
