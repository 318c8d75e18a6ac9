//! Cache synchronization engine.
//!
//! One engine instance serves every tenant and both document kinds. All
//! public operations resolve the tenant first, so unknown stores are
//! rejected before any upstream or database I/O.
//!
//! Concurrency is cooperative: `is_syncing` in the status row is a
//! best-effort read-then-write guard, and racing triggers are harmless
//! because persistence is an idempotent upsert. Background work never
//! surfaces errors to readers; it logs them and clears the flag.

pub mod full_load;
pub mod incremental;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use searcher_core::{CacheDb, DocKind, Document, Error, TenantRegistry};

use crate::upstream::DocumentFeed;

/// Sync engine over a document feed implementation.
///
/// Generic over [`DocumentFeed`] so tests can substitute an in-memory feed.
pub struct SyncEngine<F: DocumentFeed> {
    db: CacheDb,
    feed: Arc<F>,
    registry: TenantRegistry,
}

impl<F: DocumentFeed> Clone for SyncEngine<F> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), feed: Arc::clone(&self.feed), registry: self.registry.clone() }
    }
}

/// Snapshot returned by [`SyncEngine::get_cached`]: local data only, plus
/// enough status for the caller to render progress.
#[derive(Debug, Clone, Serialize)]
pub struct CachedView {
    /// A sync is currently running for this store/kind.
    pub updating: bool,
    /// Number of documents currently cached.
    pub progress: u64,
    /// The cache has caught up with the upstream-reported total.
    pub fully_loaded: bool,
    /// Raw document payloads, newest first.
    pub data: Vec<Value>,
    pub store: String,
    pub store_display_name: String,
    /// Upstream-reported total record count.
    pub total: u64,
}

/// One row of the storage stats summary.
#[derive(Debug, Clone, Serialize)]
pub struct StoreKindStats {
    pub store: String,
    pub store_display_name: String,
    pub kind: DocKind,
    pub cached: u64,
    pub total: u64,
    pub fully_loaded: bool,
    pub syncing: bool,
    pub last_sync_datetime: Option<String>,
}

impl<F: DocumentFeed> SyncEngine<F> {
    pub fn new(db: CacheDb, feed: F, registry: TenantRegistry) -> Self {
        Self { db, feed: Arc::new(feed), registry }
    }

    pub fn registry(&self) -> &TenantRegistry {
        &self.registry
    }

    pub(crate) fn db(&self) -> &CacheDb {
        &self.db
    }

    pub(crate) fn feed(&self) -> &F {
        &self.feed
    }

    /// Return the cached snapshot for a store, triggering a background full
    /// load when the cache is empty or incomplete and no sync is running.
    ///
    /// Never waits on the upstream; background failures are logged only.
    pub async fn get_cached(&self, store: &str, kind: DocKind) -> Result<CachedView, Error> {
        self.registry.resolve(store)?;
        let store = store.to_lowercase();
        let status = self.db.sync_status(&store, kind).await?;

        if (!status.is_fully_loaded || status.total_records == 0) && !status.is_syncing {
            tracing::info!(%store, kind = %kind, "cache incomplete, starting background load");
            let engine = self.clone();
            let task_store = store.clone();
            tokio::spawn(async move {
                if let Err(e) = engine.full_load(&task_store, kind).await {
                    tracing::error!(store = %task_store, kind = %kind, error = %e, "background full load failed");
                }
            });
        }

        let docs = self.db.list_documents(kind, &store).await?;
        Ok(CachedView {
            updating: status.is_syncing,
            progress: docs.len() as u64,
            fully_loaded: status.is_fully_loaded,
            data: docs.into_iter().map(|d| d.data).collect(),
            store_display_name: self.registry.display_name(&store),
            store,
            total: status.total_records,
        })
    }

    /// Manually fetch documents newer than the last cached one.
    ///
    /// No-op when a sync is already running; falls back to a full load when
    /// the cache is empty. Upstream failures are logged, not propagated, so
    /// a flaky feed never breaks the caller's read that usually follows.
    pub async fn trigger_update(&self, store: &str, kind: DocKind) -> Result<(), Error> {
        self.registry.resolve(store)?;
        let store = store.to_lowercase();
        let status = self.db.sync_status(&store, kind).await?;
        if status.is_syncing {
            tracing::info!(%store, kind = %kind, "sync already in progress, skipping update");
            return Ok(());
        }

        let Some(last) = self.db.latest_document(kind, &store).await? else {
            tracing::info!(%store, kind = %kind, "cache empty, running full load instead of update");
            return self.full_load(&store, kind).await;
        };

        self.db.set_syncing(&store, kind, true).await?;
        let result = self.fetch_new_documents(&store, kind, &last).await;
        self.db.set_syncing(&store, kind, false).await?;

        if let Err(e) = result {
            tracing::error!(%store, kind = %kind, error = %e, "incremental update failed");
        }
        Ok(())
    }

    /// Reset status flags (keeping cached rows) and run a full load.
    pub async fn clear_and_reload(&self, store: &str, kind: DocKind) -> Result<(), Error> {
        self.registry.resolve(store)?;
        let store = store.to_lowercase();
        tracing::info!(%store, kind = %kind, "forcing full reload");

        let mut status = self.db.sync_status(&store, kind).await?;
        status.is_syncing = false;
        status.is_fully_loaded = false;
        self.db.save_sync_status(&status).await?;

        self.full_load(&store, kind).await
    }

    /// Run a full load synchronously, propagating failures.
    ///
    /// No-op when a sync is already running.
    pub async fn ensure_full_persistence(&self, store: &str, kind: DocKind) -> Result<(), Error> {
        self.registry.resolve(store)?;
        self.full_load(&store.to_lowercase(), kind).await
    }

    /// Clear stuck status flags without touching cached documents.
    pub async fn reset_sync_status(&self, store: &str, kind: DocKind) -> Result<(), Error> {
        self.registry.resolve(store)?;
        self.db.reset_sync_status(&store.to_lowercase(), kind).await
    }

    /// Scheduled resync: wipe both document tables, then full-load every
    /// tenant and kind. Per-store failures are logged and skipped.
    pub async fn sync_all(&self) -> Result<(), Error> {
        tracing::info!("scheduled resync: wiping document tables");
        for kind in DocKind::all() {
            let deleted = self.db.clear_documents(kind).await?;
            tracing::info!(kind = %kind, deleted, "cleared cached documents");
        }

        for store in self.registry.store_ids() {
            for kind in DocKind::all() {
                let mut status = self.db.sync_status(&store, kind).await?;
                status.is_fully_loaded = false;
                status.is_syncing = false;
                self.db.save_sync_status(&status).await?;

                if let Err(e) = self.full_load(&store, kind).await {
                    tracing::error!(%store, kind = %kind, error = %e, "scheduled full load failed");
                }
            }
        }
        Ok(())
    }

    /// Status summary for every configured store and kind.
    pub async fn stats(&self) -> Result<Vec<StoreKindStats>, Error> {
        let mut out = Vec::new();
        for store in self.registry.store_ids() {
            for kind in DocKind::all() {
                let status = self.db.sync_status(&store, kind).await?;
                let cached = self.db.count_documents(kind, &store).await?;
                out.push(StoreKindStats {
                    store: store.clone(),
                    store_display_name: self.registry.display_name(&store),
                    kind,
                    cached,
                    total: status.total_records,
                    fully_loaded: status.is_fully_loaded,
                    syncing: status.is_syncing,
                    last_sync_datetime: status.last_sync_datetime,
                });
            }
        }
        Ok(out)
    }

    /// Convert raw payloads to documents and upsert them.
    ///
    /// Payloads without a usable integer id are logged and skipped rather
    /// than failing the batch.
    pub(crate) async fn persist_payloads(&self, store: &str, kind: DocKind, payloads: Vec<Value>) -> Result<u64, Error> {
        let mut docs = Vec::with_capacity(payloads.len());
        for payload in payloads {
            match Document::from_payload(store, payload) {
                Ok(doc) => docs.push(doc),
                Err(e) => tracing::warn!(store, kind = %kind, error = %e, "skipping document without usable id"),
            }
        }
        if !docs.is_empty() {
            self.db.upsert_documents(kind, &docs).await?;
        }
        Ok(docs.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{dataset_feed, sample_registry, FakeFeed};
    use super::*;
    use crate::upstream::{Page, UpstreamError};
    use serde_json::json;

    async fn engine_with(feed: FakeFeed) -> SyncEngine<FakeFeed> {
        let db = CacheDb::open_in_memory().await.unwrap();
        SyncEngine::new(db, feed, sample_registry())
    }

    #[tokio::test]
    async fn test_get_cached_rejects_unknown_store_without_upstream_calls() {
        let engine = engine_with(dataset_feed(vec![json!({ "id": 1, "date": "2024-01-01" })])).await;

        let err = engine.get_cached("bogota", DocKind::Invoices).await.unwrap_err();
        match err {
            Error::InvalidTenant { store, valid } => {
                assert_eq!(store, "bogota");
                assert_eq!(valid, vec!["medellin".to_string(), "pasto".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(engine.feed().calls(), 0);
    }

    #[tokio::test]
    async fn test_get_cached_serves_snapshot_without_upstream_when_loaded() {
        let engine = engine_with(dataset_feed(vec![])).await;

        let docs = vec![Document::from_payload("pasto", json!({ "id": 1, "date": "2024-01-01" })).unwrap()];
        engine.db().upsert_documents(DocKind::Invoices, &docs).await.unwrap();
        let mut status = engine.db().sync_status("pasto", DocKind::Invoices).await.unwrap();
        status.total_records = 1;
        status.is_fully_loaded = true;
        engine.db().save_sync_status(&status).await.unwrap();

        let view = engine.get_cached("pasto", DocKind::Invoices).await.unwrap();
        assert_eq!(view.progress, 1);
        assert!(view.fully_loaded);
        assert!(!view.updating);
        assert_eq!(view.total, 1);
        assert_eq!(view.store_display_name, "Smart Gadgets Pasto");
        assert_eq!(view.data[0]["id"], 1);
        assert_eq!(engine.feed().calls(), 0);
    }

    #[tokio::test]
    async fn test_get_cached_triggers_background_load_when_empty() {
        let engine = engine_with(dataset_feed(vec![
            json!({ "id": 1, "date": "2024-01-01", "datetime": "2024-01-01 10:00:00" }),
            json!({ "id": 2, "date": "2024-01-02", "datetime": "2024-01-02 10:00:00" }),
        ]))
        .await;

        let view = engine.get_cached("pasto", DocKind::Bills).await.unwrap();
        assert_eq!(view.progress, 0);
        assert!(!view.fully_loaded);

        // wait for the detached load to finish
        for _ in 0..100 {
            let status = engine.db().sync_status("pasto", DocKind::Bills).await.unwrap();
            if status.is_fully_loaded {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let view = engine.get_cached("pasto", DocKind::Bills).await.unwrap();
        assert!(view.fully_loaded);
        assert_eq!(view.progress, 2);
        // newest first
        assert_eq!(view.data[0]["id"], 2);
    }

    #[tokio::test]
    async fn test_sync_all_wipes_and_reloads_every_store() {
        let engine = engine_with(dataset_feed(vec![
            json!({ "id": 1, "date": "2024-01-01", "datetime": "2024-01-01 10:00:00" }),
        ]))
        .await;

        // stale row that the wipe must remove
        let stale = vec![Document::from_payload("pasto", json!({ "id": 99, "date": "2020-01-01" })).unwrap()];
        engine.db().upsert_documents(DocKind::Invoices, &stale).await.unwrap();

        engine.sync_all().await.unwrap();

        for store in ["pasto", "medellin"] {
            for kind in DocKind::all() {
                assert_eq!(engine.db().count_documents(kind, store).await.unwrap(), 1, "{store}/{kind}");
                let status = engine.db().sync_status(store, kind).await.unwrap();
                assert!(status.is_fully_loaded);
                assert!(!status.is_syncing);
            }
        }
        // the stale document is gone, replaced by the upstream dataset
        let ids: Vec<i64> = engine
            .db()
            .list_documents(DocKind::Invoices, "pasto")
            .await
            .unwrap()
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[tokio::test]
    async fn test_sync_all_continues_past_failing_stores() {
        // pasto endpoints fail, medellin succeeds
        let feed = FakeFeed::new(|endpoint, query| {
            if endpoint.contains("pasto") {
                return Err(UpstreamError::HttpStatus { status: 500 });
            }
            let items = vec![json!({ "id": 5, "date": "2024-01-01" })];
            Ok(Page {
                total: query.metadata.then_some(1),
                items: if query.start == 0 { items } else { vec![] },
            })
        });
        let engine = engine_with(feed).await;

        engine.sync_all().await.unwrap();

        assert_eq!(engine.db().count_documents(DocKind::Invoices, "medellin").await.unwrap(), 1);
        assert_eq!(engine.db().count_documents(DocKind::Invoices, "pasto").await.unwrap(), 0);
        // failed store's flag is still cleared
        let status = engine.db().sync_status("pasto", DocKind::Invoices).await.unwrap();
        assert!(!status.is_syncing);
    }

    #[tokio::test]
    async fn test_stats_covers_every_store_and_kind() {
        let engine = engine_with(dataset_feed(vec![])).await;
        let stats = engine.stats().await.unwrap();
        assert_eq!(stats.len(), 4);
        assert!(stats.iter().any(|s| s.store == "pasto" && s.kind == DocKind::Bills));
        assert!(stats.iter().any(|s| s.store == "medellin" && s.kind == DocKind::Invoices));
    }

    #[tokio::test]
    async fn test_persist_payloads_skips_idless_documents() {
        let engine = engine_with(dataset_feed(vec![])).await;
        let persisted = engine
            .persist_payloads(
                "pasto",
                DocKind::Invoices,
                vec![json!({ "id": 1, "date": "2024-01-01" }), json!({ "date": "2024-01-01" })],
            )
            .await
            .unwrap();
        assert_eq!(persisted, 1);
        assert_eq!(engine.db().count_documents(DocKind::Invoices, "pasto").await.unwrap(), 1);
    }
}
