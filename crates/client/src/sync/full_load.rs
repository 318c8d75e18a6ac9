//! Full-load controller: mirror the entire feed in rate-limited batches.
//!
//! A full load probes the upstream total, then walks the feed in pages of
//! [`PAGE_SIZE`], two concurrent requests per batch with a pause between
//! batches. Failed pages are logged and skipped; the final count decides
//! `is_fully_loaded`, and a short load is picked up by the next trigger
//! rather than retried here.

use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;

use searcher_core::{DocKind, Error};

use super::SyncEngine;
use crate::upstream::{DocumentFeed, PAGE_SIZE, PageQuery};

/// Concurrent page requests per batch.
const BATCH_CONCURRENCY: usize = 2;

/// Pause between batches, to stay under the upstream rate limit.
const BATCH_PAUSE_MS: u64 = 800;

impl<F: DocumentFeed> SyncEngine<F> {
    /// Guarded full load: flip `is_syncing`, run, clear the flag on every
    /// path. No-op when a sync is already running.
    pub(crate) async fn full_load(&self, store: &str, kind: DocKind) -> Result<(), Error> {
        let status = self.db().sync_status(store, kind).await?;
        if status.is_syncing {
            tracing::info!(store, kind = %kind, "sync already in progress, skipping full load");
            return Ok(());
        }

        self.db().set_syncing(store, kind, true).await?;
        let result = self.load_all(store, kind).await;
        self.db().set_syncing(store, kind, false).await?;
        result
    }

    async fn load_all(&self, store: &str, kind: DocKind) -> Result<(), Error> {
        let creds = self.registry().resolve(store)?.clone();
        let endpoint = creds.endpoint(kind);

        let probe = self.feed().fetch_page(endpoint, &creds.api_key, &PageQuery::probe()).await?;
        let total = probe.total.unwrap_or(0);

        // record the total up front so readers can report progress
        let mut status = self.db().sync_status(store, kind).await?;
        status.total_records = total;
        self.db().save_sync_status(&status).await?;

        if total == 0 {
            status.is_fully_loaded = true;
            status.last_sync_datetime = Some(Utc::now().to_rfc3339());
            self.db().save_sync_status(&status).await?;
            tracing::info!(store, kind = %kind, "upstream reports no documents");
            return Ok(());
        }

        tracing::info!(store, kind = %kind, total, "starting full load");

        let starts: Vec<u64> = (0..total).step_by(PAGE_SIZE as usize).collect();
        let mut batches = starts.chunks(BATCH_CONCURRENCY).peekable();
        while let Some(batch) = batches.next() {
            let queries: Vec<PageQuery> = batch.iter().map(|&start| PageQuery::page(start)).collect();
            let results =
                join_all(queries.iter().map(|q| self.feed().fetch_page(endpoint, &creds.api_key, q))).await;

            let mut fetched = Vec::new();
            for (query, result) in queries.iter().zip(results) {
                match result {
                    Ok(page) => fetched.extend(page.items),
                    Err(e) => {
                        tracing::warn!(store, kind = %kind, start = query.start, error = %e, "page fetch failed, skipping");
                    }
                }
            }

            if !fetched.is_empty() {
                self.persist_payloads(store, kind, fetched).await?;
                let count = self.db().count_documents(kind, store).await?;
                tracing::info!(store, kind = %kind, count, total, "load progress");
            }

            if batches.peek().is_some() {
                tokio::time::sleep(Duration::from_millis(BATCH_PAUSE_MS)).await;
            }
        }

        let final_count = self.db().count_documents(kind, store).await?;
        let mut status = self.db().sync_status(store, kind).await?;
        status.is_fully_loaded = final_count >= total;
        status.last_sync_datetime = Some(Utc::now().to_rfc3339());
        self.db().save_sync_status(&status).await?;

        if final_count < total {
            tracing::warn!(store, kind = %kind, final_count, total, "full load finished short");
        } else {
            tracing::info!(store, kind = %kind, final_count, "full load complete");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{FakeFeed, dataset_feed, sample_registry};
    use super::*;
    use crate::upstream::{Page, UpstreamError};
    use searcher_core::CacheDb;
    use serde_json::{Value, json};

    async fn engine_with(feed: FakeFeed) -> SyncEngine<FakeFeed> {
        let db = CacheDb::open_in_memory().await.unwrap();
        SyncEngine::new(db, feed, sample_registry())
    }

    fn bill(id: i64, day: u32) -> Value {
        json!({
            "id": id,
            "date": format!("2024-02-{day:02}"),
            "datetime": format!("2024-02-{day:02} 12:00:00"),
            "number": format!("FC-{id}"),
        })
    }

    #[tokio::test]
    async fn test_full_load_mirrors_whole_feed() {
        // 45 bills: a probe plus two pages of 30
        let bills: Vec<Value> = (1..=45).map(|id| bill(id, (id % 28 + 1) as u32)).collect();
        let engine = engine_with(dataset_feed(bills)).await;

        engine.full_load("pasto", DocKind::Bills).await.unwrap();

        assert_eq!(engine.db().count_documents(DocKind::Bills, "pasto").await.unwrap(), 45);
        let status = engine.db().sync_status("pasto", DocKind::Bills).await.unwrap();
        assert_eq!(status.total_records, 45);
        assert!(status.is_fully_loaded);
        assert!(!status.is_syncing);
        assert!(status.last_sync_datetime.is_some());
        assert_eq!(engine.feed().calls(), 3);
    }

    #[tokio::test]
    async fn test_full_load_empty_feed_is_fully_loaded() {
        let engine = engine_with(dataset_feed(vec![])).await;

        engine.full_load("pasto", DocKind::Invoices).await.unwrap();

        let status = engine.db().sync_status("pasto", DocKind::Invoices).await.unwrap();
        assert_eq!(status.total_records, 0);
        assert!(status.is_fully_loaded);
        assert!(!status.is_syncing);
        // probe only
        assert_eq!(engine.feed().calls(), 1);
    }

    #[tokio::test]
    async fn test_full_load_skips_failed_pages() {
        // 60 documents but the second page always fails
        let feed = FakeFeed::new(|_endpoint, query| {
            if query.metadata {
                return Ok(Page { total: Some(60), items: vec![json!({ "id": 0, "date": "2024-02-01" })] });
            }
            if query.start == 30 {
                return Err(UpstreamError::HttpStatus { status: 500 });
            }
            let items = (1..=30).map(|id| json!({ "id": id, "date": "2024-02-01" })).collect();
            Ok(Page { total: None, items })
        });
        let engine = engine_with(feed).await;

        engine.full_load("pasto", DocKind::Bills).await.unwrap();

        assert_eq!(engine.db().count_documents(DocKind::Bills, "pasto").await.unwrap(), 30);
        let status = engine.db().sync_status("pasto", DocKind::Bills).await.unwrap();
        assert!(!status.is_fully_loaded);
        assert!(!status.is_syncing);
    }

    #[tokio::test]
    async fn test_full_load_noop_when_already_syncing() {
        let engine = engine_with(dataset_feed(vec![bill(1, 1)])).await;
        engine.db().sync_status("pasto", DocKind::Bills).await.unwrap();
        engine.db().set_syncing("pasto", DocKind::Bills, true).await.unwrap();

        engine.full_load("pasto", DocKind::Bills).await.unwrap();

        assert_eq!(engine.feed().calls(), 0);
        assert_eq!(engine.db().count_documents(DocKind::Bills, "pasto").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_full_load_clears_syncing_when_probe_fails() {
        let feed = FakeFeed::new(|_, _| Err(UpstreamError::Timeout));
        let engine = engine_with(feed).await;

        let err = engine.full_load("pasto", DocKind::Invoices).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));

        let status = engine.db().sync_status("pasto", DocKind::Invoices).await.unwrap();
        assert!(!status.is_syncing);
    }
}
