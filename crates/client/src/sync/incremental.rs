//! Incremental update: fetch only documents newer than the last cached one.
//!
//! The upstream day filters have calendar-day granularity, so catching up
//! takes two phases anchored on the last cached document:
//!
//! 1. strictly-after: `date_after = <anchor day>` pages, advancing the
//!    cursor to the day of the last item of each page;
//! 2. same-day: `date = <anchor day>` pages, keeping only items whose
//!    `datetime` is strictly greater than the anchor's. Items without a
//!    `datetime` cannot be ordered within the day and are dropped.
//!
//! The merged result is deduplicated by id (first occurrence wins) before
//! the upsert.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use searcher_core::cache::documents::{DATE_FORMAT, DATETIME_FORMAT, extract_id};
use searcher_core::{DocKind, Document, Error};

use super::SyncEngine;
use crate::upstream::{DocumentFeed, INCREMENTAL_LIMIT, PageQuery};

impl<F: DocumentFeed> SyncEngine<F> {
    /// Fetch and persist documents newer than `last`.
    ///
    /// Caller holds the `is_syncing` guard.
    pub(crate) async fn fetch_new_documents(&self, store: &str, kind: DocKind, last: &Document) -> Result<(), Error> {
        let creds = self.registry().resolve(store)?.clone();
        let endpoint = creds.endpoint(kind);
        let anchor_day = last.cursor_day();

        tracing::info!(store, kind = %kind, anchor = %anchor_day, last_id = last.id, "looking for new documents");

        let mut collected: Vec<Value> = Vec::new();

        // phase one: days strictly after the anchor
        let mut cursor = anchor_day;
        let mut reported_total: Option<u64> = None;
        loop {
            let query = PageQuery::after_day(cursor);
            let page = self.feed().fetch_page(endpoint, &creds.api_key, &query).await?;
            if page.total.is_some() {
                reported_total = page.total;
            }

            let fetched = page.items.len() as u64;
            let oldest_day = page.items.last().and_then(payload_day);
            collected.extend(page.items);
            tracing::debug!(store, kind = %kind, cursor = %cursor, fetched, "catch-up page");

            if fetched < INCREMENTAL_LIMIT {
                break;
            }
            if let Some(total) = reported_total
                && collected.len() as u64 >= total
            {
                break;
            }
            match oldest_day {
                Some(day) if day > cursor => cursor = day,
                _ => break,
            }
        }

        // phase two: the anchor day itself
        let mut start = 0;
        loop {
            let mut query = PageQuery::on_day(anchor_day, start);
            if kind == DocKind::Bills {
                // the bills feed requires the type discriminator for day-exact queries
                query = query.with_doc_type("bill");
            }
            let page = self.feed().fetch_page(endpoint, &creds.api_key, &query).await?;
            let fetched = page.items.len() as u64;

            for item in page.items {
                let newer = match (payload_datetime(&item), last.datetime) {
                    (Some(dt), Some(anchor_dt)) => dt > anchor_dt,
                    _ => false,
                };
                if newer {
                    collected.push(item);
                }
            }

            if fetched < INCREMENTAL_LIMIT {
                break;
            }
            start += INCREMENTAL_LIMIT;
        }

        // dedup by id, first occurrence wins
        let mut seen = HashSet::new();
        collected.retain(|item| match extract_id(item) {
            Some(id) => seen.insert(id),
            None => true,
        });

        if collected.is_empty() {
            tracing::info!(store, kind = %kind, "no new documents");
        } else {
            let persisted = self.persist_payloads(store, kind, collected).await?;
            tracing::info!(store, kind = %kind, persisted, "incremental update persisted new documents");
        }

        let cached = self.db().count_documents(kind, store).await?;
        let mut status = self.db().sync_status(store, kind).await?;
        status.total_records = status.total_records.max(cached);
        status.last_sync_datetime = Some(Utc::now().to_rfc3339());
        self.db().save_sync_status(&status).await?;
        Ok(())
    }
}

fn payload_datetime(item: &Value) -> Option<NaiveDateTime> {
    item.get("datetime")
        .and_then(Value::as_str)
        .and_then(|s| NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).ok())
}

fn payload_day(item: &Value) -> Option<NaiveDate> {
    payload_datetime(item).map(|dt| dt.date()).or_else(|| {
        item.get("date")
            .and_then(Value::as_str)
            .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
    })
}
