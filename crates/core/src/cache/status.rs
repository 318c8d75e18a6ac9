//! Sync status rows: one per (store, kind).
//!
//! `is_syncing` is the engine's mutual-exclusion flag. It is a best-effort
//! read-then-write guard, not an atomic lock; the invariant that matters is
//! that every sync code path clears it on exit, error paths included. A row
//! stuck at `is_syncing = true` blocks all future syncs for that store/kind
//! until `reset` is called.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

use super::connection::CacheDb;
use super::documents::DocKind;
use crate::Error;

/// Per-(store, kind) synchronization state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub store: String,
    pub kind: DocKind,
    /// Upstream-reported total as of the last metadata probe.
    pub total_records: u64,
    /// True once a full load persisted at least `total_records` rows.
    pub is_fully_loaded: bool,
    /// Mutual-exclusion flag; see module docs.
    pub is_syncing: bool,
    /// RFC 3339 timestamp of the last completed sync, if any.
    pub last_sync_datetime: Option<String>,
}

impl CacheDb {
    /// Fetch the status row for (store, kind), creating it on first access.
    pub async fn sync_status(&self, store: &str, kind: DocKind) -> Result<SyncStatus, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<SyncStatus, Error> {
                let now = Utc::now().to_rfc3339();
                conn.execute(
                    "INSERT INTO sync_status (store, kind, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?3)
                     ON CONFLICT(store, kind) DO NOTHING",
                    params![store, kind.as_str(), now],
                )?;

                let status = conn.query_row(
                    "SELECT total_records, is_fully_loaded, is_syncing, last_sync_datetime
                     FROM sync_status WHERE store = ?1 AND kind = ?2",
                    params![store, kind.as_str()],
                    |row| {
                        Ok(SyncStatus {
                            store: store.clone(),
                            kind,
                            total_records: row.get::<_, i64>(0)? as u64,
                            is_fully_loaded: row.get::<_, i64>(1)? == 1,
                            is_syncing: row.get::<_, i64>(2)? == 1,
                            last_sync_datetime: row.get(3)?,
                        })
                    },
                )?;
                Ok(status)
            })
            .await
            .map_err(Error::from)
    }

    /// Write the full status row back.
    pub async fn save_sync_status(&self, status: &SyncStatus) -> Result<(), Error> {
        let status = status.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "UPDATE sync_status SET
                         total_records = ?3,
                         is_fully_loaded = ?4,
                         is_syncing = ?5,
                         last_sync_datetime = ?6,
                         updated_at = ?7
                     WHERE store = ?1 AND kind = ?2",
                    params![
                        status.store,
                        status.kind.as_str(),
                        status.total_records as i64,
                        status.is_fully_loaded as i64,
                        status.is_syncing as i64,
                        status.last_sync_datetime,
                        Utc::now().to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Flip just the `is_syncing` flag.
    ///
    /// Kept separate from `save_sync_status` so cleanup paths don't clobber
    /// totals written by a racing sync.
    pub async fn set_syncing(&self, store: &str, kind: DocKind, syncing: bool) -> Result<(), Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "UPDATE sync_status SET is_syncing = ?3, updated_at = ?4
                     WHERE store = ?1 AND kind = ?2",
                    params![store, kind.as_str(), syncing as i64, Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Clear stuck flags for a store/kind without touching cached rows.
    pub async fn reset_sync_status(&self, store: &str, kind: DocKind) -> Result<(), Error> {
        let mut status = self.sync_status(store, kind).await?;
        status.is_syncing = false;
        status.is_fully_loaded = false;
        status.last_sync_datetime = None;
        self.save_sync_status(&status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_created_on_first_access() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let status = db.sync_status("pasto", DocKind::Invoices).await.unwrap();
        assert_eq!(status.total_records, 0);
        assert!(!status.is_fully_loaded);
        assert!(!status.is_syncing);
        assert!(status.last_sync_datetime.is_none());
    }

    #[tokio::test]
    async fn test_status_rows_are_per_store_and_kind() {
        let db = CacheDb::open_in_memory().await.unwrap();

        let mut invoices = db.sync_status("pasto", DocKind::Invoices).await.unwrap();
        invoices.total_records = 45;
        db.save_sync_status(&invoices).await.unwrap();

        let bills = db.sync_status("pasto", DocKind::Bills).await.unwrap();
        assert_eq!(bills.total_records, 0);

        let other_store = db.sync_status("medellin", DocKind::Invoices).await.unwrap();
        assert_eq!(other_store.total_records, 0);

        let reread = db.sync_status("pasto", DocKind::Invoices).await.unwrap();
        assert_eq!(reread.total_records, 45);
    }

    #[tokio::test]
    async fn test_set_syncing_preserves_totals() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let mut status = db.sync_status("pasto", DocKind::Bills).await.unwrap();
        status.total_records = 10;
        status.is_fully_loaded = true;
        db.save_sync_status(&status).await.unwrap();

        db.set_syncing("pasto", DocKind::Bills, true).await.unwrap();

        let reread = db.sync_status("pasto", DocKind::Bills).await.unwrap();
        assert!(reread.is_syncing);
        assert_eq!(reread.total_records, 10);
        assert!(reread.is_fully_loaded);
    }

    #[tokio::test]
    async fn test_reset_clears_flags() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let mut status = db.sync_status("pasto", DocKind::Bills).await.unwrap();
        status.is_syncing = true;
        status.is_fully_loaded = true;
        status.last_sync_datetime = Some(Utc::now().to_rfc3339());
        db.save_sync_status(&status).await.unwrap();

        db.reset_sync_status("pasto", DocKind::Bills).await.unwrap();

        let reread = db.sync_status("pasto", DocKind::Bills).await.unwrap();
        assert!(!reread.is_syncing);
        assert!(!reread.is_fully_loaded);
        assert!(reread.last_sync_datetime.is_none());
    }
}
