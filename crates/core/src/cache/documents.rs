//! Document storage: upsert-by-(store, id) with stable ordering.
//!
//! Documents are opaque upstream payloads. Only three things are extracted
//! for local use: the integer id (cache key), the calendar `date`, and the
//! optional `datetime` timestamp. Dates exist purely for ordering and
//! incremental-fetch cursoring and are never reinterpreted.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_rusqlite::params;

use super::connection::CacheDb;
use crate::Error;

/// Wire format of the upstream `date` field.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Wire format of the upstream `datetime` field.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The two mirrored document feeds. Synchronized independently per tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    Invoices,
    Bills,
}

impl DocKind {
    /// Cache table backing this kind.
    pub fn table(&self) -> &'static str {
        match self {
            DocKind::Invoices => "invoices",
            DocKind::Bills => "bills",
        }
    }

    /// Stable identifier used in sync_status rows and URLs.
    pub fn as_str(&self) -> &'static str {
        self.table()
    }

    /// Both kinds, for "do it for everything" loops.
    pub fn all() -> [DocKind; 2] {
        [DocKind::Invoices, DocKind::Bills]
    }
}

impl std::str::FromStr for DocKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invoices" => Ok(DocKind::Invoices),
            "bills" => Ok(DocKind::Bills),
            other => Err(format!("unknown document kind '{other}', expected 'invoices' or 'bills'")),
        }
    }
}

impl std::fmt::Display for DocKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cached document: the raw payload plus its extracted ordering keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub store: String,
    pub id: i64,
    pub data: Value,
    pub date: Option<NaiveDate>,
    pub datetime: Option<NaiveDateTime>,
}

impl Document {
    /// Build a document from a raw upstream payload.
    ///
    /// The upstream id is usually a JSON number but occasionally arrives as
    /// a numeric string; both are accepted. Unparseable `date`/`datetime`
    /// values degrade to None rather than failing the whole batch.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDocument` if the payload has no usable id.
    pub fn from_payload(store: &str, payload: Value) -> Result<Self, Error> {
        let id = extract_id(&payload)
            .ok_or_else(|| Error::InvalidDocument(format!("payload for '{store}' has no integer id")))?;

        let date = payload
            .get("date")
            .and_then(Value::as_str)
            .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok());
        let datetime = payload
            .get("datetime")
            .and_then(Value::as_str)
            .and_then(|s| NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).ok());

        Ok(Self { store: store.to_string(), id, data: payload, date, datetime })
    }

    /// Calendar day used as the incremental-fetch cursor.
    ///
    /// The upstream filter only supports day granularity, so the cursor is
    /// the datetime's day when present, else the date, else today.
    pub fn cursor_day(&self) -> NaiveDate {
        self.datetime
            .map(|dt| dt.date())
            .or(self.date)
            .unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// Pull the upstream id out of a raw payload (number or numeric string).
pub fn extract_id(payload: &Value) -> Option<i64> {
    match payload.get("id") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

impl CacheDb {
    /// Insert or update documents, keyed by (store, id).
    ///
    /// Idempotent: re-upserting the same id replaces the row in place, so
    /// concurrent syncs that fetch overlapping pages are harmless.
    pub async fn upsert_documents(&self, kind: DocKind, docs: &[Document]) -> Result<(), Error> {
        if docs.is_empty() {
            return Ok(());
        }

        let docs = docs.to_vec();
        let sql = format!(
            "INSERT INTO {table} (store, id, data, date, datetime, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(store, id) DO UPDATE SET
                 data = excluded.data,
                 date = excluded.date,
                 datetime = excluded.datetime,
                 updated_at = excluded.updated_at",
            table = kind.table()
        );

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(&sql)?;
                    let now = Utc::now().to_rfc3339();
                    for doc in &docs {
                        stmt.execute(params![
                            &doc.store,
                            doc.id,
                            doc.data.to_string(),
                            doc.date.map(|d| d.format(DATE_FORMAT).to_string()),
                            doc.datetime.map(|dt| dt.format(DATETIME_FORMAT).to_string()),
                            &now,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// All cached documents for a store, newest first.
    ///
    /// Order is `(datetime DESC, date DESC, id DESC)`; the id tiebreak makes
    /// the order total, so pagination downstream is stable.
    pub async fn list_documents(&self, kind: DocKind, store: &str) -> Result<Vec<Document>, Error> {
        let store = store.to_string();
        let sql = format!(
            "SELECT store, id, data, date, datetime FROM {table}
             WHERE store = ?1
             ORDER BY datetime DESC, date DESC, id DESC",
            table = kind.table()
        );

        self.conn
            .call(move |conn| -> Result<Vec<Document>, Error> {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![store], row_to_document)?;
                let mut docs = Vec::new();
                for row in rows {
                    docs.push(row?);
                }
                Ok(docs)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of cached documents for a store.
    pub async fn count_documents(&self, kind: DocKind, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE store = ?1", table = kind.table());

        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(&sql, params![store], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// The most recent cached document for a store, if any.
    ///
    /// "Most recent" uses the same total order as `list_documents`, so this
    /// is the document the incremental cursor starts from.
    pub async fn latest_document(&self, kind: DocKind, store: &str) -> Result<Option<Document>, Error> {
        let store = store.to_string();
        let sql = format!(
            "SELECT store, id, data, date, datetime FROM {table}
             WHERE store = ?1
             ORDER BY datetime DESC, date DESC, id DESC
             LIMIT 1",
            table = kind.table()
        );

        self.conn
            .call(move |conn| -> Result<Option<Document>, Error> {
                let result = conn.query_row(&sql, params![store], row_to_document);
                match result {
                    Ok(doc) => Ok(Some(doc)),
                    Err(tokio_rusqlite::rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every cached document of one kind, for all stores.
    ///
    /// Used by the scheduled full resync. Returns the number of deleted rows.
    pub async fn clear_documents(&self, kind: DocKind) -> Result<u64, Error> {
        let sql = format!("DELETE FROM {table}", table = kind.table());

        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(&sql, [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

fn row_to_document(row: &tokio_rusqlite::rusqlite::Row<'_>) -> tokio_rusqlite::rusqlite::Result<Document> {
    let data: String = row.get(2)?;
    let date: Option<String> = row.get(3)?;
    let datetime: Option<String> = row.get(4)?;
    Ok(Document {
        store: row.get(0)?,
        id: row.get(1)?,
        data: serde_json::from_str(&data).unwrap_or(Value::Null),
        date: date.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()),
        datetime: datetime.and_then(|s| NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT).ok()),
    })
}
