//! Upstream feed query parameters.
//!
//! The feed is a start/limit paginated listing. `metadata=true` asks the
//! upstream to include the total record count; both full-load and
//! incremental queries always request newest-first ordering, and the two
//! day filters (`date_after`, `date`) are exclusive in practice.

use chrono::NaiveDate;
use serde::Serialize;

use searcher_core::cache::documents::DATE_FORMAT;

/// Page size for full loads.
pub const PAGE_SIZE: u64 = 30;

/// Page size for incremental catch-up queries.
pub const INCREMENTAL_LIMIT: u64 = 100;

/// Query parameters for one feed page request.
#[derive(Debug, Clone, Serialize)]
pub struct PageQuery {
    /// Zero-based offset into the feed.
    pub start: u64,

    /// Maximum number of items to return.
    pub limit: u64,

    /// Ask the upstream to include `{metadata: {total}}` in the envelope.
    pub metadata: bool,

    /// Always "DESC": newest documents first.
    pub order_direction: &'static str,

    /// Only documents strictly after this day.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_after: Option<String>,

    /// Only documents on exactly this day.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// Upstream document type discriminator, required by the bills feed's
    /// day-exact filter.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<&'static str>,
}

impl PageQuery {
    fn base(start: u64, limit: u64, metadata: bool) -> Self {
        Self { start, limit, metadata, order_direction: "DESC", date_after: None, date: None, doc_type: None }
    }

    /// Set the upstream `type` discriminator.
    pub fn with_doc_type(mut self, doc_type: &'static str) -> Self {
        self.doc_type = Some(doc_type);
        self
    }

    /// Metadata probe: one item, total included.
    pub fn probe() -> Self {
        Self::base(0, 1, true)
    }

    /// One full-load page starting at `start`.
    pub fn page(start: u64) -> Self {
        Self::base(start, PAGE_SIZE, false)
    }

    /// Incremental phase one: documents strictly after `day`.
    pub fn after_day(day: NaiveDate) -> Self {
        Self { date_after: Some(day.format(DATE_FORMAT).to_string()), ..Self::base(0, INCREMENTAL_LIMIT, true) }
    }

    /// Incremental phase two: documents on exactly `day`, paged by `start`.
    pub fn on_day(day: NaiveDate, start: u64) -> Self {
        Self { date: Some(day.format(DATE_FORMAT).to_string()), ..Self::base(start, INCREMENTAL_LIMIT, false) }
    }
}
