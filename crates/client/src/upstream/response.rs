//! Upstream feed response normalization.
//!
//! The invoices feed answers with an `{metadata?, data}` envelope; the bills
//! feed sometimes answers with a bare JSON array. Both shapes normalize to
//! [`Page`].

use serde::Deserialize;
use serde_json::Value;

/// Raw response body, either shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawPage {
    Envelope {
        #[serde(default)]
        metadata: Option<PageMetadata>,
        #[serde(default)]
        data: Option<Vec<Value>>,
    },
    Bare(Vec<Value>),
}

/// Feed metadata, present when the query asked for it.
#[derive(Debug, Deserialize)]
pub struct PageMetadata {
    #[serde(default)]
    pub total: Option<u64>,
}

/// One normalized page of feed items.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Upstream-reported total record count, when metadata was requested.
    pub total: Option<u64>,
    /// Raw document payloads, newest first.
    pub items: Vec<Value>,
}

impl From<RawPage> for Page {
    fn from(raw: RawPage) -> Self {
        match raw {
            RawPage::Envelope { metadata, data } => {
                Page { total: metadata.and_then(|m| m.total), items: data.unwrap_or_default() }
            }
            RawPage::Bare(items) => Page { total: None, items },
        }
    }
}
