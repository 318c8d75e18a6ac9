//! Upstream document feed client.
//!
//! Talks to the per-tenant invoice/bill feed endpoints: start/limit
//! pagination, Basic auth from the tenant API key, and bounded retry with
//! exponential backoff when the upstream answers 429.
//!
//! The [`DocumentFeed`] trait is the seam the sync engine works against;
//! [`ApiClient`] is the real HTTP implementation.

pub mod error;
pub mod request;
pub mod response;

pub use error::UpstreamError;
pub use request::{INCREMENTAL_LIMIT, PAGE_SIZE, PageQuery};
pub use response::{Page, RawPage};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header;

/// Maximum retries after a 429 before the error propagates.
const MAX_RETRIES: u32 = 3;

/// Base backoff delay; doubles on every retry.
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "searcher/0.1";

/// A paginated document feed.
///
/// The engine only ever needs one operation; tests substitute an in-memory
/// implementation.
#[async_trait]
pub trait DocumentFeed: Send + Sync + 'static {
    /// Fetch one page from `endpoint` using the tenant's `api_key`.
    async fn fetch_page(&self, endpoint: &str, api_key: &str, query: &PageQuery) -> Result<Page, UpstreamError>;
}

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Request timeout (default: 20s).
    pub timeout: Duration,
    /// User-agent string.
    pub user_agent: String,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self { timeout: DEFAULT_TIMEOUT, user_agent: DEFAULT_USER_AGENT.to_string() }
    }
}

/// Real HTTP implementation of [`DocumentFeed`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client with the given configuration.
    pub fn new(config: ApiClientConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| UpstreamError::Network(Arc::new(e)))?;
        Ok(Self { http })
    }

    async fn request_page(&self, endpoint: &str, api_key: &str, query: &PageQuery) -> Result<Page, UpstreamError> {
        // The upstream expects base64 of the bare key, no trailing colon, so
        // the header is built by hand instead of reqwest's basic_auth.
        let auth = format!("Basic {}", BASE64.encode(api_key));

        tracing::debug!(endpoint, start = query.start, limit = query.limit, "fetching feed page");

        let response = self
            .http
            .get(endpoint)
            .header(header::AUTHORIZATION, auth)
            .header(header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == 401 || status == 403 {
            return Err(UpstreamError::AuthFailed);
        }
        if status == 429 {
            return Err(UpstreamError::RateLimited);
        }
        if status.is_client_error() || status.is_server_error() {
            return Err(UpstreamError::HttpStatus { status: status.as_u16() });
        }

        let bytes = response.bytes().await?;
        let raw: RawPage = serde_json::from_slice(&bytes).map_err(|e| UpstreamError::Parse(e.to_string()))?;
        Ok(raw.into())
    }
}

#[async_trait]
impl DocumentFeed for ApiClient {
    async fn fetch_page(&self, endpoint: &str, api_key: &str, query: &PageQuery) -> Result<Page, UpstreamError> {
        with_retry(|| self.request_page(endpoint, api_key, query)).await
    }
}

/// Run `op`, retrying on 429 with `1s * 2^attempt` backoff.
///
/// Only [`UpstreamError::RateLimited`] is retried; every other failure
/// propagates immediately. This is the only retry policy in the system.
async fn with_retry<T, F, Fut>(mut op: F) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(UpstreamError::RateLimited) if attempt < MAX_RETRIES => {
                let delay = Duration::from_millis(RETRY_BASE_DELAY_MS * (1 << attempt));
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries = MAX_RETRIES,
                    delay_ms = delay.as_millis() as u64,
                    "rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}
