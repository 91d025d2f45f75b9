use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::ScrapedContent;

/// Errors returned by a [`SiteFetcher`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Malformed URL or unsupported scheme
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// URL rejected by the SSRF guard
    #[error("URL not allowed: {0}")]
    Blocked(String),

    /// Caller exceeded its request budget
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Fetch exceeded the configured bounded wait
    #[error("Fetch timed out after {0}s")]
    Timeout(u64),

    /// Non-success HTTP status
    #[error("HTTP {0}")]
    Http(u16),

    /// Response was not an HTML document
    #[error("Not an HTML document: {0}")]
    NotHtml(String),

    /// Connection-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Run was cancelled before the fetch settled
    #[error("Fetch cancelled")]
    Cancelled,
}

/// Port for fetching a page and extracting content facts
#[async_trait]
pub trait SiteFetcher: Send + Sync {
    /// Fetch `url` and return its extracted content
    async fn fetch(&self, url: &str) -> Result<ScrapedContent, FetchError>;
}
