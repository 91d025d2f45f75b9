use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::Client as ReqwestClient;
use tracing::{debug, instrument, warn};

use super::extract::HtmlExtractor;
use crate::domain::models::{FetcherConfig, ScrapedContent};
use crate::domain::ports::{FetchError, SiteFetcher};
use crate::infrastructure::rate_limit::IpRateLimiter;
use crate::infrastructure::validators::UrlValidator;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml";
const ACCEPT_LANGUAGES: &str = "ja,en;q=0.9";
const MAX_REDIRECTS: usize = 5;

/// Site fetcher over plain HTTP(S).
///
/// Every URL passes the [`UrlValidator`] first and, when a limiter is
/// attached, the per-host request budget. Redirect targets are validated
/// again on each hop. The whole request, body included, is bounded by the
/// configured timeout.
pub struct HttpSiteFetcher {
    http_client: ReqwestClient,
    validator: UrlValidator,
    rate_limiter: Option<IpRateLimiter>,
    extractor: HtmlExtractor,
    timeout_secs: u64,
    max_html_chars: usize,
}

impl HttpSiteFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        Self::with_validator(config, UrlValidator::new())
    }

    /// Fetcher whose requests and redirect hops go through `validator`.
    pub fn with_validator(config: &FetcherConfig, validator: UrlValidator) -> Result<Self, FetchError> {
        let redirect = Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                return attempt.error(FetchError::Network(format!(
                    "more than {MAX_REDIRECTS} redirects"
                )));
            }
            match validator.validate(attempt.url().as_str()) {
                Ok(_) => attempt.follow(),
                Err(e) => attempt.error(e),
            }
        });
        let http_client = ReqwestClient::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(redirect)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {e}")))?;
        let extractor = HtmlExtractor::new()
            .map_err(|e| FetchError::Network(format!("failed to compile extractor: {e}")))?;

        Ok(Self {
            http_client,
            validator,
            rate_limiter: None,
            extractor,
            timeout_secs: config.timeout_secs,
            max_html_chars: config.max_html_chars,
        })
    }

    pub fn with_rate_limiter(mut self, limiter: IpRateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    async fn download(&self, url: url::Url) -> Result<String, FetchError> {
        let response = self
            .http_client
            .get(url)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGES)
            .send()
            .await
            .map_err(|e| self.map_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !content_type.contains("text/html") && !content_type.contains("application/xhtml") {
            return Err(FetchError::NotHtml(content_type));
        }

        response.text().await.map_err(|e| self.map_reqwest(&e))
    }

    fn map_reqwest(&self, err: &reqwest::Error) -> FetchError {
        if let Some(rejected) = redirect_rejection(err) {
            return rejected;
        }
        if err.is_timeout() {
            FetchError::Timeout(self.timeout_secs)
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// The validator error behind a refused redirect hop, if any.
fn redirect_rejection(err: &reqwest::Error) -> Option<FetchError> {
    if !err.is_redirect() {
        return None;
    }
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if let Some(rejected) = inner.downcast_ref::<FetchError>() {
            return Some(rejected.clone());
        }
        source = inner.source();
    }
    None
}

#[async_trait]
impl SiteFetcher for HttpSiteFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<ScrapedContent, FetchError> {
        let parsed = self.validator.validate(url)?;
        if let (Some(limiter), Some(host)) = (&self.rate_limiter, parsed.host_str()) {
            limiter.prune();
            limiter
                .check(host)
                .map_err(|retry_after_secs| FetchError::RateLimited { retry_after_secs })?;
        }

        let html = tokio::time::timeout(Duration::from_secs(self.timeout_secs), self.download(parsed))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout_secs))?
            .inspect_err(|e| warn!(error = %e, "Fetch failed"))?;

        debug!(bytes = html.len(), "Fetched page");
        Ok(self.extractor.extract(url.trim(), &html, self.max_html_chars))
    }
}
