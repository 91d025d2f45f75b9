use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::{
    ChatContext, ChatMessage, Evaluation, Persona, PersonaDraft, QuickScan, ScrapedContent,
};

/// Errors returned by a [`ScoringOracle`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// Response could not be parsed into the expected shape
    #[error("Malformed oracle response: {0}")]
    Malformed(String),

    /// Upstream quota or rate limit hit (HTTP 429)
    #[error("Rate limit exceeded - too many requests")]
    RateLimited,

    /// Request timed out
    #[error("Request timeout")]
    Timeout,

    /// Invalid or missing API key (HTTP 401/403)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Upstream server error (HTTP 5xx, 529)
    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    /// Request rejected as invalid (HTTP 400)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Network or connection error
    #[error("Network error: {0}")]
    Network(String),

    /// Anything else
    #[error("Oracle error: {0}")]
    Other(String),
}

impl OracleError {
    /// Only malformed output earns the single in-call retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OracleError::Malformed(_))
    }
}

/// Port for the text-generation backend that scores sites
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    /// Evaluate `content` from `persona`'s point of view.
    ///
    /// When `competitor` is present the evaluation carries a comparison.
    async fn evaluate(
        &self,
        content: &ScrapedContent,
        persona: &Persona,
        competitor: Option<&ScrapedContent>,
    ) -> Result<Evaluation, OracleError>;

    /// Five-category quick scan of a secondary competitor
    async fn quick_scan(&self, content: &ScrapedContent) -> Result<QuickScan, OracleError>;

    /// Draft a persona definition from a short theme
    async fn assist(&self, theme: &str) -> Result<PersonaDraft, OracleError>;

    /// Answer a follow-up question in the persona's voice.
    ///
    /// `history` is already trimmed to the context window and ends before
    /// `message`.
    async fn chat(
        &self,
        context: &ChatContext,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, OracleError>;
}
