use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::errors::{from_reqwest, from_status};
use super::parsing::{parse_evaluation, parse_persona_draft, parse_quick_scan};
use super::prompts;
use super::rate_limiter::TokenBucketRateLimiter;
use super::types::{Message, MessageRequest, MessageResponse};
use crate::domain::models::{
    ChatContext, ChatMessage, ChatRole, Evaluation, OracleConfig, Persona, PersonaDraft, QuickScan,
    ScrapedContent,
};
use crate::domain::ports::{OracleError, ScoringOracle};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Sampling temperature of the first attempt.
pub const FIRST_ATTEMPT_TEMPERATURE: f32 = 0.7;
/// Sampling temperature of the single retry after malformed output.
pub const RETRY_TEMPERATURE: f32 = 0.3;

/// Configuration for the Claude-backed oracle
#[derive(Debug, Clone)]
pub struct ClaudeOracleConfig {
    /// Anthropic API key
    pub api_key: String,

    /// Base URL for the API
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Maximum tokens per response
    pub max_tokens: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Rate limit in requests per second
    pub rate_limit_rps: f64,
}

impl ClaudeOracleConfig {
    /// Build from the `oracle` config section and a resolved API key.
    pub fn from_config(config: &OracleConfig, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
            rate_limit_rps: config.rate_limit_rps,
        }
    }
}

/// Scoring oracle over the Anthropic Messages API
///
/// Provides:
/// - Connection pooling and reuse
/// - Token bucket pacing of outbound requests
/// - One retry at a lower temperature when the reply cannot be parsed
pub struct ClaudeOracle {
    http_client: ReqwestClient,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    rate_limiter: TokenBucketRateLimiter,
}

impl ClaudeOracle {
    pub fn new(config: ClaudeOracleConfig) -> Result<Self, OracleError> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| OracleError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            api_key: config.api_key,
            base_url: config.base_url,
            model: config.model,
            max_tokens: config.max_tokens,
            rate_limiter: TokenBucketRateLimiter::new(config.rate_limit_rps),
        })
    }

    async fn send_request(&self, request: &MessageRequest) -> Result<MessageResponse, OracleError> {
        self.rate_limiter.acquire().await;

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(from_status(status, body));
        }

        let message: MessageResponse = response.json().await.map_err(|e| from_reqwest(&e))?;
        debug!(
            input_tokens = message.usage.input_tokens,
            output_tokens = message.usage.output_tokens,
            "Oracle response received"
        );
        Ok(message)
    }

    /// Send a prompt and parse the reply, retrying once on malformed output.
    async fn complete<T>(
        &self,
        system: &str,
        user: &str,
        parse: impl Fn(&str) -> Result<T, OracleError> + Send + Sync,
    ) -> Result<T, OracleError> {
        let request = MessageRequest::single_turn(
            &self.model,
            system,
            user,
            self.max_tokens,
            FIRST_ATTEMPT_TEMPERATURE,
        );
        let response = self.send_request(&request).await?;
        match parse(&response.text()) {
            Err(err) if err.is_retryable() => {
                warn!(error = %err, "Malformed oracle reply, retrying at lower temperature");
            }
            result => return result,
        }

        let retry = MessageRequest {
            temperature: Some(RETRY_TEMPERATURE),
            ..request
        };
        let response = self.send_request(&retry).await?;
        parse(&response.text())
    }
}

#[async_trait]
impl ScoringOracle for ClaudeOracle {
    #[instrument(skip_all, fields(persona = %persona.id, url = %content.url))]
    async fn evaluate(
        &self,
        content: &ScrapedContent,
        persona: &Persona,
        competitor: Option<&ScrapedContent>,
    ) -> Result<Evaluation, OracleError> {
        let with_competitor = competitor.is_some();
        let system = prompts::evaluation_system_prompt(persona, with_competitor);
        let user = prompts::evaluation_user_prompt(content, competitor);
        self.complete(&system, &user, |text| parse_evaluation(text, with_competitor))
            .await
    }

    #[instrument(skip_all, fields(url = %content.url))]
    async fn quick_scan(&self, content: &ScrapedContent) -> Result<QuickScan, OracleError> {
        let system = prompts::quick_scan_system_prompt();
        let user = prompts::quick_scan_user_prompt(content);
        self.complete(&system, &user, parse_quick_scan).await
    }

    #[instrument(skip(self))]
    async fn assist(&self, theme: &str) -> Result<PersonaDraft, OracleError> {
        let system = prompts::assist_system_prompt();
        let user = prompts::assist_user_prompt(theme);
        self.complete(&system, &user, parse_persona_draft).await
    }

    #[instrument(skip_all, fields(persona = %context.persona_id, turns = history.len()))]
    async fn chat(
        &self,
        context: &ChatContext,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, OracleError> {
        let messages = conversation(history, message);
        let request = MessageRequest::conversation(
            &self.model,
            prompts::chat_system_prompt(context),
            messages,
            self.max_tokens,
            FIRST_ATTEMPT_TEMPERATURE,
        );
        let reply = self.send_request(&request).await?.text();
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(OracleError::Malformed("empty chat reply".to_string()));
        }
        Ok(reply.to_string())
    }
}

/// Map a transcript onto API turns ending with `message`.
///
/// The API requires the first turn to come from the user, so leading persona
/// messages are dropped.
fn conversation(history: &[ChatMessage], message: &str) -> Vec<Message> {
    history
        .iter()
        .skip_while(|m| m.role != ChatRole::User)
        .map(|m| match m.role {
            ChatRole::User => Message::user(m.content.clone()),
            ChatRole::Persona => Message::assistant(m.content.clone()),
        })
        .chain(std::iter::once(Message::user(message)))
        .collect()
}
