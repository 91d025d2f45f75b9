//! Follow-up conversation with a persona about a finished analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::analysis::AnalysisRecord;
use super::finding::Finding;
use super::persona::Persona;
use crate::domain::errors::{DomainError, DomainResult};

/// Longest accepted user message, in characters.
pub const MAX_CHAT_MESSAGE_CHARS: usize = 500;
/// Prior messages sent along with a new question.
pub const MAX_CHAT_CONTEXT_MESSAGES: usize = 20;
/// Transcripts kept before the oldest are evicted.
pub const MAX_CHATS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Persona,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Persona => "persona",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "persona" | "model" | "assistant" => Some(Self::Persona),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn persona(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Persona,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// What a persona knows about the analysis it is asked about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatContext {
    pub url: String,
    pub persona_id: String,
    pub persona_name: String,
    pub specialty: String,
    pub analysis_points: String,
    pub score: u8,
    pub summary: String,
    pub findings: Vec<Finding>,
}

impl ChatContext {
    /// Build the context for `persona_id` from a saved record.
    ///
    /// The persona must have a completed evaluation. `definition` supplies the
    /// specialty and focus when the persona still exists.
    pub fn from_record(
        record: &AnalysisRecord,
        persona_id: &str,
        definition: Option<&Persona>,
    ) -> DomainResult<Self> {
        let result = record
            .persona(persona_id)
            .ok_or_else(|| DomainError::PersonaNotFound(persona_id.to_string()))?;
        if !result.is_completed() {
            return Err(DomainError::ValidationFailed(format!(
                "persona {persona_id} has no completed evaluation to discuss"
            )));
        }

        Ok(Self {
            url: record.url.clone(),
            persona_id: result.persona_id.clone(),
            persona_name: result.persona_name.clone(),
            specialty: definition.map(|p| p.specialty.clone()).unwrap_or_default(),
            analysis_points: definition
                .map(|p| p.analysis_points.clone())
                .unwrap_or_default(),
            score: result.score,
            summary: result.summary.clone(),
            findings: result.findings.clone(),
        })
    }
}

/// Trim and bound a chat message.
pub fn validate_chat_message(message: &str) -> DomainResult<&str> {
    let message = message.trim();
    if message.is_empty() {
        return Err(DomainError::ValidationFailed("message cannot be empty".to_string()));
    }
    let len = message.chars().count();
    if len > MAX_CHAT_MESSAGE_CHARS {
        return Err(DomainError::ValidationFailed(format!(
            "message is {len} characters (max {MAX_CHAT_MESSAGE_CHARS})"
        )));
    }
    Ok(message)
}

/// The most recent messages that fit the context window.
pub fn context_window(history: &[ChatMessage]) -> &[ChatMessage] {
    let start = history.len().saturating_sub(MAX_CHAT_CONTEXT_MESSAGES);
    &history[start..]
}
