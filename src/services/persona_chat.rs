//! Follow-up questions to a persona about a saved analysis.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::models::{context_window, validate_chat_message, ChatContext, ChatMessage};
use crate::domain::ports::{OracleError, Repositories, ScoringOracle};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Persona could not answer: {0}")]
    Oracle(#[from] OracleError),
}

/// Chat sessions over the history, persona and transcript stores.
///
/// A question and its answer are stored together only after the oracle
/// replies, so a failed call leaves the transcript untouched.
pub struct PersonaChat {
    oracle: Arc<dyn ScoringOracle>,
    repositories: Repositories,
}

impl PersonaChat {
    pub fn new(oracle: Arc<dyn ScoringOracle>, repositories: Repositories) -> Self {
        Self { oracle, repositories }
    }

    async fn context(&self, analysis_id: Uuid, persona_id: &str) -> Result<ChatContext, ChatError> {
        let record = self
            .repositories
            .history
            .get(analysis_id)
            .await?
            .ok_or(DomainError::AnalysisNotFound(analysis_id))?;
        let definition = self.repositories.personas.get(persona_id).await?;
        Ok(ChatContext::from_record(&record, persona_id, definition.as_ref())?)
    }

    /// Ask `persona_id` a question and return its reply.
    #[instrument(skip(self, message), fields(chars = message.chars().count()))]
    pub async fn send(
        &self,
        analysis_id: Uuid,
        persona_id: &str,
        message: &str,
    ) -> Result<ChatMessage, ChatError> {
        let message = validate_chat_message(message)?;
        let context = self.context(analysis_id, persona_id).await?;
        let history = self.repositories.chats.messages(analysis_id, persona_id).await?;

        let reply = self
            .oracle
            .chat(&context, context_window(&history), message)
            .await
            .inspect_err(|e| warn!(error = %e, "Chat reply failed"))?;

        let reply = ChatMessage::persona(reply);
        self.repositories
            .chats
            .append(analysis_id, persona_id, &[ChatMessage::user(message), reply.clone()])
            .await?;
        info!(turns = history.len() + 2, "Chat reply stored");
        Ok(reply)
    }
}
