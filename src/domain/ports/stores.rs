use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    AnalysisRecord, ChatMessage, HistoryItem, Persona, TrendDataPoint, UrlTrend,
};

/// Repository port for persona definitions
///
/// Default personas may only be toggled; content edits to them are ignored and
/// deletion is refused.
#[async_trait]
pub trait PersonaRepository: Send + Sync {
    /// All personas, defaults first, in insertion order
    async fn list(&self) -> DomainResult<Vec<Persona>>;

    /// Enabled personas only
    async fn list_enabled(&self) -> DomainResult<Vec<Persona>>;

    async fn get(&self, id: &str) -> DomainResult<Option<Persona>>;

    /// Insert a custom persona. Fails on a duplicate id.
    async fn add(&self, persona: &Persona) -> DomainResult<()>;

    /// Update a persona and return the stored version.
    async fn update(&self, persona: &Persona) -> DomainResult<Persona>;

    async fn delete(&self, id: &str) -> DomainResult<()>;

    /// Flip `enabled` and return the new value.
    async fn toggle(&self, id: &str) -> DomainResult<bool>;
}

/// Repository port for finished analysis snapshots
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Save or replace a snapshot, evicting the oldest beyond the history cap
    async fn save(&self, record: &AnalysisRecord) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<AnalysisRecord>>;

    /// Newest first
    async fn list(&self) -> DomainResult<Vec<HistoryItem>>;

    /// Returns whether a snapshot was removed
    async fn delete(&self, id: Uuid) -> DomainResult<bool>;

    /// Returns the number of snapshots removed
    async fn clear(&self) -> DomainResult<usize>;
}

/// Repository port for per-URL score trends
#[async_trait]
pub trait TrendRepository: Send + Sync {
    /// Upsert a point under the normalized form of `url`
    async fn append_point(&self, url: &str, point: TrendDataPoint) -> DomainResult<()>;

    async fn get_trend(&self, url: &str) -> DomainResult<Option<UrlTrend>>;

    /// Latest raw URL of every tracked trend
    async fn list_urls(&self) -> DomainResult<Vec<String>>;
}

/// Repository port for persona chat transcripts
///
/// A transcript is keyed by analysis and persona. Appending to a new
/// transcript evicts the least recently active ones beyond the chat cap.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Oldest first; empty when no transcript exists
    async fn messages(&self, analysis_id: Uuid, persona_id: &str) -> DomainResult<Vec<ChatMessage>>;

    async fn append(
        &self,
        analysis_id: Uuid,
        persona_id: &str,
        messages: &[ChatMessage],
    ) -> DomainResult<()>;

    /// Returns whether a transcript was removed
    async fn clear(&self, analysis_id: Uuid, persona_id: &str) -> DomainResult<bool>;

    /// Drop every transcript of an analysis. Returns the number removed.
    async fn clear_analysis(&self, analysis_id: Uuid) -> DomainResult<usize>;
}

/// The store capabilities an analysis run needs
#[async_trait]
pub trait AnalysisStores: Send + Sync {
    async fn list_enabled_personas(&self) -> DomainResult<Vec<Persona>>;

    async fn save_history(&self, record: &AnalysisRecord) -> DomainResult<()>;

    async fn append_trend(&self, record: &AnalysisRecord) -> DomainResult<()>;
}

/// [`AnalysisStores`] backed by the repositories
#[derive(Clone)]
pub struct Repositories {
    pub personas: Arc<dyn PersonaRepository>,
    pub history: Arc<dyn HistoryRepository>,
    pub trends: Arc<dyn TrendRepository>,
    pub chats: Arc<dyn ChatRepository>,
}

#[async_trait]
impl AnalysisStores for Repositories {
    async fn list_enabled_personas(&self) -> DomainResult<Vec<Persona>> {
        self.personas.list_enabled().await
    }

    async fn save_history(&self, record: &AnalysisRecord) -> DomainResult<()> {
        self.history.save(record).await
    }

    async fn append_trend(&self, record: &AnalysisRecord) -> DomainResult<()> {
        self.trends
            .append_point(&record.url, TrendDataPoint::from(record))
            .await
    }
}
