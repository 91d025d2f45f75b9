//! In-memory store adapters.
//!
//! Same semantics as the SQLite stores; used for tests and `--ephemeral` runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    default_personas, normalize_url, AnalysisRecord, ChatMessage, HistoryItem, Persona,
    TrendDataPoint, UrlTrend, MAX_CHATS, MAX_HISTORY_ENTRIES,
};
use crate::domain::ports::{
    ChatRepository, HistoryRepository, PersonaRepository, Repositories, TrendRepository,
};

/// Persona store seeded with the built-in panel.
pub struct InMemoryPersonaRepository {
    personas: RwLock<Vec<Persona>>,
}

impl InMemoryPersonaRepository {
    pub fn new() -> Self {
        Self::with_personas(default_personas())
    }

    pub fn with_personas(personas: Vec<Persona>) -> Self {
        Self {
            personas: RwLock::new(personas),
        }
    }
}

impl Default for InMemoryPersonaRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersonaRepository for InMemoryPersonaRepository {
    async fn list(&self) -> DomainResult<Vec<Persona>> {
        let personas = self.personas.read().await;
        let (mut defaults, custom): (Vec<_>, Vec<_>) =
            personas.iter().cloned().partition(|p| p.is_default);
        defaults.extend(custom);
        Ok(defaults)
    }

    async fn list_enabled(&self) -> DomainResult<Vec<Persona>> {
        Ok(self.list().await?.into_iter().filter(|p| p.enabled).collect())
    }

    async fn get(&self, id: &str) -> DomainResult<Option<Persona>> {
        Ok(self.personas.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn add(&self, persona: &Persona) -> DomainResult<()> {
        persona.validate()?;
        let mut personas = self.personas.write().await;
        if personas.iter().any(|p| p.id == persona.id) {
            return Err(DomainError::DuplicatePersona(persona.id.clone()));
        }
        personas.push(Persona {
            is_default: false,
            ..persona.clone()
        });
        Ok(())
    }

    async fn update(&self, persona: &Persona) -> DomainResult<Persona> {
        let mut personas = self.personas.write().await;
        let stored = personas
            .iter_mut()
            .find(|p| p.id == persona.id)
            .ok_or_else(|| DomainError::PersonaNotFound(persona.id.clone()))?;

        if stored.is_default {
            stored.enabled = persona.enabled;
        } else {
            persona.validate()?;
            *stored = Persona {
                is_default: false,
                ..persona.clone()
            };
        }
        Ok(stored.clone())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let mut personas = self.personas.write().await;
        let index = personas
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| DomainError::PersonaNotFound(id.to_string()))?;
        if personas[index].is_default {
            return Err(DomainError::DefaultPersonaImmutable(id.to_string()));
        }
        personas.remove(index);
        Ok(())
    }

    async fn toggle(&self, id: &str) -> DomainResult<bool> {
        let mut personas = self.personas.write().await;
        let persona = personas
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DomainError::PersonaNotFound(id.to_string()))?;
        persona.enabled = !persona.enabled;
        Ok(persona.enabled)
    }
}

/// History store holding full records, newest first.
#[derive(Default)]
pub struct InMemoryHistoryRepository {
    records: RwLock<Vec<AnalysisRecord>>,
}

impl InMemoryHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryRepository for InMemoryHistoryRepository {
    async fn save(&self, record: &AnalysisRecord) -> DomainResult<()> {
        let mut records = self.records.write().await;
        records.retain(|r| r.id != record.id);
        records.push(record.clone());
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(MAX_HISTORY_ENTRIES);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<AnalysisRecord>> {
        Ok(self.records.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self) -> DomainResult<Vec<HistoryItem>> {
        Ok(self.records.read().await.iter().map(HistoryItem::from).collect())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<bool> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }

    async fn clear(&self) -> DomainResult<usize> {
        let mut records = self.records.write().await;
        let removed = records.len();
        records.clear();
        Ok(removed)
    }
}

/// Trend store keyed by normalized URL.
#[derive(Default)]
pub struct InMemoryTrendRepository {
    trends: RwLock<HashMap<String, UrlTrend>>,
}

impl InMemoryTrendRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrendRepository for InMemoryTrendRepository {
    async fn append_point(&self, url: &str, point: TrendDataPoint) -> DomainResult<()> {
        let mut trends = self.trends.write().await;
        let trend = trends
            .entry(normalize_url(url))
            .or_insert_with(|| UrlTrend::new(url));
        trend.url = url.to_string();
        trend.upsert(point);
        Ok(())
    }

    async fn get_trend(&self, url: &str) -> DomainResult<Option<UrlTrend>> {
        Ok(self.trends.read().await.get(&normalize_url(url)).cloned())
    }

    async fn list_urls(&self) -> DomainResult<Vec<String>> {
        let mut urls: Vec<String> = self.trends.read().await.values().map(|t| t.url.clone()).collect();
        urls.sort();
        Ok(urls)
    }
}

struct Transcript {
    analysis_id: Uuid,
    persona_id: String,
    messages: Vec<ChatMessage>,
}

/// Chat store ordered by last activity, least recent first.
#[derive(Default)]
pub struct InMemoryChatRepository {
    transcripts: RwLock<Vec<Transcript>>,
}

impl InMemoryChatRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatRepository for InMemoryChatRepository {
    async fn messages(&self, analysis_id: Uuid, persona_id: &str) -> DomainResult<Vec<ChatMessage>> {
        Ok(self
            .transcripts
            .read()
            .await
            .iter()
            .find(|t| t.analysis_id == analysis_id && t.persona_id == persona_id)
            .map(|t| t.messages.clone())
            .unwrap_or_default())
    }

    async fn append(
        &self,
        analysis_id: Uuid,
        persona_id: &str,
        messages: &[ChatMessage],
    ) -> DomainResult<()> {
        let mut transcripts = self.transcripts.write().await;
        let mut transcript = match transcripts
            .iter()
            .position(|t| t.analysis_id == analysis_id && t.persona_id == persona_id)
        {
            Some(index) => transcripts.remove(index),
            None => Transcript {
                analysis_id,
                persona_id: persona_id.to_string(),
                messages: Vec::new(),
            },
        };
        transcript.messages.extend_from_slice(messages);
        transcripts.push(transcript);

        let excess = transcripts.len().saturating_sub(MAX_CHATS);
        transcripts.drain(..excess);
        Ok(())
    }

    async fn clear(&self, analysis_id: Uuid, persona_id: &str) -> DomainResult<bool> {
        let mut transcripts = self.transcripts.write().await;
        let before = transcripts.len();
        transcripts.retain(|t| !(t.analysis_id == analysis_id && t.persona_id == persona_id));
        Ok(transcripts.len() != before)
    }

    async fn clear_analysis(&self, analysis_id: Uuid) -> DomainResult<usize> {
        let mut transcripts = self.transcripts.write().await;
        let before = transcripts.len();
        transcripts.retain(|t| t.analysis_id != analysis_id);
        Ok(before - transcripts.len())
    }
}

/// Fresh in-memory stores with the default persona panel.
pub fn in_memory_repositories() -> Repositories {
    Repositories {
        personas: Arc::new(InMemoryPersonaRepository::new()),
        history: Arc::new(InMemoryHistoryRepository::new()),
        trends: Arc::new(InMemoryTrendRepository::new()),
        chats: Arc::new(InMemoryChatRepository::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::PersonaCategory;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_default_personas_cannot_be_deleted_or_edited() {
        let repo = InMemoryPersonaRepository::new();
        let mut first = repo.list().await.unwrap().remove(0);

        assert!(matches!(
            repo.delete(&first.id).await,
            Err(DomainError::DefaultPersonaImmutable(_))
        ));

        let name = first.name.clone();
        first.name = "Changed".to_string();
        first.enabled = false;
        let stored = repo.update(&first).await.unwrap();
        assert_eq!(stored.name, name);
        assert!(!stored.enabled);
    }

    #[tokio::test]
    async fn test_custom_persona_lifecycle() {
        let repo = InMemoryPersonaRepository::with_personas(Vec::new());
        let persona = Persona::new("legal", "Legal Reviewer", "Compliance", "Privacy policy", PersonaCategory::Business);

        repo.add(&persona).await.unwrap();
        assert!(matches!(repo.add(&persona).await, Err(DomainError::DuplicatePersona(_))));
        assert!(!repo.toggle("legal").await.unwrap());
        assert!(repo.list_enabled().await.unwrap().is_empty());
        repo.delete("legal").await.unwrap();
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_caps_and_upserts() {
        let repo = InMemoryHistoryRepository::new();
        let personas = default_personas();
        let mut ids = Vec::new();
        for i in 0..(MAX_HISTORY_ENTRIES + 2) {
            let mut record = AnalysisRecord::new(format!("https://s{i}.example"), &personas[..1], None, Vec::new());
            record.created_at = Utc::now() - Duration::minutes(i as i64);
            ids.push(record.id);
            repo.save(&record).await.unwrap();
        }

        let items = repo.list().await.unwrap();
        assert_eq!(items.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(items[0].id, ids[0]);
        assert!(repo.get(ids[MAX_HISTORY_ENTRIES + 1]).await.unwrap().is_none());

        let mut again = repo.get(ids[0]).await.unwrap().unwrap();
        again.overall_score = 91;
        repo.save(&again).await.unwrap();
        assert_eq!(repo.list().await.unwrap().len(), MAX_HISTORY_ENTRIES);
        assert_eq!(repo.list().await.unwrap()[0].overall_score, 91);
    }

    #[tokio::test]
    async fn test_trend_keys_are_normalized() {
        let repo = InMemoryTrendRepository::new();
        let point = |score| TrendDataPoint {
            analysis_id: Uuid::new_v4(),
            date: Utc::now(),
            overall_score: score,
            category_scores: Vec::new(),
        };
        repo.append_point("https://Example.com/path/", point(50)).await.unwrap();
        repo.append_point("https://example.com/path", point(65)).await.unwrap();

        let trend = repo.get_trend("https://EXAMPLE.com/path").await.unwrap().unwrap();
        assert_eq!(trend.data_points.len(), 2);
        assert_eq!(trend.delta(), Some(15));
        assert_eq!(repo.list_urls().await.unwrap(), vec!["https://example.com/path"]);
    }

    #[tokio::test]
    async fn test_chat_eviction_drops_least_recently_active() {
        let repo = InMemoryChatRepository::new();
        let first = Uuid::new_v4();
        repo.append(first, "seo", &[ChatMessage::user("hello")]).await.unwrap();
        for _ in 0..(MAX_CHATS - 1) {
            repo.append(Uuid::new_v4(), "seo", &[ChatMessage::user("hi")]).await.unwrap();
        }

        // Touching the first transcript keeps it alive past the next insert.
        repo.append(first, "seo", &[ChatMessage::persona("welcome")]).await.unwrap();
        repo.append(Uuid::new_v4(), "a11y", &[ChatMessage::user("one")]).await.unwrap();
        repo.append(Uuid::new_v4(), "a11y", &[ChatMessage::user("two")]).await.unwrap();

        assert_eq!(repo.messages(first, "seo").await.unwrap().len(), 2);
        assert_eq!(repo.transcripts.read().await.len(), MAX_CHATS);
    }

    #[tokio::test]
    async fn test_chat_clear() {
        let repo = InMemoryChatRepository::new();
        let id = Uuid::new_v4();
        repo.append(id, "seo", &[ChatMessage::user("a")]).await.unwrap();
        repo.append(id, "a11y", &[ChatMessage::user("b")]).await.unwrap();

        assert!(repo.clear(id, "seo").await.unwrap());
        assert!(!repo.clear(id, "seo").await.unwrap());
        assert!(repo.messages(id, "seo").await.unwrap().is_empty());
        assert_eq!(repo.clear_analysis(id).await.unwrap(), 1);
    }
}
