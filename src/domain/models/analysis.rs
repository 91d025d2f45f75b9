//! Analysis record and its status machine.
//!
//! The record is the aggregate root of one analysis run. It is created with
//! every persona result in `waiting`, mutated as fetches and evaluations land,
//! and frozen once its status becomes terminal. The only mutation permitted on
//! a frozen record is the retry path, which reopens a single persona result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::content::ScrapedContent;
use super::evaluation::{CompetitorComparison, Evaluation};
use super::finding::Finding;
use super::persona::{Persona, PersonaCategory};
use crate::domain::errors::{DomainError, DomainResult};

/// Overall status of an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    #[default]
    Idle,
    Preparing,
    Analyzing,
    Completed,
    Error,
    Cancelled,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Preparing => "preparing",
            Self::Analyzing => "analyzing",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "idle" => Some(Self::Idle),
            "preparing" => Some(Self::Preparing),
            "analyzing" => Some(Self::Analyzing),
            "completed" | "complete" => Some(Self::Completed),
            "error" | "failed" => Some(Self::Error),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(&self) -> &'static [AnalysisStatus] {
        match self {
            Self::Idle => &[Self::Preparing, Self::Cancelled],
            // Preparing may complete directly when no persona is enabled.
            Self::Preparing => &[Self::Analyzing, Self::Completed, Self::Error, Self::Cancelled],
            Self::Analyzing => &[Self::Completed, Self::Error, Self::Cancelled],
            Self::Completed | Self::Error | Self::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }
}

/// Status of one persona's evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PersonaStatus {
    #[default]
    Waiting,
    Analyzing,
    Completed,
    Error,
}

impl PersonaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Analyzing => "analyzing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Terminal for the current attempt; a retry may reopen it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    pub fn valid_transitions(&self) -> &'static [PersonaStatus] {
        match self {
            Self::Waiting => &[Self::Analyzing],
            Self::Analyzing => &[Self::Completed, Self::Error],
            Self::Completed | Self::Error => &[Self::Waiting],
        }
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }
}

/// Per-persona result inside an analysis record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaResult {
    pub persona_id: String,
    pub persona_name: String,
    pub persona_category: PersonaCategory,
    pub status: PersonaStatus,
    /// Meaningful only when `status` is `Completed`.
    pub score: u8,
    pub summary: String,
    pub findings: Vec<Finding>,
    pub thinking_process: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitor_comparison: Option<CompetitorComparison>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Number of evaluation attempts started, retries included.
    #[serde(default)]
    pub attempts: u32,
    #[serde(skip)]
    reopened: bool,
}

impl PersonaResult {
    pub fn waiting(persona: &Persona) -> Self {
        Self {
            persona_id: persona.id.clone(),
            persona_name: persona.name.clone(),
            persona_category: persona.category,
            status: PersonaStatus::Waiting,
            score: 0,
            summary: String::new(),
            findings: Vec::new(),
            thinking_process: String::new(),
            error: None,
            competitor_comparison: None,
            completed_at: None,
            attempts: 0,
            reopened: false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == PersonaStatus::Completed
    }

    fn transition_to(&mut self, next: PersonaStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: next.as_str().to_string(),
                reason: format!("persona {}", self.persona_id),
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Score for one persona category, derived from completed results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: PersonaCategory,
    pub label: String,
    pub score: u8,
    pub color: String,
}

impl CategoryScore {
    pub fn new(category: PersonaCategory, score: u8) -> Self {
        Self {
            category,
            label: category.label().to_string(),
            score,
            color: category.color().to_string(),
        }
    }
}

/// Quick-scan result for a secondary competitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorQuickResult {
    pub url: String,
    pub title: String,
    pub category_scores: Vec<CategoryScore>,
    pub overall_score: u8,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

/// The detailed competitor of an analysis.
///
/// `content` stays `None` until fetched, and stays `None` if the fetch failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorTarget {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ScrapedContent>,
}

/// Aggregate root of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub status: AnalysisStatus,
    /// Run-level failure message, set only with `AnalysisStatus::Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub content: Option<ScrapedContent>,
    pub persona_results: Vec<PersonaResult>,
    pub overall_score: u8,
    pub category_scores: Vec<CategoryScore>,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitor: Option<CompetitorTarget>,
    /// Secondary competitors that receive a quick scan.
    #[serde(default)]
    pub competitor_urls: Vec<String>,
    #[serde(default)]
    pub competitor_quick_results: Vec<CompetitorQuickResult>,
}

impl AnalysisRecord {
    /// Create an idle record with one waiting result per persona.
    pub fn new(
        url: impl Into<String>,
        personas: &[Persona],
        competitor_url: Option<String>,
        competitor_urls: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            created_at: Utc::now(),
            status: AnalysisStatus::Idle,
            error: None,
            content: None,
            persona_results: personas.iter().map(PersonaResult::waiting).collect(),
            overall_score: 0,
            category_scores: Vec::new(),
            elapsed_ms: 0,
            competitor: competitor_url.map(|url| CompetitorTarget { url, content: None }),
            competitor_urls,
            competitor_quick_results: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn transition_to(&mut self, next: AnalysisStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: next.as_str().to_string(),
                reason: format!("analysis {}", self.id),
            });
        }
        self.status = next;
        Ok(())
    }

    fn ensure_open(&self) -> DomainResult<()> {
        if self.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: "mutation".to_string(),
                reason: format!("analysis {} is final", self.id),
            });
        }
        Ok(())
    }

    pub fn set_content(&mut self, content: ScrapedContent) -> DomainResult<()> {
        self.ensure_open()?;
        self.content = Some(content);
        Ok(())
    }

    pub fn set_competitor_content(&mut self, content: ScrapedContent) -> DomainResult<()> {
        self.ensure_open()?;
        match self.competitor.as_mut() {
            Some(target) => {
                target.content = Some(content);
                Ok(())
            }
            None => Err(DomainError::ValidationFailed(
                "competitor content given without a competitor url".to_string(),
            )),
        }
    }

    /// Competitor content, present only when a competitor fetch succeeded.
    pub fn competitor_content(&self) -> Option<&ScrapedContent> {
        self.competitor.as_ref().and_then(|c| c.content.as_ref())
    }

    pub fn set_quick_results(&mut self, results: Vec<CompetitorQuickResult>) -> DomainResult<()> {
        self.ensure_open()?;
        self.competitor_quick_results = results;
        Ok(())
    }

    pub fn persona(&self, persona_id: &str) -> Option<&PersonaResult> {
        self.persona_results.iter().find(|r| r.persona_id == persona_id)
    }

    /// Mutable access for a persona result, honoring the frozen-record rule.
    fn persona_mut(&mut self, persona_id: &str) -> DomainResult<&mut PersonaResult> {
        let frozen = self.is_terminal();
        let status = self.status;
        let id = self.id;
        let result = self
            .persona_results
            .iter_mut()
            .find(|r| r.persona_id == persona_id)
            .ok_or_else(|| DomainError::PersonaNotFound(persona_id.to_string()))?;
        if frozen && !result.reopened {
            return Err(DomainError::InvalidStateTransition {
                from: status.as_str().to_string(),
                to: "mutation".to_string(),
                reason: format!("analysis {id} is final"),
            });
        }
        Ok(result)
    }

    /// Mark a persona as analyzing. The record follows into `Analyzing`.
    pub fn start_persona(&mut self, persona_id: &str) -> DomainResult<()> {
        let result = self.persona_mut(persona_id)?;
        result.transition_to(PersonaStatus::Analyzing)?;
        result.attempts += 1;
        result.error = None;
        if self.status == AnalysisStatus::Preparing {
            self.transition_to(AnalysisStatus::Analyzing)?;
        }
        Ok(())
    }

    /// Merge a successful evaluation into the persona's result.
    pub fn complete_persona(&mut self, persona_id: &str, evaluation: Evaluation) -> DomainResult<()> {
        let result = self.persona_mut(persona_id)?;
        result.transition_to(PersonaStatus::Completed)?;
        result.score = evaluation.score.min(100);
        result.summary = evaluation.summary;
        result.findings = evaluation.findings;
        result.thinking_process = evaluation.thinking_process;
        result.competitor_comparison = evaluation.competitor_comparison;
        result.error = None;
        result.completed_at = Some(Utc::now());
        result.reopened = false;
        Ok(())
    }

    pub fn fail_persona(&mut self, persona_id: &str, message: impl Into<String>) -> DomainResult<()> {
        let result = self.persona_mut(persona_id)?;
        result.transition_to(PersonaStatus::Error)?;
        result.error = Some(message.into());
        result.completed_at = Some(Utc::now());
        result.reopened = false;
        Ok(())
    }

    /// Reopen one terminal persona result for a retry.
    ///
    /// Allowed on a frozen record; the record status is left untouched.
    pub fn reopen_persona(&mut self, persona_id: &str) -> DomainResult<()> {
        let result = self
            .persona_results
            .iter_mut()
            .find(|r| r.persona_id == persona_id)
            .ok_or_else(|| DomainError::PersonaNotFound(persona_id.to_string()))?;
        result.transition_to(PersonaStatus::Waiting)?;
        result.reopened = true;
        Ok(())
    }

    /// Put back the result a persona had before an interrupted retry.
    ///
    /// Only an unsettled result can be replaced, so a retry that did land is
    /// never rolled back.
    pub fn restore_persona(&mut self, previous: PersonaResult) -> DomainResult<()> {
        let slot = self
            .persona_results
            .iter_mut()
            .find(|r| r.persona_id == previous.persona_id)
            .ok_or_else(|| DomainError::PersonaNotFound(previous.persona_id.clone()))?;
        if slot.status.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: slot.status.as_str().to_string(),
                to: previous.status.as_str().to_string(),
                reason: format!("persona {} already settled", slot.persona_id),
            });
        }
        *slot = previous;
        slot.reopened = false;
        Ok(())
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition_to(AnalysisStatus::Completed)?;
        self.elapsed_ms = (now - self.created_at).num_milliseconds().max(0) as u64;
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> DomainResult<()> {
        self.transition_to(AnalysisStatus::Error)?;
        self.error = Some(message.into());
        Ok(())
    }

    /// Cancel the run. Returns `false` when the record was already final.
    pub fn cancel(&mut self) -> bool {
        self.transition_to(AnalysisStatus::Cancelled).is_ok()
    }

    pub fn completed_count(&self) -> usize {
        self.persona_results.iter().filter(|r| r.is_completed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.persona_results
            .iter()
            .filter(|r| r.status == PersonaStatus::Error)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::finding::Severity;

    fn personas() -> Vec<Persona> {
        vec![
            Persona::new("a", "A", "specialty", "points", PersonaCategory::Design),
            Persona::new("b", "B", "specialty", "points", PersonaCategory::Technical),
        ]
    }

    fn evaluation(score: u8) -> Evaluation {
        Evaluation {
            score,
            summary: "ok".to_string(),
            findings: vec![Finding::new("f-1", Severity::Low, "Minor")],
            thinking_process: "looked".to_string(),
            competitor_comparison: None,
        }
    }

    fn preparing() -> AnalysisRecord {
        let mut record = AnalysisRecord::new("https://example.com", &personas(), None, vec![]);
        record.transition_to(AnalysisStatus::Preparing).unwrap();
        record
    }

    #[test]
    fn test_new_record_is_idle_and_waiting() {
        let record = AnalysisRecord::new("https://example.com", &personas(), None, vec![]);
        assert_eq!(record.status, AnalysisStatus::Idle);
        assert!(record
            .persona_results
            .iter()
            .all(|r| r.status == PersonaStatus::Waiting));
        assert!(record.competitor.is_none());
    }

    #[test]
    fn test_terminal_statuses_have_no_transitions() {
        for status in [AnalysisStatus::Completed, AnalysisStatus::Error, AnalysisStatus::Cancelled] {
            assert!(status.is_terminal());
            assert!(status.valid_transitions().is_empty());
        }
    }

    #[test]
    fn test_first_started_persona_moves_record_to_analyzing() {
        let mut record = preparing();
        record.start_persona("a").unwrap();
        assert_eq!(record.status, AnalysisStatus::Analyzing);
        assert_eq!(record.persona("a").unwrap().status, PersonaStatus::Analyzing);
        assert_eq!(record.persona("a").unwrap().attempts, 1);
    }

    #[test]
    fn test_persona_cannot_complete_without_starting() {
        let mut record = preparing();
        let err = record.complete_persona("a", evaluation(80)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_unknown_persona() {
        let mut record = preparing();
        assert!(matches!(
            record.start_persona("zzz"),
            Err(DomainError::PersonaNotFound(_))
        ));
    }

    #[test]
    fn test_frozen_record_rejects_mutation() {
        let mut record = preparing();
        record.start_persona("a").unwrap();
        assert!(record.cancel());
        assert!(record.complete_persona("a", evaluation(80)).is_err());
        assert!(record.set_content(ScrapedContent::empty("https://example.com")).is_err());
        assert!(!record.cancel());
    }

    #[test]
    fn test_reopen_allows_single_persona_on_frozen_record() {
        let mut record = preparing();
        record.start_persona("a").unwrap();
        record.fail_persona("a", "boom").unwrap();
        record.start_persona("b").unwrap();
        record.complete_persona("b", evaluation(70)).unwrap();
        record.complete(Utc::now()).unwrap();

        record.reopen_persona("a").unwrap();
        record.start_persona("a").unwrap();
        record.complete_persona("a", evaluation(90)).unwrap();

        assert_eq!(record.status, AnalysisStatus::Completed);
        assert_eq!(record.persona("a").unwrap().score, 90);
        assert_eq!(record.persona("a").unwrap().attempts, 2);
        // reopening is consumed by the terminal transition
        assert!(record.fail_persona("a", "late").is_err());
        // sibling stays frozen
        assert!(record.reopen_persona("b").is_ok());
    }

    #[test]
    fn test_restore_rolls_back_an_interrupted_retry() {
        let mut record = preparing();
        record.start_persona("a").unwrap();
        record.fail_persona("a", "boom").unwrap();
        record.start_persona("b").unwrap();
        record.complete_persona("b", evaluation(70)).unwrap();
        record.complete(Utc::now()).unwrap();

        let previous = record.persona("a").unwrap().clone();
        record.reopen_persona("a").unwrap();
        record.start_persona("a").unwrap();
        record.restore_persona(previous.clone()).unwrap();

        assert_eq!(record.persona("a").unwrap(), &previous);
        assert_eq!(record.status, AnalysisStatus::Completed);
        // restored result is frozen again until reopened
        assert!(record.start_persona("a").is_err());
        // a settled result is never replaced
        let err = record.restore_persona(previous).unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_competitor_content_requires_url() {
        let mut record = preparing();
        let err = record
            .set_competitor_content(ScrapedContent::empty("https://rival.example"))
            .unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));

        let mut record = AnalysisRecord::new(
            "https://example.com",
            &personas(),
            Some("https://rival.example".to_string()),
            vec![],
        );
        record.transition_to(AnalysisStatus::Preparing).unwrap();
        assert!(record.competitor_content().is_none());
        record
            .set_competitor_content(ScrapedContent::empty("https://rival.example"))
            .unwrap();
        assert!(record.competitor_content().is_some());
    }

    #[test]
    fn test_complete_records_elapsed_time() {
        let mut record = preparing();
        let later = record.created_at + chrono::Duration::milliseconds(1500);
        record.complete(later).unwrap();
        assert_eq!(record.elapsed_ms, 1500);
    }

    #[test]
    fn test_fail_keeps_message() {
        let mut record = preparing();
        record.fail("HTTP 404").unwrap();
        assert_eq!(record.status, AnalysisStatus::Error);
        assert_eq!(record.error.as_deref(), Some("HTTP 404"));
    }
}
