//! Shared fakes for integration tests
//!
//! `FakeFetcher` serves canned pages by URL. `FakeOracle` scores personas from
//! a table, can fail a persona a fixed number of times and records how many
//! evaluations were in flight at once. Chat replies echo the question and
//! record how much history each call carried.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use siteprobe::domain::models::{
    ChatContext, ChatMessage, CompetitorComparison, Evaluation, Finding, Persona, PersonaCategory,
    PersonaDraft, QuickScan, ScrapedContent, Severity,
};
use siteprobe::domain::ports::{FetchError, OracleError, ScoringOracle, SiteFetcher};

/// Build an enabled custom persona.
pub fn persona(id: &str, category: PersonaCategory) -> Persona {
    Persona::new(id, format!("Persona {id}"), "Testing", "Everything", category)
}

/// `count` personas spread across every category.
pub fn personas(count: usize) -> Vec<Persona> {
    (0..count)
        .map(|i| {
            let category = PersonaCategory::ALL[i % PersonaCategory::ALL.len()];
            persona(&format!("p{i:02}"), category)
        })
        .collect()
}

// ========================
// Fetcher
// ========================

pub struct FakeFetcher {
    pages: HashMap<String, ScrapedContent>,
    failures: HashMap<String, FetchError>,
    delay: Duration,
    calls: StdMutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            failures: HashMap::new(),
            delay: Duration::ZERO,
            calls: StdMutex::new(Vec::new()),
        }
    }

    pub fn with_page(mut self, url: &str, title: &str) -> Self {
        self.pages
            .insert(url.to_string(), ScrapedContent::empty(url).with_title(title));
        self
    }

    pub fn with_failure(mut self, url: &str, error: FetchError) -> Self {
        self.failures.insert(url.to_string(), error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SiteFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<ScrapedContent, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(err) = self.failures.get(url) {
            return Err(err.clone());
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Network(format!("connection refused: {url}")))
    }
}

// ========================
// Oracle
// ========================

/// One recorded `evaluate` call.
#[derive(Debug, Clone)]
pub struct EvaluateCall {
    pub persona_id: String,
    pub url: String,
    pub competitor_url: Option<String>,
}

pub struct FakeOracle {
    scores: HashMap<String, u8>,
    default_score: u8,
    remaining_failures: StdMutex<HashMap<String, u32>>,
    delay: Duration,
    quick_scan_score: u8,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    quick_scans: AtomicUsize,
    calls: StdMutex<Vec<EvaluateCall>>,
    chat_failures: AtomicUsize,
    chat_history_lens: StdMutex<Vec<usize>>,
}

impl FakeOracle {
    pub fn new() -> Self {
        Self {
            scores: HashMap::new(),
            default_score: 70,
            remaining_failures: StdMutex::new(HashMap::new()),
            delay: Duration::ZERO,
            quick_scan_score: 64,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            quick_scans: AtomicUsize::new(0),
            calls: StdMutex::new(Vec::new()),
            chat_failures: AtomicUsize::new(0),
            chat_history_lens: StdMutex::new(Vec::new()),
        }
    }

    /// Fail the next `times` chat calls.
    pub fn failing_chats(self, times: usize) -> Self {
        self.chat_failures.store(times, Ordering::SeqCst);
        self
    }

    /// History length passed to each chat call, in call order.
    pub fn chat_history_lens(&self) -> Vec<usize> {
        self.chat_history_lens.lock().unwrap().clone()
    }

    pub fn with_score(mut self, persona_id: &str, score: u8) -> Self {
        self.scores.insert(persona_id.to_string(), score);
        self
    }

    /// Fail the next `times` evaluations of `persona_id`.
    pub fn failing(self, persona_id: &str, times: u32) -> Self {
        self.remaining_failures
            .lock()
            .unwrap()
            .insert(persona_id.to_string(), times);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn evaluate_calls(&self) -> Vec<EvaluateCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, persona_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.persona_id == persona_id)
            .count()
    }

    pub fn quick_scan_count(&self) -> usize {
        self.quick_scans.load(Ordering::SeqCst)
    }

    fn take_failure(&self, persona_id: &str) -> bool {
        let mut failures = self.remaining_failures.lock().unwrap();
        match failures.get_mut(persona_id) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        }
    }
}

/// Decrements the in-flight counter even when the future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ScoringOracle for FakeOracle {
    async fn evaluate(
        &self,
        content: &ScrapedContent,
        persona: &Persona,
        competitor: Option<&ScrapedContent>,
    ) -> Result<Evaluation, OracleError> {
        self.calls.lock().unwrap().push(EvaluateCall {
            persona_id: persona.id.clone(),
            url: content.url.clone(),
            competitor_url: competitor.map(|c| c.url.clone()),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.take_failure(&persona.id) {
            return Err(OracleError::Server(500, "upstream unavailable".to_string()));
        }

        let score = self
            .scores
            .get(&persona.id)
            .copied()
            .unwrap_or(self.default_score);
        Ok(Evaluation {
            score,
            summary: format!("{} reviewed {}", persona.name, content.url),
            findings: vec![Finding::new(
                format!("{}-1", persona.id),
                Severity::Medium,
                format!("Finding from {}", persona.id),
            )],
            thinking_process: "Looked at the page".to_string(),
            competitor_comparison: competitor.map(|c| CompetitorComparison {
                main_site_advantages: vec!["Clearer navigation".to_string()],
                competitor_advantages: vec![format!("{} loads faster", c.url)],
                suggestions: Vec::new(),
                overall_assessment: "Close call".to_string(),
            }),
        })
    }

    async fn quick_scan(&self, _content: &ScrapedContent) -> Result<QuickScan, OracleError> {
        self.quick_scans.fetch_add(1, Ordering::SeqCst);
        Ok(QuickScan {
            overall_score: self.quick_scan_score,
            category_scores: PersonaCategory::ALL
                .iter()
                .map(|&c| (c, self.quick_scan_score))
                .collect(),
            strengths: vec!["Strong brand".to_string()],
            weaknesses: vec!["Slow checkout".to_string()],
        })
    }

    async fn assist(&self, theme: &str) -> Result<PersonaDraft, OracleError> {
        Ok(PersonaDraft {
            name: format!("{theme} expert"),
            specialty: theme.to_string(),
            analysis_points: "Everything".to_string(),
            category: PersonaCategory::Business,
            evaluation_framework: String::new(),
            scoring_criteria: String::new(),
            exclusions: String::new(),
        })
    }

    async fn chat(
        &self,
        context: &ChatContext,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, OracleError> {
        self.chat_history_lens.lock().unwrap().push(history.len());
        let failed = self
            .chat_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Err(OracleError::Server(503, "overloaded".to_string()));
        }
        Ok(format!("{} ({}/100): {message}", context.persona_name, context.score))
    }
}
