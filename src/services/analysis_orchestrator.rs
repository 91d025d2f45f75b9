//! Analysis orchestrator: bounded fan-out of persona evaluations over one
//! shared analysis record.
//!
//! A run fetches the main site, optionally fetches a detailed competitor, fans
//! out one oracle evaluation per persona through a semaphore, quick-scans any
//! secondary competitors and finally snapshots the record into history and
//! trend storage.
//!
//! Every run owns a [`CancellationToken`]. The token is checked before each
//! network call and before each result is merged, and in-flight calls are
//! raced against it so that cancelled work is dropped rather than applied.

use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::{mpsc, Mutex, RwLock, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AnalysisRecord, AnalysisStatus, CategoryScore, CompetitorQuickResult, Persona, PersonaStatus,
    ScrapedContent,
};
use crate::domain::ports::{AnalysisStores, FetchError, ScoringOracle, SiteFetcher};
use crate::services::score_aggregator;

/// Maximum number of oracle evaluations in flight at once.
pub const MAX_CONCURRENT_EVALUATIONS: usize = 3;

/// Input of one analysis run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub url: String,
    /// Personas to run; `None` uses the enabled personas from the stores.
    pub personas: Option<Vec<Persona>>,
    pub competitor_url: Option<String>,
    pub additional_competitor_urls: Vec<String>,
}

impl AnalysisRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_personas(mut self, personas: Vec<Persona>) -> Self {
        self.personas = Some(personas);
        self
    }

    pub fn with_competitor(mut self, url: impl Into<String>) -> Self {
        self.competitor_url = Some(url.into());
        self
    }

    pub fn with_additional_competitors(mut self, urls: Vec<String>) -> Self {
        self.additional_competitor_urls = urls;
        self
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Completed,
    Failed(String),
    Cancelled,
}

/// Progress event emitted during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisEvent {
    Started { analysis_id: Uuid, url: String, persona_count: usize },
    ContentFetched { url: String, title: String },
    CompetitorFetchFailed { url: String, error: String },
    PersonaStarted { persona_id: String, persona_name: String },
    PersonaCompleted { persona_id: String, score: u8, overall_score: u8 },
    PersonaFailed { persona_id: String, error: String },
    CompetitorScanned { url: String, overall_score: u8 },
    CompetitorScanFailed { url: String, error: String },
    Completed { analysis_id: Uuid, overall_score: u8, elapsed_ms: u64 },
    Failed { analysis_id: Uuid, error: String },
    Cancelled { analysis_id: Uuid },
}

/// State of the current (or most recent) run.
#[derive(Clone)]
struct ActiveRun {
    record: Arc<RwLock<AnalysisRecord>>,
    token: CancellationToken,
    personas: Arc<Vec<Persona>>,
    retries: Arc<StdMutex<RetryScope>>,
}

/// Cancellation scope shared by the retries of one record.
///
/// The token is a child of the run token and is replaced after each
/// cancellation so later retries start clean.
struct RetryScope {
    token: CancellationToken,
    in_flight: usize,
}

/// Keeps a retry counted as in flight until dropped.
struct RetryGuard {
    scope: Arc<StdMutex<RetryScope>>,
}

impl Drop for RetryGuard {
    fn drop(&mut self) {
        let mut scope = lock_scope(&self.scope);
        scope.in_flight = scope.in_flight.saturating_sub(1);
    }
}

fn lock_scope(scope: &StdMutex<RetryScope>) -> MutexGuard<'_, RetryScope> {
    scope.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ActiveRun {
    fn new(record: AnalysisRecord, personas: Vec<Persona>) -> Self {
        let token = CancellationToken::new();
        let retries = RetryScope {
            token: token.child_token(),
            in_flight: 0,
        };
        Self {
            record: Arc::new(RwLock::new(record)),
            token,
            personas: Arc::new(personas),
            retries: Arc::new(StdMutex::new(retries)),
        }
    }

    fn begin_retry(&self) -> (CancellationToken, RetryGuard) {
        let mut scope = lock_scope(&self.retries);
        scope.in_flight += 1;
        let token = scope.token.child_token();
        (
            token,
            RetryGuard {
                scope: self.retries.clone(),
            },
        )
    }

    /// Cancel in-flight retries. Returns `false` when none were running.
    fn cancel_retries(&self) -> bool {
        let mut scope = lock_scope(&self.retries);
        if scope.in_flight == 0 {
            return false;
        }
        scope.token.cancel();
        scope.token = self.token.child_token();
        true
    }
}

/// Everything a spawned evaluation needs.
#[derive(Clone)]
struct RunContext {
    oracle: Arc<dyn ScoringOracle>,
    fetcher: Arc<dyn SiteFetcher>,
    record: Arc<RwLock<AnalysisRecord>>,
    token: CancellationToken,
    events: Option<mpsc::Sender<AnalysisEvent>>,
}

impl RunContext {
    /// Apply a mutation unless the run was cancelled. `None` means discarded.
    async fn apply<T>(
        &self,
        f: impl FnOnce(&mut AnalysisRecord) -> DomainResult<T>,
    ) -> Option<DomainResult<T>> {
        let mut record = self.record.write().await;
        if self.token.is_cancelled() {
            return None;
        }
        Some(f(&mut record))
    }

    async fn emit(&self, event: AnalysisEvent) {
        emit(self.events.as_ref(), event).await;
    }

    async fn fetch(&self, url: &str) -> Result<ScrapedContent, FetchError> {
        if self.token.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(FetchError::Cancelled),
            result = self.fetcher.fetch(url) => result,
        }
    }
}

async fn emit(events: Option<&mpsc::Sender<AnalysisEvent>>, event: AnalysisEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}

/// Recompute overall and category scores from the persona results.
fn refresh_aggregates(record: &mut AnalysisRecord) {
    record.overall_score = score_aggregator::overall_score(&record.persona_results);
    record.category_scores = score_aggregator::category_scores(&record.persona_results);
}

/// Drives analysis runs. One run is active at a time.
pub struct AnalysisOrchestrator {
    fetcher: Arc<dyn SiteFetcher>,
    oracle: Arc<dyn ScoringOracle>,
    stores: Arc<dyn AnalysisStores>,
    events: Option<mpsc::Sender<AnalysisEvent>>,
    current: Mutex<Option<ActiveRun>>,
}

impl AnalysisOrchestrator {
    pub fn new(
        fetcher: Arc<dyn SiteFetcher>,
        oracle: Arc<dyn ScoringOracle>,
        stores: Arc<dyn AnalysisStores>,
    ) -> Self {
        Self {
            fetcher,
            oracle,
            stores,
            events: None,
            current: Mutex::new(None),
        }
    }

    /// Stream progress events to `tx`.
    pub fn with_events(mut self, tx: mpsc::Sender<AnalysisEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    fn context(&self, run: &ActiveRun) -> RunContext {
        RunContext {
            oracle: self.oracle.clone(),
            fetcher: self.fetcher.clone(),
            record: run.record.clone(),
            token: run.token.clone(),
            events: self.events.clone(),
        }
    }

    /// Run a full analysis. Any run still in flight is cancelled first.
    #[instrument(skip(self, request), fields(url = %request.url))]
    pub async fn run_analysis(&self, request: AnalysisRequest) -> DomainResult<AnalysisOutcome> {
        let personas = match request.personas {
            Some(personas) => personas,
            None => self.stores.list_enabled_personas().await?,
        };
        let personas: Vec<Persona> = personas.into_iter().filter(|p| p.enabled).collect();

        let mut record = AnalysisRecord::new(
            request.url.clone(),
            &personas,
            request.competitor_url.clone(),
            request.additional_competitor_urls.clone(),
        );
        record.transition_to(AnalysisStatus::Preparing)?;
        let analysis_id = record.id;

        let run = ActiveRun::new(record, personas);
        let previous = self.current.lock().await.replace(run.clone());
        if let Some(previous) = previous {
            self.cancel_run(&previous).await;
        }

        let ctx = self.context(&run);
        info!(%analysis_id, persona_count = run.personas.len(), "Starting analysis");
        ctx.emit(AnalysisEvent::Started {
            analysis_id,
            url: request.url.clone(),
            persona_count: run.personas.len(),
        })
        .await;

        // Main site content is mandatory.
        let content = match ctx.fetch(&request.url).await {
            Ok(content) => content,
            Err(FetchError::Cancelled) => return Ok(AnalysisOutcome::Cancelled),
            Err(err) => {
                let message = err.to_string();
                warn!(%analysis_id, error = %message, "Main site fetch failed");
                match ctx.apply(|r| r.fail(message.clone())).await {
                    None => return Ok(AnalysisOutcome::Cancelled),
                    Some(result) => result?,
                }
                ctx.emit(AnalysisEvent::Failed {
                    analysis_id,
                    error: message.clone(),
                })
                .await;
                return Ok(AnalysisOutcome::Failed(message));
            }
        };
        let content = Arc::new(content);
        match ctx.apply(|r| r.set_content((*content).clone())).await {
            None => return Ok(AnalysisOutcome::Cancelled),
            Some(result) => result?,
        }
        ctx.emit(AnalysisEvent::ContentFetched {
            url: content.url.clone(),
            title: content.title.clone(),
        })
        .await;

        // Competitor content is optional; a failure only drops the comparison.
        let mut competitor: Option<Arc<ScrapedContent>> = None;
        if let Some(competitor_url) = request.competitor_url.as_deref() {
            match ctx.fetch(competitor_url).await {
                Ok(competitor_content) => {
                    let competitor_content = Arc::new(competitor_content);
                    match ctx
                        .apply(|r| r.set_competitor_content((*competitor_content).clone()))
                        .await
                    {
                        None => return Ok(AnalysisOutcome::Cancelled),
                        Some(result) => result?,
                    }
                    competitor = Some(competitor_content);
                }
                Err(FetchError::Cancelled) => return Ok(AnalysisOutcome::Cancelled),
                Err(err) => {
                    warn!(
                        %analysis_id,
                        url = competitor_url,
                        error = %err,
                        "Competitor fetch failed, continuing without comparison"
                    );
                    ctx.emit(AnalysisEvent::CompetitorFetchFailed {
                        url: competitor_url.to_string(),
                        error: err.to_string(),
                    })
                    .await;
                }
            }
        }

        self.evaluate_personas(&ctx, &run.personas, &content, competitor.as_ref())
            .await;
        if ctx.token.is_cancelled() {
            return Ok(AnalysisOutcome::Cancelled);
        }

        if !request.additional_competitor_urls.is_empty() {
            let quick_results = self
                .scan_competitors(&ctx, &request.additional_competitor_urls)
                .await;
            match ctx.apply(|r| r.set_quick_results(quick_results)).await {
                None => return Ok(AnalysisOutcome::Cancelled),
                Some(result) => result?,
            }
        }

        let snapshot = match ctx
            .apply(|r| {
                r.complete(Utc::now())?;
                Ok(r.clone())
            })
            .await
        {
            None => return Ok(AnalysisOutcome::Cancelled),
            Some(result) => result?,
        };

        self.persist(&snapshot).await;
        info!(
            %analysis_id,
            overall_score = snapshot.overall_score,
            completed = snapshot.completed_count(),
            failed = snapshot.failed_count(),
            elapsed_ms = snapshot.elapsed_ms,
            "Analysis completed"
        );
        ctx.emit(AnalysisEvent::Completed {
            analysis_id,
            overall_score: snapshot.overall_score,
            elapsed_ms: snapshot.elapsed_ms,
        })
        .await;

        Ok(AnalysisOutcome::Completed)
    }

    /// Fan out one evaluation per persona, at most
    /// [`MAX_CONCURRENT_EVALUATIONS`] at a time, and wait for all of them.
    async fn evaluate_personas(
        &self,
        ctx: &RunContext,
        personas: &[Persona],
        content: &Arc<ScrapedContent>,
        competitor: Option<&Arc<ScrapedContent>>,
    ) {
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_EVALUATIONS));
        let mut handles = Vec::with_capacity(personas.len());

        for persona in personas {
            let permit = tokio::select! {
                biased;
                _ = ctx.token.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let ctx = ctx.clone();
            let persona = persona.clone();
            let content = content.clone();
            let competitor = competitor.cloned();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                evaluate_persona(&ctx, &persona, &content, competitor.as_deref()).await
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Persona evaluation task panicked");
            }
        }
    }

    /// Quick-scan secondary competitors with the same concurrency bound.
    ///
    /// Failures are logged and skipped; results keep input order.
    async fn scan_competitors(
        &self,
        ctx: &RunContext,
        urls: &[String],
    ) -> Vec<CompetitorQuickResult> {
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_EVALUATIONS));
        let mut handles = Vec::with_capacity(urls.len());

        for url in urls {
            let permit = tokio::select! {
                biased;
                _ = ctx.token.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let ctx = ctx.clone();
            let url = url.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                scan_competitor(&ctx, &url).await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Some(result)) => results.push(result),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Competitor scan task panicked"),
            }
        }
        results
    }

    async fn persist(&self, record: &AnalysisRecord) {
        if let Err(e) = self.stores.save_history(record).await {
            warn!(analysis_id = %record.id, error = %e, "Failed to save analysis history");
        }
        if let Err(e) = self.stores.append_trend(record).await {
            warn!(analysis_id = %record.id, error = %e, "Failed to append trend point");
        }
    }

    /// Re-run one persona on the current record.
    ///
    /// Uses the stored content, leaves the record status untouched and
    /// re-snapshots history when the record is already completed. A retry
    /// interrupted by [`cancel`](Self::cancel) puts the persona's previous
    /// result back and returns an error.
    #[instrument(skip(self))]
    pub async fn retry_persona(&self, persona_id: &str) -> DomainResult<PersonaStatus> {
        let run = self
            .current
            .lock()
            .await
            .clone()
            .ok_or_else(|| DomainError::ValidationFailed("no analysis to retry".to_string()))?;

        if run.token.is_cancelled() {
            let status = run.record.read().await.status;
            return Err(DomainError::InvalidStateTransition {
                from: status.as_str().to_string(),
                to: "retry".to_string(),
                reason: "analysis was cancelled".to_string(),
            });
        }

        let persona = run
            .personas
            .iter()
            .find(|p| p.id == persona_id)
            .cloned()
            .ok_or_else(|| DomainError::PersonaNotFound(persona_id.to_string()))?;

        let (token, _guard) = run.begin_retry();
        let (content, competitor, previous) = {
            let mut record = run.record.write().await;
            let content = record.content.clone().ok_or_else(|| {
                DomainError::ValidationFailed("analysis has no fetched content".to_string())
            })?;
            let competitor = record.competitor_content().cloned();
            let previous = record
                .persona(persona_id)
                .cloned()
                .ok_or_else(|| DomainError::PersonaNotFound(persona_id.to_string()))?;
            record.reopen_persona(persona_id)?;
            (Arc::new(content), competitor.map(Arc::new), previous)
        };

        let ctx = RunContext {
            token,
            ..self.context(&run)
        };
        let settled = evaluate_persona(&ctx, &persona, &content, competitor.as_deref()).await;

        let snapshot = {
            let mut record = run.record.write().await;
            if settled.is_none() {
                record.restore_persona(previous)?;
                refresh_aggregates(&mut record);
            }
            record.clone()
        };
        if settled.is_none() {
            info!(persona_id, "Retry interrupted, previous result restored");
            return Err(DomainError::InvalidStateTransition {
                from: PersonaStatus::Analyzing.as_str().to_string(),
                to: "retry".to_string(),
                reason: "retry was cancelled".to_string(),
            });
        }

        let status = snapshot
            .persona(persona_id)
            .map(|r| r.status)
            .ok_or_else(|| DomainError::PersonaNotFound(persona_id.to_string()))?;
        if status == PersonaStatus::Completed && snapshot.status == AnalysisStatus::Completed {
            self.persist(&snapshot).await;
        }
        debug!(persona_id, status = status.as_str(), "Retry finished");
        Ok(status)
    }

    /// Cancel the current run, or the retries running on a finished record.
    /// Returns `false` if there was nothing to cancel.
    pub async fn cancel(&self) -> bool {
        let run = self.current.lock().await.clone();
        match run {
            Some(run) => self.cancel_run(&run).await,
            None => false,
        }
    }

    async fn cancel_run(&self, run: &ActiveRun) -> bool {
        let (cancelled, analysis_id) = {
            let mut record = run.record.write().await;
            let cancelled = record.cancel();
            // Fired under the write lock: no merge can land in between.
            if cancelled {
                run.token.cancel();
            }
            (cancelled, record.id)
        };
        if cancelled {
            info!(%analysis_id, "Analysis cancelled");
            emit(self.events.as_ref(), AnalysisEvent::Cancelled { analysis_id }).await;
            return true;
        }
        if run.cancel_retries() {
            info!(%analysis_id, "Persona retry cancelled");
            return true;
        }
        false
    }

    /// Copy of the current record, if any run has started.
    pub async fn snapshot(&self) -> Option<AnalysisRecord> {
        let run = self.current.lock().await.clone()?;
        let record = run.record.read().await.clone();
        Some(record)
    }
}

/// Evaluate one persona and merge the result.
///
/// Returns the persona's terminal status, or `None` when the run was
/// cancelled or the merge was rejected.
async fn evaluate_persona(
    ctx: &RunContext,
    persona: &Persona,
    content: &ScrapedContent,
    competitor: Option<&ScrapedContent>,
) -> Option<PersonaStatus> {
    if ctx.token.is_cancelled() {
        return None;
    }
    if let Err(e) = ctx.apply(|r| r.start_persona(&persona.id)).await? {
        warn!(persona_id = %persona.id, error = %e, "Could not start persona evaluation");
        return None;
    }
    ctx.emit(AnalysisEvent::PersonaStarted {
        persona_id: persona.id.clone(),
        persona_name: persona.name.clone(),
    })
    .await;

    let result = tokio::select! {
        biased;
        _ = ctx.token.cancelled() => return None,
        result = ctx.oracle.evaluate(content, persona, competitor) => result,
    };

    match result {
        Ok(evaluation) => {
            let score = evaluation.score;
            let merged = ctx
                .apply(|r| {
                    r.complete_persona(&persona.id, evaluation)?;
                    refresh_aggregates(r);
                    Ok(r.overall_score)
                })
                .await?;
            match merged {
                Ok(overall_score) => {
                    debug!(persona_id = %persona.id, score, overall_score, "Persona completed");
                    ctx.emit(AnalysisEvent::PersonaCompleted {
                        persona_id: persona.id.clone(),
                        score,
                        overall_score,
                    })
                    .await;
                    Some(PersonaStatus::Completed)
                }
                Err(e) => {
                    warn!(persona_id = %persona.id, error = %e, "Could not merge evaluation");
                    None
                }
            }
        }
        Err(err) => {
            let message = err.to_string();
            warn!(persona_id = %persona.id, error = %message, "Persona evaluation failed");
            let failed = ctx
                .apply(|r| {
                    r.fail_persona(&persona.id, message.clone())?;
                    refresh_aggregates(r);
                    Ok(())
                })
                .await?;
            if let Err(e) = failed {
                warn!(persona_id = %persona.id, error = %e, "Could not record failure");
                return None;
            }
            ctx.emit(AnalysisEvent::PersonaFailed {
                persona_id: persona.id.clone(),
                error: message,
            })
            .await;
            Some(PersonaStatus::Error)
        }
    }
}

/// Fetch and quick-scan one secondary competitor.
async fn scan_competitor(ctx: &RunContext, url: &str) -> Option<CompetitorQuickResult> {
    let content = match ctx.fetch(url).await {
        Ok(content) => content,
        Err(FetchError::Cancelled) => return None,
        Err(err) => {
            warn!(url, error = %err, "Competitor quick-scan fetch failed, skipping");
            ctx.emit(AnalysisEvent::CompetitorScanFailed {
                url: url.to_string(),
                error: err.to_string(),
            })
            .await;
            return None;
        }
    };

    let scan = tokio::select! {
        biased;
        _ = ctx.token.cancelled() => return None,
        scan = ctx.oracle.quick_scan(&content) => scan,
    };

    match scan {
        Ok(scan) => {
            ctx.emit(AnalysisEvent::CompetitorScanned {
                url: url.to_string(),
                overall_score: scan.overall_score,
            })
            .await;
            Some(CompetitorQuickResult {
                url: url.to_string(),
                title: content.title,
                category_scores: scan
                    .category_scores
                    .into_iter()
                    .map(|(category, score)| CategoryScore::new(category, score.min(100)))
                    .collect(),
                overall_score: scan.overall_score.min(100),
                strengths: scan.strengths,
                weaknesses: scan.weaknesses,
            })
        }
        Err(err) => {
            warn!(url, error = %err, "Competitor quick scan failed, skipping");
            ctx.emit(AnalysisEvent::CompetitorScanFailed {
                url: url.to_string(),
                error: err.to_string(),
            })
            .await;
            None
        }
    }
}
