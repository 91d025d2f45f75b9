//! `siteprobe analyze`: run the persona panel against a URL.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::history::AnalysisDetailOutput;
use crate::cli::context::AppContext;
use crate::cli::output::{output, AnalysisProgress};
use crate::domain::models::{Persona, PersonaStatus};
use crate::domain::ports::PersonaRepository;
use crate::services::{AnalysisOrchestrator, AnalysisOutcome, AnalysisRequest};

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// URL of the site to analyze
    pub url: String,

    /// Competitor compared in detail by every persona
    #[arg(short, long)]
    pub competitor: Option<String>,

    /// Additional competitors to quick-scan (repeatable)
    #[arg(long = "also", value_name = "URL")]
    pub also: Vec<String>,

    /// Run only these personas (repeatable); defaults to all enabled personas
    #[arg(short, long = "persona", value_name = "ID")]
    pub personas: Vec<String>,

    /// Re-run every persona that failed, once
    #[arg(long)]
    pub retry_failed: bool,
}

/// Resolve explicitly requested personas. Explicit selection overrides the
/// stored enabled flag.
async fn select_personas(repo: &dyn PersonaRepository, ids: &[String]) -> Result<Option<Vec<Persona>>> {
    if ids.is_empty() {
        return Ok(None);
    }
    let mut personas = Vec::with_capacity(ids.len());
    for id in ids {
        let Some(mut persona) = repo.get(id).await? else {
            bail!("Persona '{id}' not found. Run 'siteprobe personas list' to see available ids");
        };
        persona.enabled = true;
        personas.push(persona);
    }
    Ok(Some(personas))
}

pub async fn execute(args: AnalyzeArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let personas = select_personas(ctx.repositories.personas.as_ref(), &args.personas).await?;
    let oracle = ctx.oracle()?;
    let fetcher = ctx.fetcher()?;

    let (tx, rx) = mpsc::channel(64);
    let progress = AnalysisProgress::new(!json_mode).spawn(rx);
    let orchestrator = AnalysisOrchestrator::new(fetcher, oracle, Arc::new(ctx.repositories.clone()))
        .with_events(tx);

    let mut request = AnalysisRequest::new(args.url.clone()).with_additional_competitors(args.also);
    if let Some(personas) = personas {
        request = request.with_personas(personas);
    }
    if let Some(competitor) = args.competitor {
        request = request.with_competitor(competitor);
    }

    let outcome = tokio::select! {
        outcome = orchestrator.run_analysis(request) => outcome.context("Analysis aborted")?,
        _ = tokio::signal::ctrl_c() => {
            orchestrator.cancel().await;
            AnalysisOutcome::Cancelled
        }
    };

    if outcome == AnalysisOutcome::Completed && args.retry_failed {
        retry_failed(&orchestrator).await;
    }

    let snapshot = orchestrator.snapshot().await;
    // Closes the event channel so the progress task can finish.
    drop(orchestrator);
    if let Err(e) = progress.await {
        warn!(error = %e, "Progress renderer stopped unexpectedly");
    }

    match outcome {
        AnalysisOutcome::Completed => {
            let Some(record) = snapshot else {
                bail!("Analysis finished without a record");
            };
            output(&AnalysisDetailOutput::new(record), json_mode);
            Ok(())
        }
        AnalysisOutcome::Failed(message) => bail!("Analysis of {} failed: {message}", args.url),
        AnalysisOutcome::Cancelled => bail!("Analysis of {} was cancelled", args.url),
    }
}

async fn retry_failed(orchestrator: &AnalysisOrchestrator) {
    let Some(record) = orchestrator.snapshot().await else {
        return;
    };
    let failed: Vec<String> = record
        .persona_results
        .iter()
        .filter(|r| r.status == PersonaStatus::Error)
        .map(|r| r.persona_id.clone())
        .collect();

    for persona_id in failed {
        match orchestrator.retry_persona(&persona_id).await {
            Ok(status) => info!(persona_id = %persona_id, status = status.as_str(), "Retried persona"),
            Err(e) => warn!(persona_id = %persona_id, error = %e, "Retry failed"),
        }
    }
}
