//! History CLI commands and the shared analysis detail view.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::display::{
    action_success, colorize_score, colorize_severity, colorize_status, format_elapsed,
    list_table, relative_time, render_list, section_header, short_id, truncate_ellipsis,
    DetailView,
};
use crate::cli::id_resolver::resolve_analysis_id;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{AnalysisRecord, HistoryItem, PriorityItem};
use crate::services::report::{render_markdown, score_label};
use crate::services::roadmap_estimator::priority_summary;
use crate::services::SharePayload;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommands,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// List saved analyses, newest first
    List,
    /// Show a saved analysis
    Show {
        /// Analysis ID or unique prefix
        id: String,
        /// Print the full markdown report instead of the summary
        #[arg(long)]
        markdown: bool,
    },
    /// Delete a saved analysis
    Delete {
        /// Analysis ID or unique prefix
        id: String,
    },
    /// Delete every saved analysis
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Write a shareable summary of a saved analysis
    Export {
        /// Analysis ID or unique prefix
        id: String,
        /// Destination file; prints to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Display a shared summary file
    ViewShare {
        /// File written by `history export`
        file: PathBuf,
    },
}

#[derive(Debug, Serialize)]
pub struct HistoryListOutput {
    pub analyses: Vec<HistoryItem>,
    pub total: usize,
}

impl CommandOutput for HistoryListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "url", "score", "personas", "date"]);
        for item in &self.analyses {
            table.add_row(vec![
                short_id(&item.id.to_string()).to_string(),
                truncate_ellipsis(&item.url, 48),
                colorize_score(item.overall_score).to_string(),
                format!("{}/{}", item.completed_persona_count, item.persona_count),
                relative_time(&item.created_at),
            ]);
        }
        render_list("analysis", "analyses", table, self.total)
    }
}

/// Summary of one analysis record.
///
/// JSON output carries the record without the scraped page bodies.
#[derive(Debug, Serialize)]
pub struct AnalysisDetailOutput {
    #[serde(flatten)]
    pub record: AnalysisRecord,
    pub priorities: Vec<PriorityItem>,
}

impl AnalysisDetailOutput {
    pub fn new(mut record: AnalysisRecord) -> Self {
        record.content = None;
        if let Some(competitor) = record.competitor.as_mut() {
            competitor.content = None;
        }
        let priorities = priority_summary(&record.persona_results);
        Self { record, priorities }
    }
}

impl CommandOutput for AnalysisDetailOutput {
    fn to_human(&self) -> String {
        let record = &self.record;
        let mut view = DetailView::new(&format!("Analysis {}", short_id(&record.id.to_string())))
            .field("URL", &record.url)
            .field("Status", &colorize_status(record.status.as_str()).to_string())
            .field(
                "Score",
                &format!("{} ({})", colorize_score(record.overall_score), score_label(record.overall_score)),
            )
            .field("Date", &record.created_at.format("%Y-%m-%d %H:%M UTC").to_string())
            .field("Elapsed", &format_elapsed(record.elapsed_ms))
            .field_opt("Competitor", record.competitor.as_ref().map(|c| c.url.as_str()))
            .field_opt("Error", record.error.as_deref());

        if !record.category_scores.is_empty() {
            view = view.section("Categories");
            for score in &record.category_scores {
                view = view.field(&score.label, &colorize_score(score.score).to_string());
            }
        }

        let mut lines = vec![view.render()];

        lines.push(section_header("Personas"));
        let mut personas = list_table(&["persona", "category", "status", "score", "findings"]);
        for result in &record.persona_results {
            let score = if result.is_completed() {
                colorize_score(result.score).to_string()
            } else {
                "-".to_string()
            };
            let status = match &result.error {
                Some(error) => format!(
                    "{} ({})",
                    colorize_status(result.status.as_str()),
                    truncate_ellipsis(error, 40)
                ),
                None => colorize_status(result.status.as_str()).to_string(),
            };
            personas.add_row(vec![
                result.persona_name.clone(),
                result.persona_category.label().to_string(),
                status,
                score,
                result.findings.len().to_string(),
            ]);
        }
        lines.push(personas.to_string());

        if !record.competitor_quick_results.is_empty() {
            lines.push(section_header("Competitors"));
            let mut competitors = list_table(&["url", "score", "strengths", "weaknesses"]);
            for result in &record.competitor_quick_results {
                competitors.add_row(vec![
                    truncate_ellipsis(&result.url, 40),
                    colorize_score(result.overall_score).to_string(),
                    truncate_ellipsis(&result.strengths.join("; "), 40),
                    truncate_ellipsis(&result.weaknesses.join("; "), 40),
                ]);
            }
            lines.push(competitors.to_string());
        }

        if !self.priorities.is_empty() {
            lines.push(section_header("Top priorities"));
            for item in &self.priorities {
                lines.push(format!(
                    "  {:<8} {} ({})",
                    colorize_severity(item.finding.severity.as_str()),
                    item.finding.title,
                    item.persona_name
                ));
            }
        }

        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryActionOutput {
    pub success: bool,
    pub message: String,
    pub removed: usize,
}

impl CommandOutput for HistoryActionOutput {
    fn to_human(&self) -> String {
        action_success(&self.message)
    }
}

#[derive(Debug, Serialize)]
struct MarkdownOutput {
    id: String,
    markdown: String,
}

impl CommandOutput for MarkdownOutput {
    fn to_human(&self) -> String {
        self.markdown.clone()
    }
}

/// A shared summary read back from disk.
#[derive(Debug, Serialize)]
pub struct ShareViewOutput {
    #[serde(flatten)]
    pub payload: SharePayload,
}

impl CommandOutput for ShareViewOutput {
    fn to_human(&self) -> String {
        let payload = &self.payload;
        let mut view = DetailView::new("Shared analysis")
            .field("URL", &payload.url)
            .field(
                "Score",
                &format!("{} ({})", colorize_score(payload.overall_score), score_label(payload.overall_score)),
            )
            .field("Date", &payload.date.format("%Y-%m-%d %H:%M UTC").to_string());
        if !payload.categories.is_empty() {
            view = view.section("Categories");
            for category in &payload.categories {
                view = view.field(&category.label, &colorize_score(category.score).to_string());
            }
        }

        let mut lines = vec![view.render(), section_header("Personas")];
        for persona in &payload.personas {
            lines.push(format!(
                "  {} {} - {}",
                colorize_score(persona.score),
                persona.name,
                truncate_ellipsis(&persona.summary, 70)
            ));
            for finding in &persona.findings {
                lines.push(format!(
                    "      {:<8} {}",
                    colorize_severity(finding.severity.as_str()),
                    finding.title
                ));
            }
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
struct ExportOutput {
    success: bool,
    message: String,
    path: PathBuf,
}

impl CommandOutput for ExportOutput {
    fn to_human(&self) -> String {
        action_success(&self.message)
    }
}

pub async fn execute(args: HistoryArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let history = ctx.repositories.history.as_ref();

    match args.command {
        HistoryCommands::List => {
            let analyses = history.list().await?;
            let out = HistoryListOutput {
                total: analyses.len(),
                analyses,
            };
            output(&out, json_mode);
        }

        HistoryCommands::Show { id, markdown } => {
            let id = resolve_analysis_id(history, &id).await?;
            let Some(record) = history.get(id).await? else {
                bail!("Analysis {id} not found");
            };
            if markdown {
                let out = MarkdownOutput {
                    id: id.to_string(),
                    markdown: render_markdown(&record),
                };
                output(&out, json_mode);
            } else {
                output(&AnalysisDetailOutput::new(record), json_mode);
            }
        }

        HistoryCommands::Delete { id } => {
            let id = resolve_analysis_id(history, &id).await?;
            if !history.delete(id).await? {
                bail!("Analysis {id} not found");
            }
            ctx.repositories.chats.clear_analysis(id).await?;
            let out = HistoryActionOutput {
                success: true,
                message: format!("Deleted analysis {}", short_id(&id.to_string())),
                removed: 1,
            };
            output(&out, json_mode);
        }

        HistoryCommands::Clear { yes } => {
            if !yes {
                bail!("Refusing to clear history without --yes");
            }
            for item in history.list().await? {
                ctx.repositories.chats.clear_analysis(item.id).await?;
            }
            let removed = history.clear().await?;
            let out = HistoryActionOutput {
                success: true,
                message: format!("Cleared {removed} saved analyses"),
                removed,
            };
            output(&out, json_mode);
        }

        HistoryCommands::Export { id, output: path } => {
            let id = resolve_analysis_id(history, &id).await?;
            let Some(record) = history.get(id).await? else {
                bail!("Analysis {id} not found");
            };
            let json = SharePayload::from_record(&record).to_json()?;
            match path {
                Some(path) => {
                    tokio::fs::write(&path, json)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    let out = ExportOutput {
                        success: true,
                        message: format!("Exported analysis {} to {}", short_id(&id.to_string()), path.display()),
                        path,
                    };
                    output(&out, json_mode);
                }
                None => println!("{json}"),
            }
        }

        HistoryCommands::ViewShare { file } => {
            let json = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let payload = SharePayload::parse(&json)
                .with_context(|| format!("{} is not a shared analysis", file.display()))?;
            output(&ShareViewOutput { payload }, json_mode);
        }
    }

    Ok(())
}
