//! `siteprobe roadmap`: phased improvement plan for a saved analysis.

use anyhow::{bail, Result};
use clap::Args;
use console::style;
use serde::Serialize;
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::display::{colorize_score, colorize_severity, format_hours, list_table, section_header, truncate_ellipsis};
use crate::cli::id_resolver::resolve_analysis_id;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::ImprovementRoadmap;
use crate::services::roadmap_estimator::roadmap_for;

#[derive(Args, Debug)]
pub struct RoadmapArgs {
    /// Analysis ID or unique prefix
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct RoadmapOutput {
    pub analysis_id: Uuid,
    pub url: String,
    #[serde(flatten)]
    pub roadmap: ImprovementRoadmap,
}

impl CommandOutput for RoadmapOutput {
    fn to_human(&self) -> String {
        if self.roadmap.phases.is_empty() {
            return format!("No findings to plan for {}.", self.url);
        }

        let mut lines = vec![
            format!("{} {}", style("Improvement roadmap for").bold(), self.url),
            format!(
                "Score {} -> {} expected, {} of work",
                colorize_score(self.roadmap.current_score),
                colorize_score(self.roadmap.expected_final_score),
                format_hours(self.roadmap.total_estimated_hours)
            ),
        ];

        for phase in &self.roadmap.phases {
            lines.push(section_header(&format!(
                "Phase {}: {} ({}, +{:.1} points)",
                phase.phase,
                phase.label,
                format_hours(phase.estimated_total_hours),
                phase.expected_score_gain
            )));
            let mut table = list_table(&["#", "severity", "finding", "hours", "impact"]);
            for finding in &phase.findings {
                table.add_row(vec![
                    finding.priority.to_string(),
                    colorize_severity(finding.finding.severity.as_str()).to_string(),
                    truncate_ellipsis(&finding.finding.title, 60),
                    format_hours(finding.estimated_hours),
                    format!("+{:.1}", finding.estimated_score_impact),
                ]);
            }
            lines.push(table.to_string());
        }
        lines.join("\n")
    }
}

pub async fn execute(args: RoadmapArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let history = ctx.repositories.history.as_ref();
    let id = resolve_analysis_id(history, &args.id).await?;
    let Some(record) = history.get(id).await? else {
        bail!("Analysis {id} not found");
    };

    let out = RoadmapOutput {
        analysis_id: record.id,
        url: record.url.clone(),
        roadmap: roadmap_for(&record),
    };
    output(&out, json_mode);
    Ok(())
}
