//! Markdown report rendering for a finished analysis.

use std::fmt::Write as _;

use crate::domain::models::{AnalysisRecord, PersonaCategory, PersonaResult};

/// Qualitative label for a 0-100 score.
pub fn score_label(score: u8) -> &'static str {
    match score {
        80..=u8::MAX => "Excellent",
        60..=79 => "Good",
        40..=59 => "Fair",
        _ => "Poor",
    }
}

/// Render `record` as a self-contained markdown document.
pub fn render_markdown(record: &AnalysisRecord) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, record);
    out
}

fn write_report(out: &mut String, record: &AnalysisRecord) -> std::fmt::Result {
    writeln!(out, "# SiteProbe Analysis Report")?;
    writeln!(out)?;
    writeln!(out, "- **URL**: {}", record.url)?;
    if let Some(competitor) = &record.competitor {
        writeln!(out, "- **Competitor (detailed)**: {}", competitor.url)?;
    }
    for url in &record.competitor_urls {
        writeln!(out, "- **Competitor (quick scan)**: {url}")?;
    }
    writeln!(out, "- **Date**: {}", record.created_at.format("%Y-%m-%d %H:%M UTC"))?;
    writeln!(
        out,
        "- **Overall score**: {}/100 ({})",
        record.overall_score,
        score_label(record.overall_score)
    )?;
    writeln!(out)?;

    writeln!(out, "## Category scores")?;
    writeln!(out)?;
    writeln!(out, "| Category | Score |")?;
    writeln!(out, "|----------|-------|")?;
    for score in &record.category_scores {
        writeln!(out, "| {} | {} |", score.label, score.score)?;
    }
    writeln!(out)?;
    writeln!(out, "---")?;
    writeln!(out)?;

    let mut groups: Vec<(PersonaCategory, Vec<&PersonaResult>)> = Vec::new();
    for result in record.persona_results.iter().filter(|r| r.is_completed()) {
        match groups.iter_mut().find(|(c, _)| *c == result.persona_category) {
            Some((_, list)) => list.push(result),
            None => groups.push((result.persona_category, vec![result])),
        }
    }

    for (category, results) in groups {
        let category_score = record
            .category_scores
            .iter()
            .find(|c| c.category == category)
            .map_or_else(|| "-".to_string(), |c| c.score.to_string());
        writeln!(out, "## {} ({category_score})", category.label())?;
        writeln!(out)?;
        for result in results {
            write_persona(out, result)?;
        }
    }

    if !record.competitor_quick_results.is_empty() {
        writeln!(out, "---")?;
        writeln!(out)?;
        writeln!(out, "## Competitor quick scans")?;
        writeln!(out)?;
        for quick in &record.competitor_quick_results {
            writeln!(out, "### {} (overall: {})", quick.url, quick.overall_score)?;
            writeln!(out)?;
            writeln!(out, "| Category | Score |")?;
            writeln!(out, "|----------|-------|")?;
            for score in &quick.category_scores {
                writeln!(out, "| {} | {} |", score.label, score.score)?;
            }
            writeln!(out)?;
            write_list(out, "Strengths", &quick.strengths)?;
            write_list(out, "Weaknesses", &quick.weaknesses)?;
        }
    }

    writeln!(out, "---")?;
    write!(out, "*Generated by SiteProbe*")
}

fn write_persona(out: &mut String, result: &PersonaResult) -> std::fmt::Result {
    writeln!(out, "### {} - {}", result.persona_name, result.score)?;
    writeln!(out)?;
    writeln!(out, "> {}", result.summary)?;
    writeln!(out)?;

    if !result.findings.is_empty() {
        writeln!(out, "#### Findings")?;
        writeln!(out)?;
        for finding in &result.findings {
            writeln!(out, "**[{}] {}**", finding.severity.as_str(), finding.title)?;
            writeln!(out)?;
            writeln!(out, "{}", finding.description)?;
            writeln!(out)?;
            if !finding.recommendation.is_empty() {
                writeln!(out, "**Recommendation**: {}", finding.recommendation)?;
                writeln!(out)?;
            }
            if let Some(code) = finding.code_example.as_deref().filter(|_| finding.has_code_example()) {
                writeln!(out, "```")?;
                writeln!(out, "{code}")?;
                writeln!(out, "```")?;
                writeln!(out)?;
            }
        }
    }

    if let Some(comparison) = result.competitor_comparison.as_ref().filter(|c| !c.is_empty()) {
        writeln!(out, "#### Competitor comparison")?;
        writeln!(out)?;
        if !comparison.overall_assessment.is_empty() {
            writeln!(out, "{}", comparison.overall_assessment)?;
            writeln!(out)?;
        }
        write_list(out, "Where this site is stronger", &comparison.main_site_advantages)?;
        write_list(out, "Where the competitor is stronger", &comparison.competitor_advantages)?;
        write_list(out, "Ideas to borrow", &comparison.suggestions)?;
    }

    if !result.thinking_process.is_empty() {
        writeln!(out, "<details>")?;
        writeln!(out, "<summary>Reasoning</summary>")?;
        writeln!(out)?;
        writeln!(out, "{}", result.thinking_process)?;
        writeln!(out)?;
        writeln!(out, "</details>")?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_list(out: &mut String, heading: &str, items: &[String]) -> std::fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(out, "**{heading}:**")?;
    for item in items {
        writeln!(out, "- {item}")?;
    }
    writeln!(out)
}
