//! `siteprobe trend`: score history of a URL across analyses.

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::display::{colorize_delta, colorize_score, list_table, render_list, short_id};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::UrlTrend;

#[derive(Args, Debug)]
pub struct TrendArgs {
    /// URL to show; lists every tracked URL when omitted
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrackedUrlsOutput {
    pub urls: Vec<String>,
}

impl CommandOutput for TrackedUrlsOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["url"]);
        for url in &self.urls {
            table.add_row(vec![url.clone()]);
        }
        render_list("tracked URL", "tracked URLs", table, self.urls.len())
    }
}

#[derive(Debug, Serialize)]
pub struct TrendOutput {
    #[serde(flatten)]
    pub trend: UrlTrend,
    pub delta: Option<i16>,
}

impl CommandOutput for TrendOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["date", "analysis", "score", "change"]);
        let mut previous: Option<u8> = None;
        for point in &self.trend.data_points {
            let change = match previous {
                Some(prev) => colorize_delta(i16::from(point.overall_score) - i16::from(prev)).to_string(),
                None => "-".to_string(),
            };
            table.add_row(vec![
                point.date.format("%Y-%m-%d %H:%M").to_string(),
                short_id(&point.analysis_id.to_string()).to_string(),
                colorize_score(point.overall_score).to_string(),
                change,
            ]);
            previous = Some(point.overall_score);
        }

        let mut out = format!("Trend for {}\n", self.trend.url);
        out.push_str(&render_list("data point", "data points", table, self.trend.data_points.len()));
        if let Some(delta) = self.delta {
            out.push_str(&format!("\n\nChange since previous analysis: {}", colorize_delta(delta)));
        }
        out
    }
}

pub async fn execute(args: TrendArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let trends = ctx.repositories.trends.as_ref();

    match args.url {
        None => {
            let out = TrackedUrlsOutput {
                urls: trends.list_urls().await?,
            };
            output(&out, json_mode);
        }
        Some(url) => {
            let Some(trend) = trends.get_trend(&url).await? else {
                bail!("No trend data for {url}. Run 'siteprobe analyze {url}' first");
            };
            let out = TrendOutput {
                delta: trend.delta(),
                trend,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TrendDataPoint;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    #[test]
    fn test_trend_output_shows_changes() {
        console::set_colors_enabled(false);
        let mut trend = UrlTrend::new("https://example.com");
        for (days_ago, score) in [(2, 55u8), (1, 62)] {
            trend.upsert(TrendDataPoint {
                analysis_id: Uuid::new_v4(),
                date: Utc::now() - Duration::days(days_ago),
                overall_score: score,
                category_scores: Vec::new(),
            });
        }
        let out = TrendOutput {
            delta: trend.delta(),
            trend,
        };

        let human = out.to_human();
        assert!(human.starts_with("Trend for https://example.com"));
        assert!(human.contains("+7"));
        assert_eq!(out.to_json()["delta"], 7);
    }
}
