//! History and trend projections of finished analyses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use super::analysis::{AnalysisRecord, CategoryScore};

/// History keeps at most this many snapshots; older ones are evicted.
pub const MAX_HISTORY_ENTRIES: usize = 20;

/// Trend keeps at most this many points per normalized URL.
pub const MAX_TREND_POINTS: usize = 50;

/// Lightweight listing view of a saved analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: Uuid,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub overall_score: u8,
    pub category_scores: Vec<CategoryScore>,
    pub persona_count: usize,
    pub completed_persona_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub competitor_urls: Vec<String>,
}

impl From<&AnalysisRecord> for HistoryItem {
    fn from(record: &AnalysisRecord) -> Self {
        let mut competitor_urls: Vec<String> =
            record.competitor.iter().map(|c| c.url.clone()).collect();
        competitor_urls.extend(record.competitor_urls.iter().cloned());
        Self {
            id: record.id,
            url: record.url.clone(),
            created_at: record.created_at,
            overall_score: record.overall_score,
            category_scores: record.category_scores.clone(),
            persona_count: record.persona_results.len(),
            completed_persona_count: record.completed_count(),
            competitor_urls,
        }
    }
}

/// One score observation of a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendDataPoint {
    pub analysis_id: Uuid,
    pub date: DateTime<Utc>,
    pub overall_score: u8,
    pub category_scores: Vec<CategoryScore>,
}

impl From<&AnalysisRecord> for TrendDataPoint {
    fn from(record: &AnalysisRecord) -> Self {
        Self {
            analysis_id: record.id,
            date: record.created_at,
            overall_score: record.overall_score,
            category_scores: record.category_scores.clone(),
        }
    }
}

/// Score history of one normalized URL, oldest point first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlTrend {
    /// Most recently recorded raw URL.
    pub url: String,
    pub data_points: Vec<TrendDataPoint>,
}

impl UrlTrend {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            data_points: Vec::new(),
        }
    }

    /// Insert or replace the point for its analysis id, keeping the newest
    /// [`MAX_TREND_POINTS`].
    pub fn upsert(&mut self, point: TrendDataPoint) {
        match self
            .data_points
            .iter_mut()
            .find(|p| p.analysis_id == point.analysis_id)
        {
            Some(existing) => *existing = point,
            None => self.data_points.push(point),
        }
        if self.data_points.len() > MAX_TREND_POINTS {
            let excess = self.data_points.len() - MAX_TREND_POINTS;
            self.data_points.drain(..excess);
        }
    }

    pub fn latest(&self) -> Option<&TrendDataPoint> {
        self.data_points.last()
    }

    /// Score change between the last two points.
    pub fn delta(&self) -> Option<i16> {
        match self.data_points.as_slice() {
            [.., prev, last] => Some(i16::from(last.overall_score) - i16::from(prev.overall_score)),
            _ => None,
        }
    }
}

/// Trend key for a URL.
///
/// Lowercases the host, drops a trailing path slash except for the root path,
/// keeps the query and drops the fragment. Unparseable input is lowercased and
/// stripped of trailing slashes.
pub fn normalize_url(raw: &str) -> String {
    let Ok(parsed) = Url::parse(raw.trim()) else {
        return raw.trim().to_lowercase().trim_end_matches('/').to_string();
    };

    let mut path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }

    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    let port = parsed.port().map(|p| format!(":{p}")).unwrap_or_default();
    let query = parsed.query().map(|q| format!("?{q}")).unwrap_or_default();

    format!("{}://{host}{port}{path}{query}", parsed.scheme())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(score: u8) -> TrendDataPoint {
        TrendDataPoint {
            analysis_id: Uuid::new_v4(),
            date: Utc::now(),
            overall_score: score,
            category_scores: Vec::new(),
        }
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("https://Example.COM/"), "https://example.com/");
        assert_eq!(normalize_url("https://example.com/about/"), "https://example.com/about");
        assert_eq!(
            normalize_url("https://example.com/search/?q=Rust#top"),
            "https://example.com/search?q=Rust"
        );
        assert_eq!(normalize_url("http://example.com:8080/a"), "http://example.com:8080/a");
        assert_eq!(normalize_url("Not A Url//"), "not a url");
    }

    #[test]
    fn test_equivalent_urls_share_a_key() {
        assert_eq!(
            normalize_url("https://EXAMPLE.com/pricing/"),
            normalize_url("https://example.com/pricing")
        );
    }

    #[test]
    fn test_upsert_replaces_same_analysis() {
        let mut trend = UrlTrend::new("https://example.com");
        let mut first = point(40);
        trend.upsert(first.clone());
        first.overall_score = 55;
        trend.upsert(first);
        assert_eq!(trend.data_points.len(), 1);
        assert_eq!(trend.data_points[0].overall_score, 55);
    }

    #[test]
    fn test_upsert_keeps_newest_points() {
        let mut trend = UrlTrend::new("https://example.com");
        for i in 0..(MAX_TREND_POINTS + 5) {
            trend.upsert(point((i % 100) as u8));
        }
        assert_eq!(trend.data_points.len(), MAX_TREND_POINTS);
        assert_eq!(trend.data_points[0].overall_score, 5);
    }

    #[test]
    fn test_delta() {
        let mut trend = UrlTrend::new("https://example.com");
        assert_eq!(trend.delta(), None);
        trend.upsert(point(60));
        trend.upsert(point(72));
        assert_eq!(trend.delta(), Some(12));
        assert_eq!(trend.latest().map(|p| p.overall_score), Some(72));
    }
}
