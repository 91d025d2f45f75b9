//! Oracle outputs after validation.

use serde::{Deserialize, Serialize};

use super::finding::Finding;
use super::persona::PersonaCategory;

/// How the analyzed site compares to the competitor, from one persona's view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorComparison {
    pub main_site_advantages: Vec<String>,
    pub competitor_advantages: Vec<String>,
    pub suggestions: Vec<String>,
    pub overall_assessment: String,
}

impl CompetitorComparison {
    pub fn is_empty(&self) -> bool {
        self.main_site_advantages.is_empty()
            && self.competitor_advantages.is_empty()
            && self.suggestions.is_empty()
            && self.overall_assessment.trim().is_empty()
    }
}

/// A validated persona evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Clamped to `0..=100`.
    pub score: u8,
    pub summary: String,
    pub findings: Vec<Finding>,
    pub thinking_process: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitor_comparison: Option<CompetitorComparison>,
}

/// A validated five-category quick scan of a secondary competitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickScan {
    pub overall_score: u8,
    pub category_scores: Vec<(PersonaCategory, u8)>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

/// Clamp an arbitrary oracle score into `0..=100`.
pub fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 50;
    }
    raw.round().clamp(0.0, 100.0) as u8
}
