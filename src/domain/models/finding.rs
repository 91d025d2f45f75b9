//! Findings surfaced by personas and their roadmap annotations.

use serde::{Deserialize, Serialize};

/// Severity of a finding.
///
/// Ordered `High < Medium < Low` so that an ascending sort puts the most
/// severe findings first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    #[default]
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Parse a severity, falling back to `Medium` for anything unrecognized.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Medium,
        }
    }
}

/// One issue surfaced by a persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub category: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_example: Option<String>,
}

impl Finding {
    pub fn new(id: impl Into<String>, severity: Severity, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: "general".to_string(),
            severity,
            title: title.into(),
            description: String::new(),
            recommendation: String::new(),
            code_example: None,
        }
    }

    pub fn with_code_example(mut self, code: impl Into<String>) -> Self {
        self.code_example = Some(code.into());
        self
    }

    pub fn has_code_example(&self) -> bool {
        self.code_example.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}

/// A finding tagged with the persona that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityItem {
    pub persona_name: String,
    #[serde(flatten)]
    pub finding: Finding,
}

/// Effort bucket a finding falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortLevel {
    Quick,
    Moderate,
    Significant,
}

impl EffortLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Moderate => "moderate",
            Self::Significant => "significant",
        }
    }

    /// Roadmap phase label for this bucket.
    pub fn phase_label(&self) -> &'static str {
        match self {
            Self::Quick => "Quick wins",
            Self::Moderate => "Planned improvements",
            Self::Significant => "Long-term improvements",
        }
    }
}

/// Rule-based effort and impact estimate for one finding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FindingEstimate {
    pub hours: f64,
    pub score_impact: f64,
    pub effort: EffortLevel,
}

impl FindingEstimate {
    /// Return on effort; zero-hour estimates never occur but are guarded anyway.
    pub fn roi(&self) -> f64 {
        if self.hours > 0.0 {
            self.score_impact / self.hours
        } else {
            self.score_impact
        }
    }
}

/// A finding annotated with its estimate and priority rank.
///
/// The wrapped finding is carried unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedFinding {
    #[serde(flatten)]
    pub finding: Finding,
    pub estimated_hours: f64,
    pub estimated_score_impact: f64,
    pub effort_level: EffortLevel,
    /// 1-based rank by return on effort.
    pub priority: usize,
}

impl EnrichedFinding {
    pub fn roi(&self) -> f64 {
        FindingEstimate {
            hours: self.estimated_hours,
            score_impact: self.estimated_score_impact,
            effort: self.effort_level,
        }
        .roi()
    }
}

/// One phase of an improvement roadmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapPhase {
    /// Dense, starting at 1.
    pub phase: usize,
    pub label: String,
    pub effort_level: EffortLevel,
    pub estimated_total_hours: f64,
    pub expected_score_gain: f64,
    pub findings: Vec<EnrichedFinding>,
}

/// Improvement roadmap derived from completed findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementRoadmap {
    pub phases: Vec<RoadmapPhase>,
    pub total_estimated_hours: f64,
    pub current_score: u8,
    /// Never exceeds 100.
    pub expected_final_score: u8,
}
