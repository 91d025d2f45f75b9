//! Portable summary of a finished analysis for sharing outside the store.
//!
//! The payload keeps scores, summaries and findings of completed personas and
//! leaves out page bodies, failed personas and competitor data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::models::{AnalysisRecord, Finding, PersonaCategory};

/// Payload format written by [`SharePayload::from_record`].
pub const SHARE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("Share payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported share payload version {0} (expected {SHARE_VERSION})")]
    UnsupportedVersion(u32),

    #[error("Share payload has no URL")]
    MissingUrl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareCategory {
    pub category: PersonaCategory,
    pub label: String,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharePersona {
    pub name: String,
    pub category: PersonaCategory,
    pub score: u8,
    pub summary: String,
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub thinking: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharePayload {
    pub v: u32,
    pub url: String,
    pub date: DateTime<Utc>,
    pub overall_score: u8,
    #[serde(default)]
    pub categories: Vec<ShareCategory>,
    pub personas: Vec<SharePersona>,
}

impl SharePayload {
    pub fn from_record(record: &AnalysisRecord) -> Self {
        Self {
            v: SHARE_VERSION,
            url: record.url.clone(),
            date: record.created_at,
            overall_score: record.overall_score,
            categories: record
                .category_scores
                .iter()
                .map(|c| ShareCategory {
                    category: c.category,
                    label: c.label.clone(),
                    score: c.score,
                })
                .collect(),
            personas: record
                .persona_results
                .iter()
                .filter(|p| p.is_completed())
                .map(|p| SharePersona {
                    name: p.persona_name.clone(),
                    category: p.persona_category,
                    score: p.score,
                    summary: p.summary.clone(),
                    findings: p.findings.clone(),
                    thinking: p.thinking_process.clone(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, ShareError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a payload, rejecting unknown versions and URL-less payloads.
    pub fn parse(json: &str) -> Result<Self, ShareError> {
        let payload: Self = serde_json::from_str(json)?;
        if payload.v != SHARE_VERSION {
            return Err(ShareError::UnsupportedVersion(payload.v));
        }
        if payload.url.trim().is_empty() {
            return Err(ShareError::MissingUrl);
        }
        Ok(payload)
    }

    pub fn finding_count(&self) -> usize {
        self.personas.iter().map(|p| p.findings.len()).sum()
    }
}
