//! Persona domain model.
//!
//! A persona is an expert viewpoint (SEO specialist, accessibility auditor, ...)
//! that evaluates a site independently of the others.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

/// Maximum length of a persona's analysis focus, in characters.
pub const MAX_ANALYSIS_POINTS_LEN: usize = 500;

/// Closed set of persona categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersonaCategory {
    Marketing,
    Design,
    Technical,
    Business,
    UserExperience,
}

impl PersonaCategory {
    /// All categories in display order.
    pub const ALL: [PersonaCategory; 5] = [
        Self::Marketing,
        Self::Design,
        Self::Technical,
        Self::Business,
        Self::UserExperience,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Marketing => "marketing",
            Self::Design => "design",
            Self::Technical => "technical",
            Self::Business => "business",
            Self::UserExperience => "user-experience",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "marketing" => Some(Self::Marketing),
            "design" => Some(Self::Design),
            "technical" => Some(Self::Technical),
            "business" => Some(Self::Business),
            "user-experience" | "user_experience" | "ux" | "user" => Some(Self::UserExperience),
            _ => None,
        }
    }

    /// Human-readable label from the static category table.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Marketing => "Marketing",
            Self::Design => "Design",
            Self::Technical => "Technical",
            Self::Business => "Business",
            Self::UserExperience => "User Experience",
        }
    }

    /// Display color (hex) from the static category table.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Marketing => "#f59e0b",
            Self::Design => "#ec4899",
            Self::Technical => "#3b82f6",
            Self::Business => "#10b981",
            Self::UserExperience => "#8b5cf6",
        }
    }
}

impl std::fmt::Display for PersonaCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An expert persona definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub id: String,
    pub name: String,
    /// One-line specialty.
    pub specialty: String,
    /// Free-text analysis focus, bounded by [`MAX_ANALYSIS_POINTS_LEN`].
    pub analysis_points: String,
    pub category: PersonaCategory,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_framework: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring_criteria: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusions: Option<String>,
}

const fn default_true() -> bool {
    true
}

impl Persona {
    /// Create an enabled custom persona.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        specialty: impl Into<String>,
        analysis_points: impl Into<String>,
        category: PersonaCategory,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            specialty: specialty.into(),
            analysis_points: analysis_points.into(),
            category,
            enabled: true,
            is_default: false,
            evaluation_framework: None,
            scoring_criteria: None,
            exclusions: None,
        }
    }

    pub fn with_framework(mut self, framework: impl Into<String>) -> Self {
        self.evaluation_framework = Some(framework.into());
        self
    }

    pub fn with_scoring_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.scoring_criteria = Some(criteria.into());
        self
    }

    pub fn with_exclusions(mut self, exclusions: impl Into<String>) -> Self {
        self.exclusions = Some(exclusions.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Check the fields an oracle request depends on.
    pub fn validate(&self) -> DomainResult<()> {
        if self.id.trim().is_empty() {
            return Err(DomainError::ValidationFailed("persona id cannot be empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationFailed(format!(
                "persona '{}' name cannot be empty",
                self.id
            )));
        }
        if self.specialty.trim().is_empty() {
            return Err(DomainError::ValidationFailed(format!(
                "persona '{}' specialty cannot be empty",
                self.id
            )));
        }
        let len = self.analysis_points.chars().count();
        if len > MAX_ANALYSIS_POINTS_LEN {
            return Err(DomainError::ValidationFailed(format!(
                "persona '{}' analysis points are {len} characters (max {MAX_ANALYSIS_POINTS_LEN})",
                self.id
            )));
        }
        Ok(())
    }
}

/// Persona fields produced by the oracle's assist call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaDraft {
    pub name: String,
    pub specialty: String,
    pub analysis_points: String,
    pub category: PersonaCategory,
    #[serde(default)]
    pub evaluation_framework: String,
    #[serde(default)]
    pub scoring_criteria: String,
    #[serde(default)]
    pub exclusions: String,
}

impl PersonaDraft {
    /// Materialize the draft as a custom persona.
    pub fn into_persona(self, id: impl Into<String>) -> Persona {
        let non_empty = |s: String| if s.trim().is_empty() { None } else { Some(s) };
        Persona {
            id: id.into(),
            name: self.name,
            specialty: self.specialty,
            analysis_points: self.analysis_points,
            category: self.category,
            enabled: true,
            is_default: false,
            evaluation_framework: non_empty(self.evaluation_framework),
            scoring_criteria: non_empty(self.scoring_criteria),
            exclusions: non_empty(self.exclusions),
        }
    }
}

/// The built-in persona panel.
pub fn default_personas() -> Vec<Persona> {
    vec![
        Persona::new(
            "seo-specialist",
            "SEO Specialist",
            "Search visibility and on-page optimization",
            "Title and meta description quality, heading hierarchy, structured data, crawlability, internal linking",
            PersonaCategory::Marketing,
        )
        .with_framework("E-E-A-T")
        .with_exclusions("Visual design and code quality"),
        Persona::new(
            "conversion-marketer",
            "Conversion Marketer",
            "Landing page conversion and persuasion",
            "Value proposition clarity, calls to action, trust signals, friction in sign-up and purchase flows",
            PersonaCategory::Marketing,
        )
        .with_framework("LIFT model"),
        Persona::new(
            "content-strategist",
            "Content Strategist",
            "Messaging, tone and information architecture",
            "Readability, content depth, tone consistency, navigation labels, audience fit",
            PersonaCategory::Marketing,
        ),
        Persona::new(
            "ui-designer",
            "UI Designer",
            "Visual hierarchy and interface consistency",
            "Layout rhythm, typography, color contrast, component consistency, responsive behaviour",
            PersonaCategory::Design,
        )
        .with_framework("Gestalt principles"),
        Persona::new(
            "brand-designer",
            "Brand Designer",
            "Brand expression and visual identity",
            "Logo usage, imagery style, brand voice alignment, differentiation from competitors",
            PersonaCategory::Design,
        ),
        Persona::new(
            "frontend-engineer",
            "Frontend Engineer",
            "Markup quality and frontend architecture",
            "Semantic HTML, script loading strategy, CSS organization, framework usage, standards compliance",
            PersonaCategory::Technical,
        ),
        Persona::new(
            "performance-engineer",
            "Performance Engineer",
            "Page speed and Core Web Vitals",
            "Asset size and minification, image optimization, render-blocking resources, caching hints",
            PersonaCategory::Technical,
        )
        .with_framework("Core Web Vitals"),
        Persona::new(
            "security-auditor",
            "Security Auditor",
            "Transport and client-side security posture",
            "HTTPS usage, mixed content, third-party scripts, exposed metadata, form handling",
            PersonaCategory::Technical,
        )
        .with_framework("OWASP Top 10"),
        Persona::new(
            "business-strategist",
            "Business Strategist",
            "Business model and market positioning",
            "Offer clarity, pricing communication, credibility, competitive positioning, lead capture",
            PersonaCategory::Business,
        ),
        Persona::new(
            "accessibility-expert",
            "Accessibility Expert",
            "Inclusive design and assistive technology support",
            "Alt text coverage, heading order, landmark usage, link text, contrast, keyboard reachability",
            PersonaCategory::UserExperience,
        )
        .with_framework("WCAG 2.2"),
        Persona::new(
            "ux-researcher",
            "UX Researcher",
            "Usability and user journeys",
            "Navigation clarity, task flows, cognitive load, mobile usability, error prevention",
            PersonaCategory::UserExperience,
        )
        .with_framework("Nielsen heuristics"),
    ]
    .into_iter()
    .map(Persona::as_default)
    .collect()
}
