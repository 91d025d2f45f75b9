//! Theme validation and persona materialization for the assist flow.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Persona, PersonaDraft};

/// Maximum assist theme length, in characters.
pub const MAX_THEME_LEN: usize = 200;

/// Trim and bound an assist theme.
pub fn validate_theme(theme: &str) -> DomainResult<&str> {
    let theme = theme.trim();
    if theme.is_empty() {
        return Err(DomainError::ValidationFailed("theme cannot be empty".to_string()));
    }
    let len = theme.chars().count();
    if len > MAX_THEME_LEN {
        return Err(DomainError::ValidationFailed(format!(
            "theme is {len} characters (max {MAX_THEME_LEN})"
        )));
    }
    Ok(theme)
}

/// Slug id for a drafted persona, unique among `existing`.
pub fn persona_id_for(name: &str, existing: &[Persona]) -> String {
    let mut slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    while slug.contains("--") {
        slug = slug.replace("--", "-");
    }
    let slug = slug.trim_matches('-');
    let base = if slug.is_empty() { "custom" } else { slug };

    let mut candidate = base.to_string();
    let mut n = 2;
    while existing.iter().any(|p| p.id == candidate) {
        candidate = format!("{base}-{n}");
        n += 1;
    }
    candidate
}

/// Turn a draft into a validated custom persona.
pub fn materialize(draft: PersonaDraft, existing: &[Persona]) -> DomainResult<Persona> {
    let id = persona_id_for(&draft.name, existing);
    let persona = draft.into_persona(id);
    persona.validate()?;
    Ok(persona)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::PersonaCategory;

    #[test]
    fn test_validate_theme() {
        assert_eq!(validate_theme("  legal compliance ").unwrap(), "legal compliance");
        assert!(validate_theme("   ").is_err());
        assert!(validate_theme(&"x".repeat(MAX_THEME_LEN)).is_ok());
        assert!(validate_theme(&"x".repeat(MAX_THEME_LEN + 1)).is_err());
    }

    #[test]
    fn test_persona_id_for() {
        let existing = vec![Persona::new("legal-reviewer", "Legal", "s", "p", PersonaCategory::Business)];
        assert_eq!(persona_id_for("Legal Reviewer", &existing), "legal-reviewer-2");
        assert_eq!(persona_id_for("Data & Privacy!!", &[]), "data-privacy");
        assert_eq!(persona_id_for("日本語", &[]), "custom");
    }
}
