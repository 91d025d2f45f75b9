//! Persona CLI commands.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use serde::{Deserialize, Serialize};

use crate::cli::context::AppContext;
use crate::cli::display::{
    action_success, colorize_status, list_table, render_list, truncate_ellipsis, DetailView,
};
use crate::cli::output::{output, CommandOutput};
use crate::domain::errors::DomainError;
use crate::domain::models::{Persona, PersonaCategory};
use crate::domain::ports::PersonaRepository;
use crate::services::persona_assist::{materialize, validate_theme};

#[derive(Args, Debug)]
pub struct PersonaArgs {
    #[command(subcommand)]
    pub command: PersonaCommands,
}

#[derive(Subcommand, Debug)]
pub enum PersonaCommands {
    /// List all personas
    List,
    /// Add a custom persona
    Add {
        /// Unique persona ID
        id: String,
        /// Display name
        #[arg(short, long)]
        name: String,
        /// One-line specialty
        #[arg(short, long)]
        specialty: String,
        /// Category (marketing, design, technical, business, user-experience)
        #[arg(short, long)]
        category: String,
        /// What the persona focuses on (max 500 characters)
        #[arg(short, long, default_value = "")]
        points: String,
        /// Evaluation framework the persona applies
        #[arg(long)]
        framework: Option<String>,
        /// How the persona assigns scores
        #[arg(long)]
        criteria: Option<String>,
        /// Topics the persona leaves to others
        #[arg(long)]
        exclusions: Option<String>,
    },
    /// Remove a custom persona
    Remove {
        /// Persona ID
        id: String,
    },
    /// Enable or disable a persona
    Toggle {
        /// Persona ID
        id: String,
    },
    /// Import custom personas from a YAML or JSON file
    Import {
        /// File holding a list of personas, or a `personas:` key with one
        path: PathBuf,
    },
    /// Draft a persona from a short theme
    Assist {
        /// Theme, e.g. "accessibility auditor for public sector sites"
        theme: String,
        /// Store the drafted persona
        #[arg(long)]
        save: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct PersonaListOutput {
    pub personas: Vec<Persona>,
    pub total: usize,
}

impl CommandOutput for PersonaListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "category", "status", "type"]);
        for persona in &self.personas {
            let status = if persona.enabled { "enabled" } else { "disabled" };
            table.add_row(vec![
                persona.id.clone(),
                truncate_ellipsis(&persona.name, 32),
                persona.category.label().to_string(),
                colorize_status(status).to_string(),
                if persona.is_default { "default" } else { "custom" }.to_string(),
            ]);
        }
        render_list("persona", "personas", table, self.total)
    }
}

#[derive(Debug, Serialize)]
pub struct PersonaDetailOutput {
    pub persona: Persona,
    pub saved: bool,
}

impl CommandOutput for PersonaDetailOutput {
    fn to_human(&self) -> String {
        let p = &self.persona;
        let view = DetailView::new(&p.name)
            .field("ID", &p.id)
            .field("Category", p.category.label())
            .field("Specialty", &p.specialty)
            .field("Focus", &p.analysis_points)
            .field_opt("Framework", p.evaluation_framework.as_deref())
            .field_opt("Scoring", p.scoring_criteria.as_deref())
            .field_opt("Exclusions", p.exclusions.as_deref());
        let mut out = view.render();
        if !self.saved {
            out.push_str("\n\nNot saved. Re-run with --save to keep this persona.");
        }
        out
    }
}

#[derive(Debug, Serialize)]
pub struct PersonaActionOutput {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl CommandOutput for PersonaActionOutput {
    fn to_human(&self) -> String {
        action_success(&self.message)
    }
}

#[derive(Debug, Default, Serialize)]
pub struct ImportOutput {
    pub imported: Vec<String>,
    pub skipped: Vec<String>,
}

impl CommandOutput for ImportOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![action_success(&format!("Imported {} persona(s)", self.imported.len()))];
        if !self.skipped.is_empty() {
            lines.push(format!("Skipped existing: {}", self.skipped.join(", ")));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportFile {
    List(Vec<Persona>),
    Wrapped { personas: Vec<Persona> },
}

impl ImportFile {
    fn into_personas(self) -> Vec<Persona> {
        match self {
            Self::List(personas) | Self::Wrapped { personas } => personas,
        }
    }
}

/// Parse an import document. YAML is a superset of JSON, so both are accepted.
fn parse_import(text: &str) -> Result<Vec<Persona>> {
    let file: ImportFile = serde_yaml::from_str(text).context("Invalid persona import file")?;
    Ok(file.into_personas())
}

/// Add every persona as a custom one, skipping ids that already exist.
async fn import_personas(repo: &dyn PersonaRepository, personas: Vec<Persona>) -> Result<ImportOutput> {
    // Validate everything first so a bad entry imports nothing.
    for persona in &personas {
        persona.validate()?;
    }
    let mut out = ImportOutput::default();
    for persona in personas {
        let persona = Persona {
            is_default: false,
            ..persona
        };
        match repo.add(&persona).await {
            Ok(()) => out.imported.push(persona.id),
            Err(DomainError::DuplicatePersona(id)) => out.skipped.push(id),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(out)
}

fn parse_category(raw: &str) -> Result<PersonaCategory> {
    PersonaCategory::from_str(raw).ok_or_else(|| {
        let valid: Vec<&str> = PersonaCategory::ALL.iter().map(PersonaCategory::as_str).collect();
        anyhow!("Invalid category '{raw}'. Must be one of: {}", valid.join(", "))
    })
}

pub async fn execute(args: PersonaArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let repo = ctx.repositories.personas.as_ref();

    match args.command {
        PersonaCommands::List => {
            let personas = repo.list().await?;
            let out = PersonaListOutput {
                total: personas.len(),
                personas,
            };
            output(&out, json_mode);
        }

        PersonaCommands::Add {
            id,
            name,
            specialty,
            category,
            points,
            framework,
            criteria,
            exclusions,
        } => {
            let mut persona = Persona::new(id, name, specialty, points, parse_category(&category)?);
            persona.evaluation_framework = framework;
            persona.scoring_criteria = criteria;
            persona.exclusions = exclusions;
            repo.add(&persona).await?;
            let out = PersonaActionOutput {
                success: true,
                message: format!("Added persona {}", persona.id),
                enabled: Some(true),
            };
            output(&out, json_mode);
        }

        PersonaCommands::Remove { id } => {
            repo.delete(&id).await?;
            let out = PersonaActionOutput {
                success: true,
                message: format!("Removed persona {id}"),
                enabled: None,
            };
            output(&out, json_mode);
        }

        PersonaCommands::Toggle { id } => {
            let enabled = repo.toggle(&id).await?;
            let out = PersonaActionOutput {
                success: true,
                message: format!("Persona {id} {}", if enabled { "enabled" } else { "disabled" }),
                enabled: Some(enabled),
            };
            output(&out, json_mode);
        }

        PersonaCommands::Import { path } => {
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let out = import_personas(repo, parse_import(&text)?).await?;
            output(&out, json_mode);
        }

        PersonaCommands::Assist { theme, save } => {
            let theme = validate_theme(&theme)?;
            let oracle = ctx.oracle()?;
            let draft = oracle
                .assist(theme)
                .await
                .context("Persona draft request failed")?;
            let existing = repo.list().await?;
            let persona = materialize(draft, &existing)?;
            if save {
                repo.add(&persona).await?;
            }
            output(&PersonaDetailOutput { persona, saved: save }, json_mode);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPersonaRepository;

    const IMPORT_YAML: &str = r#"
personas:
  - id: legal-reviewer
    name: Legal Reviewer
    specialty: Compliance and privacy
    analysis_points: Privacy policy, cookie consent, terms
    category: business
  - id: seo-specialist
    name: Shadowing a default
    specialty: Should be skipped
    analysis_points: ""
    category: marketing
    is_default: true
"#;

    #[test]
    fn test_parse_import_accepts_json_list() {
        let json = r#"[{"id":"a11y","name":"Accessibility","specialty":"WCAG","analysis_points":"","category":"design"}]"#;
        let personas = parse_import(json).unwrap();
        assert_eq!(personas.len(), 1);
        assert!(personas[0].enabled);
        assert!(parse_import("personas: 3").is_err());
    }

    #[tokio::test]
    async fn test_import_skips_existing_ids() {
        let repo = InMemoryPersonaRepository::new();
        let out = import_personas(&repo, parse_import(IMPORT_YAML).unwrap()).await.unwrap();

        assert_eq!(out.imported, vec!["legal-reviewer"]);
        assert_eq!(out.skipped, vec!["seo-specialist"]);
        let imported = repo.get("legal-reviewer").await.unwrap().unwrap();
        assert!(!imported.is_default);
    }

    #[tokio::test]
    async fn test_import_rejects_invalid_entries_atomically() {
        let repo = InMemoryPersonaRepository::with_personas(Vec::new());
        let mut personas = parse_import(IMPORT_YAML).unwrap();
        personas[1].name = String::new();
        assert!(import_personas(&repo, personas).await.is_err());
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[test]
    fn test_parse_category() {
        assert_eq!(parse_category("design").unwrap(), PersonaCategory::Design);
        let err = parse_category("finance").unwrap_err().to_string();
        assert!(err.contains("user-experience"));
    }
}
