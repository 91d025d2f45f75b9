//! SQLite implementation of the PersonaRepository.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{default_personas, Persona, PersonaCategory};
use crate::domain::ports::PersonaRepository;

const PERSONA_COLUMNS: &str = "id, name, specialty, analysis_points, category, enabled, is_default, evaluation_framework, scoring_criteria, exclusions";

#[derive(Clone)]
pub struct SqlitePersonaRepository {
    pool: SqlitePool,
}

impl SqlitePersonaRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert the built-in personas, refreshing the content of ones already
    /// stored. The enabled flag a user chose is preserved.
    pub async fn seed_defaults(&self) -> DomainResult<usize> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        let existing: HashSet<String> = sqlx::query_as::<_, (String,)>("SELECT id FROM personas")
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|(id,)| id)
            .collect();
        let mut inserted = 0;

        for persona in default_personas() {
            sqlx::query(
                r#"INSERT INTO personas (id, name, specialty, analysis_points, category, enabled, is_default, evaluation_framework, scoring_criteria, exclusions, created_at)
                   VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?, ?, ?)
                   ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     specialty = excluded.specialty,
                     analysis_points = excluded.analysis_points,
                     category = excluded.category,
                     is_default = 1,
                     evaluation_framework = excluded.evaluation_framework,
                     scoring_criteria = excluded.scoring_criteria,
                     exclusions = excluded.exclusions"#,
            )
            .bind(&persona.id)
            .bind(&persona.name)
            .bind(&persona.specialty)
            .bind(&persona.analysis_points)
            .bind(persona.category.as_str())
            .bind(persona.enabled)
            .bind(&persona.evaluation_framework)
            .bind(&persona.scoring_criteria)
            .bind(&persona.exclusions)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
            if !existing.contains(&persona.id) {
                inserted += 1;
            }
        }

        tx.commit().await?;
        debug!(count = inserted, "seeded default personas");
        Ok(inserted)
    }
}

#[async_trait]
impl PersonaRepository for SqlitePersonaRepository {
    async fn list(&self) -> DomainResult<Vec<Persona>> {
        let rows: Vec<PersonaRow> = sqlx::query_as(&format!(
            "SELECT {PERSONA_COLUMNS} FROM personas ORDER BY is_default DESC, rowid"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_enabled(&self) -> DomainResult<Vec<Persona>> {
        let rows: Vec<PersonaRow> = sqlx::query_as(&format!(
            "SELECT {PERSONA_COLUMNS} FROM personas WHERE enabled = 1 ORDER BY is_default DESC, rowid"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn get(&self, id: &str) -> DomainResult<Option<Persona>> {
        let row: Option<PersonaRow> = sqlx::query_as(&format!(
            "SELECT {PERSONA_COLUMNS} FROM personas WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn add(&self, persona: &Persona) -> DomainResult<()> {
        persona.validate()?;
        if self.get(&persona.id).await?.is_some() {
            return Err(DomainError::DuplicatePersona(persona.id.clone()));
        }

        sqlx::query(
            r#"INSERT INTO personas (id, name, specialty, analysis_points, category, enabled, is_default, evaluation_framework, scoring_criteria, exclusions, created_at)
               VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?)"#,
        )
        .bind(&persona.id)
        .bind(&persona.name)
        .bind(&persona.specialty)
        .bind(&persona.analysis_points)
        .bind(persona.category.as_str())
        .bind(persona.enabled)
        .bind(&persona.evaluation_framework)
        .bind(&persona.scoring_criteria)
        .bind(&persona.exclusions)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, persona: &Persona) -> DomainResult<Persona> {
        let stored = self
            .get(&persona.id)
            .await?
            .ok_or_else(|| DomainError::PersonaNotFound(persona.id.clone()))?;

        if stored.is_default {
            // Content of a default persona is fixed; only the flag moves.
            sqlx::query("UPDATE personas SET enabled = ? WHERE id = ?")
                .bind(persona.enabled)
                .bind(&persona.id)
                .execute(&self.pool)
                .await?;
        } else {
            persona.validate()?;
            sqlx::query(
                r#"UPDATE personas SET name = ?, specialty = ?, analysis_points = ?, category = ?,
                   enabled = ?, evaluation_framework = ?, scoring_criteria = ?, exclusions = ?
                   WHERE id = ?"#,
            )
            .bind(&persona.name)
            .bind(&persona.specialty)
            .bind(&persona.analysis_points)
            .bind(persona.category.as_str())
            .bind(persona.enabled)
            .bind(&persona.evaluation_framework)
            .bind(&persona.scoring_criteria)
            .bind(&persona.exclusions)
            .bind(&persona.id)
            .execute(&self.pool)
            .await?;
        }

        self.get(&persona.id)
            .await?
            .ok_or_else(|| DomainError::PersonaNotFound(persona.id.clone()))
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let stored = self
            .get(id)
            .await?
            .ok_or_else(|| DomainError::PersonaNotFound(id.to_string()))?;
        if stored.is_default {
            return Err(DomainError::DefaultPersonaImmutable(id.to_string()));
        }

        sqlx::query("DELETE FROM personas WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn toggle(&self, id: &str) -> DomainResult<bool> {
        let row: Option<(bool,)> =
            sqlx::query_as("UPDATE personas SET enabled = NOT enabled WHERE id = ? RETURNING enabled")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(enabled,)| enabled)
            .ok_or_else(|| DomainError::PersonaNotFound(id.to_string()))
    }
}

#[derive(sqlx::FromRow)]
struct PersonaRow {
    id: String,
    name: String,
    specialty: String,
    analysis_points: String,
    category: String,
    enabled: bool,
    is_default: bool,
    evaluation_framework: Option<String>,
    scoring_criteria: Option<String>,
    exclusions: Option<String>,
}

impl TryFrom<PersonaRow> for Persona {
    type Error = DomainError;

    fn try_from(row: PersonaRow) -> Result<Self, Self::Error> {
        let category = PersonaCategory::from_str(&row.category)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid category: {}", row.category)))?;

        Ok(Persona {
            id: row.id,
            name: row.name,
            specialty: row.specialty,
            analysis_points: row.analysis_points,
            category,
            enabled: row.enabled,
            is_default: row.is_default,
            evaluation_framework: row.evaluation_framework,
            scoring_criteria: row.scoring_criteria,
            exclusions: row.exclusions,
        })
    }
}
