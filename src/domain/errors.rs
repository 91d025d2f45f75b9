//! Domain errors for the SiteProbe analysis system.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur in the SiteProbe system.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Analysis not found: {0}")]
    AnalysisNotFound(Uuid),

    #[error("Persona not found: {0}")]
    PersonaNotFound(String),

    #[error("Persona already exists: {0}")]
    DuplicatePersona(String),

    #[error("Default persona {0} cannot be deleted or edited")]
    DefaultPersonaImmutable(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition { from: String, to: String, reason: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
