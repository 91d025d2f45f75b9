//! SiteProbe - multi-persona website analysis
//!
//! A panel of expert personas independently evaluates a website (and
//! optionally its competitors) through a text-generation oracle. Evaluations
//! run with bounded concurrency against one shared analysis record whose
//! scores are re-aggregated after every persona completes.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, the analysis status machine and ports
//! - **Service Layer** (`services`): orchestration, aggregation and estimation
//! - **Infrastructure Layer** (`infrastructure`): oracle client, scraper,
//!   validation, rate limiting, configuration and logging
//! - **Adapters** (`adapters`): in-memory and SQLite stores
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use siteprobe::adapters::in_memory_repositories;
//! use siteprobe::services::{AnalysisOrchestrator, AnalysisRequest};
//!
//! let orchestrator = AnalysisOrchestrator::new(fetcher, oracle, Arc::new(in_memory_repositories()));
//! let outcome = orchestrator.run_analysis(AnalysisRequest::new("https://example.com")).await?;
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    AnalysisRecord, AnalysisStatus, Config, Persona, PersonaCategory, PersonaStatus,
    ScrapedContent,
};
pub use domain::ports::{
    AnalysisStores, FetchError, OracleError, Repositories, ScoringOracle, SiteFetcher,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{AnalysisEvent, AnalysisOrchestrator, AnalysisOutcome, AnalysisRequest};
