//! Infrastructure layer module
//!
//! Concrete adapters for the ports defined in the domain layer:
//! - Scoring oracle over the Anthropic Messages API
//! - HTTP site fetcher with markup extraction
//! - Outbound URL validation and per-key rate limiting
//! - Configuration management
//! - Logging infrastructure

pub mod config;
pub mod logging;
pub mod oracle;
pub mod rate_limit;
pub mod scraper;
pub mod validators;
