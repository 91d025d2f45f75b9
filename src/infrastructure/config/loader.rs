use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project-local configuration directory.
pub const CONFIG_DIR: &str = ".siteprobe";

/// Environment variable consulted when `oracle.api_key` is unset.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid oracle rate limit: {0}. Must be positive")]
    InvalidOracleRateLimit(f64),

    #[error("Invalid timeout for {0}: must be at least 1 second")]
    InvalidTimeout(&'static str),

    #[error("Invalid max_tokens: {0}. Must be at least 1")]
    InvalidMaxTokens(u32),

    #[error("Invalid max_html_chars: {0}. Must be at least 1")]
    InvalidMaxHtmlChars(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid request window: {requests} requests per {window_secs}s")]
    InvalidRequestWindow { requests: u32, window_secs: u64 },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .siteprobe/config.yaml (project config)
    /// 3. .siteprobe/local.yaml (local overrides, optional)
    /// 4. Environment variables (SITEPROBE_* prefix, `__` between sections)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(CONFIG_DIR)
    }

    /// Same as [`ConfigLoader::load`] with the config directory given explicitly.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let dir = dir.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed("SITEPROBE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// API key from config, falling back to `ANTHROPIC_API_KEY`.
    pub fn resolve_api_key(config: &Config) -> Option<String> {
        config
            .oracle
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let oracle = &config.oracle;
        if oracle.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "oracle.base_url cannot be empty".to_string(),
            ));
        }
        if oracle.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "oracle.model cannot be empty".to_string(),
            ));
        }
        if oracle.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout("oracle"));
        }
        if oracle.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens(oracle.max_tokens));
        }
        if oracle.rate_limit_rps <= 0.0 || !oracle.rate_limit_rps.is_finite() {
            return Err(ConfigError::InvalidOracleRateLimit(oracle.rate_limit_rps));
        }

        if config.fetcher.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout("fetcher"));
        }
        if config.fetcher.max_html_chars == 0 {
            return Err(ConfigError::InvalidMaxHtmlChars(config.fetcher.max_html_chars));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        let window = &config.rate_limit;
        if window.requests_per_window == 0 || window.window_secs == 0 {
            return Err(ConfigError::InvalidRequestWindow {
                requests: window.requests_per_window,
                window_secs: window.window_secs,
            });
        }

        Ok(())
    }
}
