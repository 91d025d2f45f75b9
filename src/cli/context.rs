//! Process-wide wiring shared by every command: configuration, logging and
//! the persona, history, trend and chat stores.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

use crate::adapters::memory::in_memory_repositories;
use crate::adapters::sqlite::open_repositories;
use crate::domain::models::Config;
use crate::domain::ports::{Repositories, ScoringOracle, SiteFetcher};
use crate::infrastructure::config::loader::API_KEY_ENV;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::{cleanup_old_logs, LogConfig, LoggerImpl};
use crate::infrastructure::oracle::{ClaudeOracle, ClaudeOracleConfig};
use crate::infrastructure::rate_limit::IpRateLimiter;
use crate::infrastructure::scraper::HttpSiteFetcher;

/// Options that apply to every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub config_dir: PathBuf,
    pub ephemeral: bool,
    pub verbose: bool,
}

pub struct AppContext {
    pub config: Config,
    pub repositories: Repositories,
    _logger: LoggerImpl,
}

impl AppContext {
    /// Load configuration, start logging and open the stores.
    pub async fn init(options: &GlobalOptions) -> Result<Self> {
        let config = ConfigLoader::load_from_dir(&options.config_dir)
            .with_context(|| format!("Failed to load configuration from {}", options.config_dir.display()))?;

        let mut log_config = LogConfig::from_settings(&config.logging);
        if options.verbose {
            log_config = log_config.with_level("debug");
        }
        let logger = LoggerImpl::init(&log_config).context("Failed to initialize logging")?;
        if let Some(log_dir) = &log_config.log_dir {
            match cleanup_old_logs(log_dir, log_config.retention_days).await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "Removed expired log files"),
                Err(e) => warn!(error = %e, "Log retention cleanup failed"),
            }
        }

        let repositories = if options.ephemeral {
            debug!("Using in-memory stores");
            in_memory_repositories()
        } else {
            open_repositories(&config.database)
                .await
                .with_context(|| format!("Failed to open database at {}", config.database.path))?
        };

        Ok(Self {
            config,
            repositories,
            _logger: logger,
        })
    }

    /// Oracle over the configured API. Fails when no key is available.
    pub fn oracle(&self) -> Result<Arc<dyn ScoringOracle>> {
        let api_key = ConfigLoader::resolve_api_key(&self.config).ok_or_else(|| {
            anyhow!("No API key configured. Set {API_KEY_ENV} or oracle.api_key in the config file")
        })?;
        let oracle = ClaudeOracle::new(ClaudeOracleConfig::from_config(&self.config.oracle, api_key))
            .context("Failed to create oracle client")?;
        Ok(Arc::new(oracle))
    }

    /// HTTP fetcher with URL validation and the per-host request budget.
    pub fn fetcher(&self) -> Result<Arc<dyn SiteFetcher>> {
        let fetcher = HttpSiteFetcher::new(&self.config.fetcher)
            .context("Failed to create site fetcher")?
            .with_rate_limiter(IpRateLimiter::from_config(&self.config.rate_limit));
        Ok(Arc::new(fetcher))
    }
}
