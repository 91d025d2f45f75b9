//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::commands::analyze::AnalyzeArgs;
use super::commands::chat::ChatArgs;
use super::commands::history::HistoryArgs;
use super::commands::personas::PersonaArgs;
use super::commands::roadmap::RoadmapArgs;
use super::commands::trend::TrendArgs;
use super::context::GlobalOptions;
use crate::infrastructure::config::loader::CONFIG_DIR;

#[derive(Parser, Debug)]
#[command(name = "siteprobe")]
#[command(about = "SiteProbe - multi-persona website analysis", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Keep personas and history in memory only
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Debug-level logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding config.yaml and local.yaml
    #[arg(long, global = true, default_value = CONFIG_DIR)]
    pub config_dir: PathBuf,
}

impl Cli {
    pub fn global_options(&self) -> GlobalOptions {
        GlobalOptions {
            config_dir: self.config_dir.clone(),
            ephemeral: self.ephemeral,
            verbose: self.verbose,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a website with the persona panel
    Analyze(AnalyzeArgs),

    /// Persona management commands
    Personas(PersonaArgs),

    /// Saved analysis commands
    History(HistoryArgs),

    /// Improvement roadmap for a saved analysis
    Roadmap(RoadmapArgs),

    /// Score trend of a URL
    Trend(TrendArgs),

    /// Ask a persona follow-up questions about a saved analysis
    Chat(ChatArgs),
}
