//! Command-line interface: argument parsing, command dispatch and output.

pub mod commands;
pub mod context;
pub mod display;
pub mod id_resolver;
pub mod output;
pub mod types;

use anyhow::Result;
use console::style;

pub use context::{AppContext, GlobalOptions};
pub use types::{Cli, Commands};

/// Run the parsed command line to completion.
pub async fn run(cli: Cli) -> Result<()> {
    let ctx = AppContext::init(&cli.global_options()).await?;
    let json = cli.json;

    match cli.command {
        Commands::Analyze(args) => commands::analyze::execute(args, &ctx, json).await,
        Commands::Personas(args) => commands::personas::execute(args, &ctx, json).await,
        Commands::History(args) => commands::history::execute(args, &ctx, json).await,
        Commands::Roadmap(args) => commands::roadmap::execute(args, &ctx, json).await,
        Commands::Trend(args) => commands::trend::execute(args, &ctx, json).await,
        Commands::Chat(args) => commands::chat::execute(args, &ctx, json).await,
    }
}

/// Report a command failure and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", style("Error:").red().bold());
    }
    std::process::exit(1)
}
