use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cognis::config::CognisConfig;
use cognis::{cli, server};

#[derive(Parser)]
#[command(name = "cognis", version, about = "Cognitive memory and reasoning server")]
struct Cli {
    /// Path to the config file (defaults to ~/.cognis/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST server
    Serve,
    /// Start the MCP server (stdio transport)
    Mcp,
    /// Show memory, learning, and evolution statistics
    Stats,
    /// Retrieve memories matching a query
    Search {
        query: String,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Run one evolution cycle now
    Evolve,
    /// Check journal integrity
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CognisConfig::load_from(path)?,
        None => CognisConfig::load()?,
    };

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve_http(config).await?,
        Command::Mcp => server::serve_stdio(config).await?,
        Command::Stats => cli::stats(&config)?,
        Command::Search { query, limit } => cli::search(&config, &query, limit)?,
        Command::Evolve => cli::evolve(&config)?,
        Command::Doctor => cli::doctor(&config)?,
    }

    Ok(())
}
