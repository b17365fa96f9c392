//! RepoLens CLI
//!
//! Index a code tree and ask it where things live.

use anyhow::Result;
use clap::Parser;
use repolens_core::error::exit_codes;
use repolens_core::{Config, RepoLensError};
use tracing_subscriber::EnvFilter;

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<RepoLensError>()
            .map(|e| e.exit_code())
            .unwrap_or(exit_codes::GENERAL_ERROR);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(path) = cli.index_path {
        config.index.path = path;
    }

    match cli.command {
        Commands::Index(args) => commands::index::run(args, config, cli.format).await,
        Commands::Query(args) => commands::query::run(args, config, cli.format).await,
        Commands::Status => commands::status::run(&config, cli.format).await,
    }
}
