//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "repolens")]
#[command(
    author,
    version,
    about = "Semantic search over local and GitHub-hosted code trees"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Index base path; artifacts are written next to it
    #[arg(long, global = true, env = "REPOLENS_INDEX")]
    pub index_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Walk, chunk and embed a directory or GitHub repository
    Index(IndexArgs),

    /// Find the code locations most relevant to a question
    Query(QueryArgs),

    /// Show index status
    Status,
}

#[derive(Args)]
pub struct IndexArgs {
    /// Local directory or https://github.com/<owner>/<repo>[/tree/<ref>]
    pub root: String,
}

#[derive(Args)]
pub struct QueryArgs {
    /// Search query
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Number of results
    #[arg(short = 'n')]
    pub limit: Option<usize>,

    /// Minimum score threshold
    #[arg(long)]
    pub min_score: Option<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}
