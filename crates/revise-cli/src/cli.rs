use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "revise",
    about = "Revise: optimistic-concurrency merging for versioned entities",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Three-way merge of entity JSON files
    Merge(MergeArgs),
    /// Show field changes between two entity JSON files
    Diff(DiffArgs),
    /// Resolve a write against a recorded entity history
    Resolve(ResolveArgs),
    /// Load and validate a resolver configuration file
    CheckConfig(CheckConfigArgs),
}

#[derive(Args)]
pub struct MergeArgs {
    /// The entity the writer submitted
    #[arg(long)]
    pub incoming: PathBuf,
    /// The revision the write was based on
    #[arg(long)]
    pub base: PathBuf,
    /// The revision currently stored
    #[arg(long)]
    pub current: PathBuf,
}

#[derive(Args)]
pub struct DiffArgs {
    pub old: PathBuf,
    pub new: PathBuf,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// JSON array of stored revisions, oldest first
    #[arg(long)]
    pub history: PathBuf,
    #[arg(long)]
    pub dataset: String,
    #[arg(long)]
    pub id: String,
    /// The entity the writer submitted
    pub proposed: PathBuf,
    /// Resolver configuration (TOML); `[retry]` wraps the seeded store
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Persist the resolved entity and print it with its new version
    #[arg(long)]
    pub apply: bool,
}

#[derive(Args)]
pub struct CheckConfigArgs {
    pub path: PathBuf,
}
