//! Smeagol CLI - Command-line interface for Smeagol search
//!
//! Keeps a full-text index of the Markdown documents in a directory of
//! git repositories in step with their default branches.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod settings;

#[derive(Parser)]
#[command(name = "smeagol")]
#[command(author = "Smeagol Contributors")]
#[command(version)]
#[command(about = "Incremental search indexing for Markdown in git repositories", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding the index and settings
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory with default settings
    Init,

    /// Bring the index up to date with the repositories below a root
    Sync {
        /// Directory containing the repositories
        root: PathBuf,

        /// Only sync these repositories
        repositories: Vec<String>,
    },

    /// Rebuild the index of one repository from scratch
    Reindex {
        /// Directory containing the repositories
        root: PathBuf,

        /// Repository to rebuild
        repository: String,
    },

    /// Show index status per repository
    Status {
        /// Directory containing the repositories
        root: PathBuf,
    },

    /// Sync, then keep syncing whenever refs change
    Watch {
        /// Directory containing the repositories
        root: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let data_dir = cli.data_dir.unwrap_or_else(settings::default_data_dir);

    let result = match cli.command {
        Commands::Init => commands::init(&data_dir),
        Commands::Sync { root, repositories } => {
            commands::sync(&data_dir, &root, &repositories).await
        }
        Commands::Reindex { root, repository } => commands::reindex(&data_dir, &root, &repository),
        Commands::Status { root } => commands::status(&data_dir, &root),
        Commands::Watch { root } => commands::watch(&data_dir, &root).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
