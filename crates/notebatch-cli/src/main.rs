//! Notebatch CLI
//!
//! Command-line interface for notebatch - local notes with a batched remote
//! sync.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use notebatch_core::{Config, Repository};

mod commands;
mod output;

use output::{Output, OutputFormat};

/// Environment variable holding the log level
const LOG_ENV: &str = "NOTEBATCH_LOG";

#[derive(Parser)]
#[command(name = "notebatch")]
#[command(about = "Notebatch - Offline-first notes with batched sync")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a note
    #[command(alias = "create")]
    Add {
        /// Note title
        title: String,
        /// Note content
        content: String,
    },
    /// Edit a note's title and/or content
    Edit {
        /// Note ID
        id: String,
        /// New title
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// New content
        #[arg(short, long)]
        content: Option<String>,
    },
    /// Delete notes
    #[command(alias = "delete")]
    Rm {
        /// Note IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show a single note
    Show {
        /// Note ID
        id: String,
    },
    /// List notes, newest first
    #[command(alias = "ls")]
    List {
        /// Only notes whose title or content contains this text
        #[arg(short, long, default_value = "")]
        filter: String,
        /// Oldest first
        #[arg(long)]
        asc: bool,
        /// Extra pages to load beyond the first
        #[arg(short, long, default_value_t = 0)]
        pages: usize,
    },
    /// Pull notes from the remote
    Sync {
        /// Number of notes to request (defaults to sync_count)
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
    /// Show store and sync status
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, page_size, sync_count, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work without opening the store
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, &output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    let repo = Repository::open(&config).map_err(commands::user_error)?;

    match cli.command {
        Commands::Add { title, content } => commands::note::add(&repo, &title, &content, &output),
        Commands::Edit { id, title, content } => {
            commands::note::edit(&repo, &id, title, content, &output)
        }
        Commands::Rm { ids } => commands::note::remove(&repo, &ids, &output),
        Commands::Show { id } => commands::note::show(&repo, &id, &output),
        Commands::List { filter, asc, pages } => {
            commands::list::list(&repo, &config, filter, asc, pages, &output).await
        }
        Commands::Sync { count } => {
            commands::sync::sync(&repo, count.unwrap_or(config.sync_count), &output).await
        }
        Commands::Status => commands::status::show(&repo, &config, &output),
        Commands::Config { .. } => Ok(()),
    }
}

/// Install a stderr subscriber when NOTEBATCH_LOG is set
fn init_logging() {
    let Ok(log_level) = std::env::var(LOG_ENV) else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "notebatch_core={},notebatch_cli={}",
        log_level, log_level
    ));

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
