//! SketchStore CLI
//!
//! Command-line interface for SketchStore - inspect and maintain the
//! drawing app's local storage.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use sketchstore_core::{Config, MigrationOutcome, MigrationService, StorageManager};

mod commands;
mod output;
mod prompt;

use output::{Output, OutputFormat};

/// Environment variable holding the log level
const LOG_ENV: &str = "SKETCHSTORE_LOG";

#[derive(Parser)]
#[command(name = "sketchstore")]
#[command(about = "SketchStore - Namespaced local storage for drawings")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show backend, usage and queue state
    Status,
    /// Manage files
    File {
        #[command(subcommand)]
        command: FileCommands,
    },
    /// Read or write settings
    Setting {
        #[command(subcommand)]
        command: SettingCommands,
    },
    /// Read or write cached resources
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Inspect and replay the offline queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Export every namespace as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Merge an exported snapshot into storage
    Import {
        /// Snapshot file produced by `export`
        file: PathBuf,
    },
    /// Delete all stored data
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Migrate the legacy storage layout
    Migrate,
    /// Remove legacy data after migration
    Cleanup,
    /// Restore files to the legacy layout
    Rollback,
    /// Show configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum FileCommands {
    /// List all files, newest first
    #[command(alias = "ls")]
    List,
    /// Show file details
    Show {
        /// File name
        name: String,
    },
    /// Delete a file
    #[command(alias = "rm")]
    Delete {
        /// File name
        name: String,
    },
}

#[derive(Subcommand)]
enum SettingCommands {
    /// Print a setting
    Get {
        /// Setting key
        key: String,
    },
    /// Store a setting (JSON, or a plain string)
    Set {
        /// Setting key
        key: String,
        /// Setting value
        value: String,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Print a cached resource if it is still fresh
    Get {
        /// Resource URL
        url: String,
    },
    /// Cache a resource for 24 hours
    Put {
        /// Resource URL
        url: String,
        /// Resource data (JSON, or a plain string)
        data: String,
    },
}

#[derive(Subcommand)]
enum QueueCommands {
    /// List pending operations
    #[command(alias = "ls")]
    List,
    /// Replay pending operations
    Replay,
    /// Remove a pending operation
    #[command(alias = "rm")]
    Remove {
        /// Queue entry ID
        id: String,
    },
    /// Drop every pending operation
    Clear,
    /// List operations that exceeded the retry limit
    DeadLetters,
    /// Move a dead letter back into the queue
    Requeue {
        /// Queue entry ID
        id: String,
    },
    /// Drop a dead letter
    Discard {
        /// Queue entry ID
        id: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let result = run(cli, &output).await;
    if let Err(e) = &result {
        if let Some(hint) = output::recovery_hint(e) {
            eprintln!("Hint: {}", hint);
        }
    }
    result
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    // Commands that don't need the storage manager
    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => {
                commands::config::show(cli.config.as_ref(), output)
            }
        };
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    let manager = StorageManager::open(config)
        .await
        .context("Failed to open storage")?;

    // Migration commands manage the flag themselves
    let manages_migration = matches!(
        &cli.command,
        Commands::Migrate | Commands::Rollback | Commands::Cleanup
    );
    if !manages_migration {
        auto_migrate(&manager, output).await;
    }

    match cli.command {
        Commands::Status => commands::status::show(&manager, output).await,
        Commands::File { command } => handle_file_command(command, &manager, output).await,
        Commands::Setting { command } => handle_setting_command(command, &manager, output).await,
        Commands::Cache { command } => handle_cache_command(command, &manager, output).await,
        Commands::Queue { command } => handle_queue_command(command, &manager, output).await,
        Commands::Export { output: path } => commands::data::export(&manager, path, output).await,
        Commands::Import { file } => commands::data::import(&manager, file, output).await,
        Commands::Clear { yes } => commands::data::clear(&manager, yes, output).await,
        Commands::Migrate => commands::migrate::migrate(&manager, output).await,
        Commands::Cleanup => commands::migrate::cleanup(&manager, output).await,
        Commands::Rollback => commands::migrate::rollback(&manager, output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

async fn handle_file_command(
    command: FileCommands,
    manager: &StorageManager,
    output: &Output,
) -> Result<()> {
    match command {
        FileCommands::List => commands::file::list(manager, output).await,
        FileCommands::Show { name } => commands::file::show(manager, name, output).await,
        FileCommands::Delete { name } => commands::file::delete(manager, name, output).await,
    }
}

async fn handle_setting_command(
    command: SettingCommands,
    manager: &StorageManager,
    output: &Output,
) -> Result<()> {
    match command {
        SettingCommands::Get { key } => commands::setting::get(manager, key, output).await,
        SettingCommands::Set { key, value } => {
            commands::setting::set(manager, key, value, output).await
        }
    }
}

async fn handle_cache_command(
    command: CacheCommands,
    manager: &StorageManager,
    output: &Output,
) -> Result<()> {
    match command {
        CacheCommands::Get { url } => commands::cache::get(manager, url, output).await,
        CacheCommands::Put { url, data } => commands::cache::put(manager, url, data, output).await,
    }
}

async fn handle_queue_command(
    command: QueueCommands,
    manager: &StorageManager,
    output: &Output,
) -> Result<()> {
    match command {
        QueueCommands::List => commands::queue::list(manager, output).await,
        QueueCommands::Replay => commands::queue::replay(manager, output).await,
        QueueCommands::Remove { id } => commands::queue::remove(manager, id, output).await,
        QueueCommands::Clear => commands::queue::clear(manager, output).await,
        QueueCommands::DeadLetters => commands::queue::dead_letters(manager, output).await,
        QueueCommands::Requeue { id } => commands::queue::requeue(manager, id, output).await,
        QueueCommands::Discard { id } => commands::queue::discard(manager, id, output).await,
    }
}

/// Run the one-time legacy migration, silently handles errors
async fn auto_migrate(manager: &StorageManager, output: &Output) {
    match MigrationService::new(manager).check_and_migrate().await {
        Ok(MigrationOutcome::LegacyUnavailable) if !output.is_quiet() => {
            eprintln!("⚠ Legacy data could not be read; migration postponed");
        }
        Ok(_) => {}
        Err(e) => {
            warn!("Automatic migration failed: {}", e);
            if !output.is_quiet() {
                eprintln!("⚠ Automatic migration failed: {}", e);
                if let Some(hint) = e.recovery_suggestion() {
                    eprintln!("Hint: {}", hint);
                }
            }
        }
    }
}

/// Initialize stderr logging from SKETCHSTORE_LOG (default: warn)
fn init_logging() {
    let level = std::env::var(LOG_ENV).unwrap_or_else(|_| "warn".to_string());
    let env_filter = EnvFilter::new(format!(
        "sketchstore_core={},sketchstore_cli={}",
        level, level
    ));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
