// ABOUTME: CLI entry point for amxbans-migrator
// ABOUTME: Parses commands, loads configuration, and maps failures to exit codes

use amxbans_migrator::commands;
use amxbans_migrator::config::MigrationConfig;
use amxbans_migrator::error::MigrateError;
use amxbans_migrator::runner::RunOptions;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "amxbans-migrator")]
#[command(about = "One-shot AMXBans 5.x to 6.x database migration", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file (AMXMIGRATE_* variables override it)
    #[arg(long, global = true, env = "AMXMIGRATE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check tools and connectivity, and count the source rows (read-only)
    Check,
    /// Truncate the target tables and load them from the source
    Migrate {
        /// Take full dumps of both databases before and of the target after
        #[arg(long)]
        backup: bool,
        /// Directory for backup files (created if absent)
        #[arg(long)]
        backup_dir: Option<PathBuf>,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
        /// Write a JSON report of the run to this file
        #[arg(long)]
        report: Option<PathBuf>,
        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },
    /// Print the SQL the migration would send to the target, without connecting
    Plan,
}

#[tokio::main]
async fn main() {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        tracing::error!("✗ {:#}", err);
        let code = err
            .downcast_ref::<MigrateError>()
            .map_or(1, MigrateError::exit_code);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = MigrationConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Check => commands::check(config).await,
        Commands::Migrate {
            backup,
            backup_dir,
            yes,
            report,
            no_progress,
        } => {
            if backup {
                config.backup.enabled = true;
            }
            if let Some(dir) = backup_dir {
                config.backup.directory = dir;
            }
            config.validate()?;

            let options = RunOptions {
                backup: config.backup.enabled,
                progress: !no_progress,
            };
            commands::migrate(config, options, yes, report.as_deref()).await
        }
        Commands::Plan => commands::plan(config),
    }
}
