// ABOUTME: Migrate command running the full AMXBans 5 to 6 migration
// ABOUTME: Confirms destructive intent, runs the migration, optionally writes a JSON report

use crate::config::MigrationConfig;
use crate::error::MigrateError;
use crate::migration::catalog;
use crate::mysql::MysqlCli;
use crate::runner::{MigrationReport, MigrationRunner, RunOptions};
use crate::utils;
use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::path::Path;

/// Run the migration from the source to the target database
///
/// Every migrated target table is truncated before it is reloaded, and ten
/// more tables are truncated without being reloaded. There is no rollback:
/// if a statement fails, the target keeps whatever state it reached. Enable
/// backups to keep a restorable dump of both databases.
///
/// # Arguments
///
/// * `config` - Validated migration configuration
/// * `options` - Backup and progress switches for this run
/// * `skip_confirmation` - Do not ask before truncating target tables
/// * `report_path` - Write the [`MigrationReport`] as JSON to this file
///
/// # Errors
///
/// Returns the first [`MigrateError`] of the run, wrapped in `anyhow`, or
/// [`MigrateError::Cancelled`] if the user declines the prompt.
///
/// # Examples
///
/// ```no_run
/// # use anyhow::Result;
/// # use amxbans_migrator::commands::migrate;
/// # use amxbans_migrator::config::MigrationConfig;
/// # use amxbans_migrator::runner::RunOptions;
/// # async fn example() -> Result<()> {
/// let config = MigrationConfig::load(None)?;
/// let options = RunOptions { backup: true, progress: true };
/// migrate(config, options, true, None).await?;
/// # Ok(())
/// # }
/// ```
pub async fn migrate(
    config: MigrationConfig,
    options: RunOptions,
    skip_confirmation: bool,
    report_path: Option<&Path>,
) -> Result<()> {
    utils::check_required_tools(&config.tools, options.backup)?;

    if !skip_confirmation && !confirm_migration(&config, options)? {
        return Err(MigrateError::Cancelled.into());
    }

    let client = MysqlCli::new(config.tools.clone());
    let runner = MigrationRunner::new(config, client, options);
    let report = runner.run().await?;

    if let Some(path) = report_path {
        write_report(&report, path)?;
        tracing::info!("✓ Report written to {}", path.display());
    }

    Ok(())
}

fn confirm_migration(config: &MigrationConfig, options: RunOptions) -> Result<bool> {
    println!();
    println!("Source: {}", config.source.describe());
    println!("Target: {}", config.target.describe());
    println!(
        "The following {} target tables will be emptied:",
        catalog::TRUNCATE_TABLES.len()
    );
    for base in catalog::TRUNCATE_TABLES {
        println!("  - {}", config.target.table(base));
    }
    if options.backup {
        println!(
            "Backups will be written to {}",
            config.backup.directory.display()
        );
    } else {
        println!("⚠ Backups are disabled; the current target data cannot be restored");
    }
    println!();

    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Proceed with migration?")
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

fn write_report(report: &MigrationReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::Inventory;
    use crate::runner::LoadedTable;

    #[test]
    fn test_write_report_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let report = MigrationReport {
            source_inventory: Inventory {
                counts: vec![("bans".to_string(), 12)],
            },
            loaded: vec![LoadedTable {
                label: "bans".to_string(),
                table: "amx_bans".to_string(),
                rows: 12,
            }],
            ..MigrationReport::default()
        };

        write_report(&report, &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["loaded"][0]["rows"], 12);
        assert_eq!(value["source_inventory"]["counts"][0][0], "bans");
        assert!(value["backups"].as_array().unwrap().is_empty());
    }
}
