// ABOUTME: Read-only pre-flight command for migration readiness
// ABOUTME: Checks client tools, connectivity, source row counts and ban durations

use crate::config::MigrationConfig;
use crate::mysql::MysqlCli;
use crate::runner::{MigrationRunner, RunOptions};
use crate::utils;
use anyhow::Result;

/// Verify both databases are reachable and summarise what would be migrated
///
/// Performs the first two steps of a migration without touching the target:
/// 1. Checks that the MySQL client (and dump tool when backups are enabled) is installed
/// 2. Probes source and target connectivity
/// 3. Counts source admin, web admin, ban and reason rows
/// 4. Reports ban durations that cannot be read and would become permanent
///
/// # Errors
///
/// This function will return an error if:
/// - A required client tool is missing
/// - Either database cannot be reached
/// - A source table is missing or cannot be counted
///
/// # Examples
///
/// ```no_run
/// # use anyhow::Result;
/// # use amxbans_migrator::commands::check;
/// # use amxbans_migrator::config::MigrationConfig;
/// # async fn example() -> Result<()> {
/// let config = MigrationConfig::load(None)?;
/// check(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn check(config: MigrationConfig) -> Result<()> {
    tracing::info!("Starting pre-flight check...");

    utils::check_required_tools(&config.tools, config.backup.enabled)?;
    tracing::info!("✓ MySQL client tools found");

    let client = MysqlCli::new(config.tools.clone());
    let runner = MigrationRunner::new(config, client, RunOptions::default());

    runner.check_connectivity().await?;
    let (inventory, audit) = runner.inspect_source().await?;

    tracing::info!("");
    tracing::info!("========================================");
    tracing::info!("Pre-flight Summary");
    tracing::info!("========================================");
    for (table, count) in &inventory.counts {
        tracing::info!("{:<20} {:>8}", table, count);
    }
    tracing::info!("========================================");

    if audit.unparsed > 0 {
        tracing::warn!(
            "⚠ {} ban(s) will be migrated as permanent because their duration is unreadable",
            audit.unparsed
        );
    }
    if audit.out_of_range > 0 {
        tracing::warn!(
            "⚠ {} ban(s) have a duration too large for the target; migrate will fail on the bans table",
            audit.out_of_range
        );
    }

    tracing::info!("✅ Check complete - ready for migration");
    Ok(())
}
