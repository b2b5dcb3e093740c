// ABOUTME: Plan command printing the SQL a migration would send to the target
// ABOUTME: Touches no database; useful for review before a destructive run

use crate::config::MigrationConfig;
use crate::mysql::MysqlCli;
use crate::runner::{MigrationRunner, RunOptions};
use anyhow::Result;

/// Print every target statement of the load phase, in execution order
pub fn plan(config: MigrationConfig) -> Result<()> {
    tracing::info!(
        "Migration plan: {} -> {}",
        config.source.describe(),
        config.target.describe()
    );

    let client = MysqlCli::new(config.tools.clone());
    let runner = MigrationRunner::new(config, client, RunOptions::default());

    for statement in runner.plan() {
        if statement.ends_with(';') {
            println!("{}", statement);
        } else {
            println!("{};", statement);
        }
    }

    Ok(())
}
