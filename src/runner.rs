// ABOUTME: Migration runner sequencing probes, backups, truncation, loads and reports
// ABOUTME: Fail-fast: the first failing client invocation ends the run without rollback

use crate::config::{Endpoint, MigrationConfig};
use crate::error::MigrateError;
use crate::migration::{
    self, backup, catalog, inventory, BackupArtifact, BackupLabel, DurationAudit, Inventory,
    LoadMode, TableComparison, TableTransform,
};
use crate::mysql::DatabaseClient;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

/// Probe sent to both endpoints before anything else
pub const CONNECTIVITY_PROBE: &str = "SELECT 1";

pub const DISABLE_FOREIGN_KEYS: &str = "SET FOREIGN_KEY_CHECKS = 0";
pub const ENABLE_FOREIGN_KEYS: &str = "SET FOREIGN_KEY_CHECKS = 1";

/// Per-run switches that are not part of the stored configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Take source/target dumps before and a target dump after the load
    pub backup: bool,
    /// Show a progress bar during the load phase
    pub progress: bool,
}

/// Rows present in one target table right after its load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedTable {
    pub label: String,
    pub table: String,
    pub rows: u64,
}

/// Everything observed during a successful run
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    pub source_inventory: Inventory,
    pub duration_audit: DurationAudit,
    pub loaded: Vec<LoadedTable>,
    pub target_inventory: Inventory,
    pub comparison: Vec<TableComparison>,
    pub backups: Vec<BackupArtifact>,
}

/// Drives one AMXBans migration against a [`DatabaseClient`]
pub struct MigrationRunner<C: DatabaseClient> {
    config: MigrationConfig,
    client: C,
    options: RunOptions,
    transforms: Vec<TableTransform>,
}

impl<C: DatabaseClient> MigrationRunner<C> {
    pub fn new(config: MigrationConfig, client: C, options: RunOptions) -> Self {
        Self {
            config,
            client,
            options,
            transforms: catalog::transforms(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    fn source(&self) -> &Endpoint {
        &self.config.source
    }

    fn target(&self) -> &Endpoint {
        &self.config.target
    }

    /// Probe the source, then the target
    ///
    /// Nothing else is sent to either database until both probes succeed.
    pub async fn check_connectivity(&self) -> Result<(), MigrateError> {
        for (side, endpoint) in [("source", self.source()), ("target", self.target())] {
            tracing::info!("Connecting to {} database {}...", side, endpoint.describe());
            self.client
                .query(endpoint, CONNECTIVITY_PROBE)
                .await
                .map_err(|source| MigrateError::Connectivity {
                    side,
                    endpoint: endpoint.describe(),
                    source,
                })?;
            tracing::info!("✓ Connected to {}", side);
        }

        if !self.source().same_server(self.target()) {
            tracing::warn!(
                "⚠ Source and target are on different servers; the load reads `{}` through the target server",
                self.source().database
            );
        }
        Ok(())
    }

    /// Read-only inventory of the source tables plus the ban duration audit
    pub async fn inspect_source(&self) -> Result<(Inventory, DurationAudit), MigrateError> {
        tracing::info!("Counting source rows...");
        let counts = Inventory::collect(&self.client, self.source(), catalog::INVENTORY_TABLES)
            .await
            .map_err(|e| MigrateError::statement("source inventory", e))?;

        let audit = inventory::audit_ban_lengths(&self.client, self.source(), catalog::BANS_TABLE)
            .await
            .map_err(|e| MigrateError::statement("ban duration audit", e))?;
        audit.log();

        Ok((counts, audit))
    }

    /// Execute the full migration
    ///
    /// Order: connectivity, source inventory, optional pre-backups, disable
    /// foreign keys, truncate, load, enable foreign keys, target inventory,
    /// optional post-backup. The first failure is returned as-is; tables
    /// already truncated or loaded stay that way.
    pub async fn run(&self) -> Result<MigrationReport, MigrateError> {
        tracing::info!("Starting AMXBans migration...");
        let mut report = MigrationReport::default();

        tracing::info!("Step 1/9: Checking connectivity...");
        self.check_connectivity().await?;

        tracing::info!("Step 2/9: Taking pre-migration inventory...");
        let (source_inventory, audit) = self.inspect_source().await?;
        report.source_inventory = source_inventory;
        report.duration_audit = audit;

        if self.options.backup {
            tracing::info!("Step 3/9: Backing up source and target...");
            report
                .backups
                .push(self.backup(self.source(), BackupLabel::SourceBefore).await?);
            report
                .backups
                .push(self.backup(self.target(), BackupLabel::TargetBefore).await?);
        } else {
            tracing::info!("Step 3/9: Backups disabled, skipping");
        }

        tracing::info!("Step 4/9: Disabling foreign key checks on target...");
        self.execute("disable foreign key checks", DISABLE_FOREIGN_KEYS)
            .await?;

        tracing::info!(
            "Step 5/9: Truncating {} target tables...",
            catalog::TRUNCATE_TABLES.len()
        );
        for base in catalog::TRUNCATE_TABLES {
            let sql = without_foreign_keys(&self.truncate_sql(base));
            self.execute(&format!("truncate {}", self.target().table(base)), &sql)
                .await?;
            tracing::debug!("  Truncated {}", self.target().table(base));
        }
        tracing::info!("✓ Target tables cleared");

        tracing::info!("Step 6/9: Loading {} tables...", self.transforms.len());
        report.loaded = if self.config.load.single_transaction {
            self.load_in_transaction().await?
        } else {
            self.load_each().await?
        };

        tracing::info!("Step 7/9: Re-enabling foreign key checks on target...");
        self.execute("enable foreign key checks", ENABLE_FOREIGN_KEYS)
            .await?;

        tracing::info!("Step 8/9: Taking post-migration inventory...");
        report.target_inventory =
            Inventory::collect(&self.client, self.target(), catalog::INVENTORY_TABLES)
                .await
                .map_err(|e| MigrateError::statement("target inventory", e))?;
        report.comparison = migration::compare(&report.source_inventory, &report.target_inventory);
        inventory::print_comparison(&report.comparison);

        if self.options.backup {
            tracing::info!("Step 9/9: Backing up migrated target...");
            report
                .backups
                .push(self.backup(self.target(), BackupLabel::TargetAfter).await?);
            backup::print_summary(&report.backups);
        } else {
            tracing::info!("Step 9/9: Backups disabled, skipping");
        }

        tracing::info!("✅ Migration complete");
        Ok(report)
    }

    /// Every statement the run sends to the target during steps 4 to 7
    pub fn plan(&self) -> Vec<String> {
        let mut statements = vec![DISABLE_FOREIGN_KEYS.to_string()];
        statements.extend(
            catalog::TRUNCATE_TABLES
                .iter()
                .map(|base| without_foreign_keys(&self.truncate_sql(base))),
        );
        if self.config.load.single_transaction {
            statements.push(self.transaction_batch());
        } else {
            statements.extend(
                self.transforms
                    .iter()
                    .map(|t| without_foreign_keys(&t.insert_sql(self.source(), self.target()))),
            );
        }
        statements.push(ENABLE_FOREIGN_KEYS.to_string());
        statements
    }

    fn truncate_sql(&self, base: &str) -> String {
        format!("TRUNCATE TABLE {}", self.target().qualified(base))
    }

    fn transaction_batch(&self) -> String {
        let mut batch = format!("{};\nSTART TRANSACTION;\n", DISABLE_FOREIGN_KEYS);
        for transform in &self.transforms {
            batch.push_str(&transform.insert_sql(self.source(), self.target()));
            batch.push_str(";\n");
        }
        batch.push_str("COMMIT;");
        batch
    }

    async fn execute(&self, step: &str, sql: &str) -> Result<(), MigrateError> {
        self.client
            .query(self.target(), sql)
            .await
            .map(|_| ())
            .map_err(|e| MigrateError::statement(step, e))
    }

    async fn backup(
        &self,
        endpoint: &Endpoint,
        label: BackupLabel,
    ) -> Result<BackupArtifact, MigrateError> {
        backup::take_backup(&self.client, endpoint, &self.config.backup.directory, label)
            .await
            .map_err(|source| {
                tracing::error!("✗ Backup {} failed", label);
                MigrateError::Backup {
                    label: label.to_string(),
                    source,
                }
            })
    }

    async fn load_each(&self) -> Result<Vec<LoadedTable>, MigrateError> {
        let progress = self.progress_bar();
        let mut loaded = Vec::with_capacity(self.transforms.len());

        for transform in &self.transforms {
            progress.set_message(transform.label);
            let sql = without_foreign_keys(&transform.insert_sql(self.source(), self.target()));
            self.execute(&format!("load {}", transform.label), &sql)
                .await?;
            loaded.push(self.read_back(transform).await?);
            progress.inc(1);
        }

        progress.finish_and_clear();
        Ok(loaded)
    }

    async fn load_in_transaction(&self) -> Result<Vec<LoadedTable>, MigrateError> {
        tracing::info!("Loading all tables in a single transaction...");
        self.execute("transactional load", &self.transaction_batch())
            .await?;

        let mut loaded = Vec::with_capacity(self.transforms.len());
        for transform in &self.transforms {
            loaded.push(self.read_back(transform).await?);
        }
        Ok(loaded)
    }

    async fn read_back(&self, transform: &TableTransform) -> Result<LoadedTable, MigrateError> {
        let table = self.target().table(transform.target);
        let rows = migration::count_rows(&self.client, self.target(), transform.target)
            .await
            .map_err(|e| MigrateError::statement(format!("count {}", table), e))?;

        match transform.mode {
            LoadMode::Replace => tracing::info!("  ✓ {:<16} {:>8} row(s)", transform.label, rows),
            LoadMode::InsertIfAbsent => tracing::info!(
                "  ✓ {:<16} {:>8} row(s) (kept existing row if present)",
                transform.label,
                rows
            ),
        }

        Ok(LoadedTable {
            label: transform.label.to_string(),
            table,
            rows,
        })
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.options.progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new(self.transforms.len() as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        {
            progress.set_style(style.progress_chars("##-"));
        }
        progress
    }
}

/// Prefix a statement with the session setting that disables FK checks
///
/// Every client invocation is a fresh session, so the setting has to travel
/// with each statement sent between steps 4 and 7.
pub fn without_foreign_keys(sql: &str) -> String {
    format!("{};\n{};", DISABLE_FOREIGN_KEYS, sql)
}
