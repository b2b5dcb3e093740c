// ABOUTME: Migration configuration loaded from TOML and environment variables
// ABOUTME: Describes source/target endpoints, backup, tool and load options

use crate::error::MigrateError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for every environment variable override
pub const ENV_PREFIX: &str = "AMXMIGRATE";

/// Complete configuration for one migration run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    /// Old (AMXBans 5.x) database
    #[serde(default)]
    pub source: Endpoint,
    /// New (AMXBans 6.x) database
    #[serde(default)]
    pub target: Endpoint,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub load: LoadOptions,
}

/// Connection parameters of one database plus its table prefix
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub database: String,
    pub prefix: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 3306,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            prefix: "amx".to_string(),
        }
    }
}

// Keep the password out of logs and panic messages.
impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl Endpoint {
    /// Prefixed table name, e.g. `amx_bans`
    pub fn table(&self, base: &str) -> String {
        format!("{}_{}", self.prefix, base)
    }

    /// Database-qualified, quoted table name, e.g. `` `amx5`.`amx_bans` ``
    pub fn qualified(&self, base: &str) -> String {
        format!("`{}`.`{}`", self.database, self.table(base))
    }

    /// `user@host:port/database`, without the password
    pub fn describe(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }

    /// Whether both endpoints point at the same server
    pub fn same_server(&self, other: &Endpoint) -> bool {
        self.host.eq_ignore_ascii_case(&other.host) && self.port == other.port
    }

    fn validate(&self, side: &str) -> Result<(), MigrateError> {
        if self.host.trim().is_empty() {
            return Err(MigrateError::Config(format!("{}.host is required", side)));
        }
        if self.port == 0 {
            return Err(MigrateError::Config(format!("{}.port cannot be 0", side)));
        }
        if self.user.trim().is_empty() {
            return Err(MigrateError::Config(format!("{}.user is required", side)));
        }
        if self.database.trim().is_empty() {
            return Err(MigrateError::Config(format!(
                "{}.database is required",
                side
            )));
        }
        if self.database.contains('`') || self.database.contains('\0') {
            return Err(MigrateError::Config(format!(
                "{}.database contains an invalid character: {}",
                side,
                crate::utils::sanitize_identifier(&self.database)
            )));
        }
        if !crate::utils::is_plain_identifier(&self.prefix) {
            return Err(MigrateError::Config(format!(
                "{}.prefix must be non-empty and use only letters, digits and '_', got '{}'",
                side,
                crate::utils::sanitize_identifier(&self.prefix)
            )));
        }
        Ok(())
    }

    fn apply_env<F>(&mut self, side: &str, lookup: &F) -> Result<(), MigrateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |field: &str| lookup(&format!("{}_{}_{}", ENV_PREFIX, side, field));

        if let Some(host) = var("HOST") {
            self.host = host;
        }
        if let Some(port) = var("PORT") {
            self.port = port.trim().parse().map_err(|_| {
                MigrateError::Config(format!(
                    "{}_{}_PORT is not a valid port: '{}'",
                    ENV_PREFIX, side, port
                ))
            })?;
        }
        if let Some(user) = var("USER") {
            self.user = user;
        }
        if let Some(password) = var("PASSWORD") {
            self.password = password;
        }
        if let Some(database) = var("DATABASE") {
            self.database = database;
        }
        if let Some(prefix) = var("PREFIX") {
            self.prefix = prefix;
        }
        Ok(())
    }
}

/// Pre/post migration dump settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackupConfig {
    pub enabled: bool,
    pub directory: PathBuf,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: PathBuf::from("backups"),
        }
    }
}

/// Names (or paths) of the external client binaries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    pub client: String,
    pub dump: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            client: "mysql".to_string(),
            dump: "mysqldump".to_string(),
        }
    }
}

/// Load phase behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadOptions {
    /// Send every INSERT of the load phase in one transaction
    pub single_transaction: bool,
}

impl MigrationConfig {
    /// Parse a TOML document without applying overrides or validation
    pub fn from_toml_str(contents: &str) -> Result<Self, MigrateError> {
        toml::from_str(contents).map_err(|e| MigrateError::Config(e.to_string()))
    }

    /// Load configuration from an optional TOML file plus the process environment
    ///
    /// Environment variables (`AMXMIGRATE_SOURCE_HOST`, `AMXMIGRATE_TARGET_PASSWORD`,
    /// `AMXMIGRATE_BACKUP_DIR`, ...) take precedence over file values. The result
    /// is validated before it is returned.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use amxbans_migrator::config::MigrationConfig;
    /// # use std::path::Path;
    /// let config = MigrationConfig::load(Some(Path::new("migrator.toml")))?;
    /// println!("target: {}", config.target.describe());
    /// # Ok::<(), amxbans_migrator::error::MigrateError>(())
    /// ```
    pub fn load(path: Option<&Path>) -> Result<Self, MigrateError> {
        let mut config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path).map_err(|e| {
                    MigrateError::Config(format!(
                        "cannot read config file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                tracing::debug!("Loaded configuration from {}", path.display());
                Self::from_toml_str(&contents)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from a key lookup (the process environment in production)
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), MigrateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.source.apply_env("SOURCE", &lookup)?;
        self.target.apply_env("TARGET", &lookup)?;

        if let Some(dir) = lookup(&format!("{}_BACKUP_DIR", ENV_PREFIX)) {
            self.backup.directory = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Check required fields and identifier safety
    pub fn validate(&self) -> Result<(), MigrateError> {
        self.source.validate("source")?;
        self.target.validate("target")?;

        if self.source.same_server(&self.target)
            && self.source.database == self.target.database
            && self.source.prefix == self.target.prefix
        {
            return Err(MigrateError::Config(
                "source and target resolve to the same tables; refusing to truncate the source"
                    .to_string(),
            ));
        }

        if self.tools.client.trim().is_empty() {
            return Err(MigrateError::Config("tools.client is required".to_string()));
        }
        if self.backup.enabled && self.tools.dump.trim().is_empty() {
            return Err(MigrateError::Config(
                "tools.dump is required when backups are enabled".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
        [source]
        host = "db.example.com"
        user = "amx"
        password = "secret"
        database = "amxbans5"

        [target]
        host = "db.example.com"
        port = 3307
        user = "amx"
        database = "amxbans6"
        prefix = "amx6"

        [backup]
        enabled = true
        directory = "/var/backups/amx"
    "#;

    #[test]
    fn test_parse_full_config() {
        let config = MigrationConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.source.port, 3306);
        assert_eq!(config.source.prefix, "amx");
        assert_eq!(config.target.port, 3307);
        assert_eq!(config.target.prefix, "amx6");
        assert!(config.backup.enabled);
        assert_eq!(config.backup.directory, PathBuf::from("/var/backups/amx"));
        assert_eq!(config.tools.client, "mysql");
        assert!(!config.load.single_transaction);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = MigrationConfig::from_toml_str("[source]\nhots = \"x\"\n");
        assert!(matches!(result, Err(MigrateError::Config(_))));
    }

    #[test]
    fn test_env_overrides_take_precedence() {
        let mut config = MigrationConfig::from_toml_str(SAMPLE).unwrap();
        let env: HashMap<&str, &str> = [
            ("AMXMIGRATE_TARGET_PASSWORD", "from-env"),
            ("AMXMIGRATE_SOURCE_PORT", "3310"),
            ("AMXMIGRATE_BACKUP_DIR", "/tmp/amx"),
        ]
        .into_iter()
        .collect();

        config
            .apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.target.password, "from-env");
        assert_eq!(config.source.port, 3310);
        assert_eq!(config.backup.directory, PathBuf::from("/tmp/amx"));
    }

    #[test]
    fn test_env_invalid_port() {
        let mut config = MigrationConfig::default();
        let result = config.apply_env_overrides(|key| {
            (key == "AMXMIGRATE_SOURCE_PORT").then(|| "not-a-port".to_string())
        });
        assert!(matches!(result, Err(MigrateError::Config(msg)) if msg.contains("PORT")));
    }

    #[test]
    fn test_config_entirely_from_env() {
        let env: HashMap<&str, &str> = [
            ("AMXMIGRATE_SOURCE_HOST", "localhost"),
            ("AMXMIGRATE_SOURCE_USER", "root"),
            ("AMXMIGRATE_SOURCE_DATABASE", "old"),
            ("AMXMIGRATE_TARGET_HOST", "localhost"),
            ("AMXMIGRATE_TARGET_USER", "root"),
            ("AMXMIGRATE_TARGET_DATABASE", "new"),
        ]
        .into_iter()
        .collect();

        let mut config = MigrationConfig::default();
        config
            .apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_fields() {
        let mut config = MigrationConfig::from_toml_str(SAMPLE).unwrap();
        config.target.database = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("target.database"));

        let mut config = MigrationConfig::from_toml_str(SAMPLE).unwrap();
        config.source.host = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("source.host"));
    }

    #[test]
    fn test_validate_rejects_unsafe_identifiers() {
        let mut config = MigrationConfig::from_toml_str(SAMPLE).unwrap();
        config.source.prefix = "amx; DROP TABLE x".to_string();
        assert!(config.validate().is_err());

        let mut config = MigrationConfig::from_toml_str(SAMPLE).unwrap();
        config.target.database = "amx`6".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_identical_source_and_target() {
        let mut config = MigrationConfig::from_toml_str(SAMPLE).unwrap();
        config.target = config.source.clone();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("same tables"));
    }

    #[test]
    fn test_endpoint_naming() {
        let config = MigrationConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.source.table("bans"), "amx_bans");
        assert_eq!(config.source.qualified("bans"), "`amxbans5`.`amx_bans`");
        assert_eq!(config.target.describe(), "amx@db.example.com:3307/amxbans6");
        assert!(!format!("{:?}", config.source).contains("secret"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("migrator.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = MigrationConfig::load(Some(&path)).unwrap();
        assert_eq!(config.source.database, "amxbans5");

        let missing = MigrationConfig::load(Some(&dir.path().join("nope.toml")));
        assert!(matches!(missing, Err(MigrateError::Config(_))));
    }
}
