// ABOUTME: Utility functions for tool discovery and identifier handling
// ABOUTME: Provides client tool checks, identifier validation, and byte formatting

use crate::config::ToolsConfig;
use crate::error::MigrateError;
use which::which;

/// Check that the required MySQL client tools are available
///
/// Verifies that the configured client (`mysql` by default) is installed and
/// in PATH, and, when `need_dump` is set, the dump utility (`mysqldump` by
/// default) as well.
///
/// # Arguments
///
/// * `tools` - Configured client binary names or paths
/// * `need_dump` - Whether backups are enabled for this run
///
/// # Errors
///
/// Returns [`MigrateError::MissingTools`] listing every tool that was not found.
///
/// # Examples
///
/// ```no_run
/// # use amxbans_migrator::config::ToolsConfig;
/// # use amxbans_migrator::utils::check_required_tools;
/// check_required_tools(&ToolsConfig::default(), true)?;
/// # Ok::<(), amxbans_migrator::error::MigrateError>(())
/// ```
pub fn check_required_tools(tools: &ToolsConfig, need_dump: bool) -> Result<(), MigrateError> {
    let mut required = vec![tools.client.as_str()];
    if need_dump {
        required.push(tools.dump.as_str());
    }

    let missing: Vec<String> = required
        .into_iter()
        .filter(|tool| which(tool).is_err())
        .map(str::to_string)
        .collect();

    if !missing.is_empty() {
        tracing::error!("Missing MySQL client tools: {}", missing.join(", "));
        tracing::error!("Please install the MySQL or MariaDB client tools:");
        tracing::error!("  - Ubuntu/Debian: sudo apt-get install default-mysql-client");
        tracing::error!("  - macOS: brew install mysql-client");
        tracing::error!("  - RHEL/CentOS: sudo yum install mysql");
        return Err(MigrateError::MissingTools(missing));
    }

    Ok(())
}

/// Whether `identifier` is non-empty and made only of ASCII letters, digits and `_`
///
/// Table prefixes are spliced into SQL text, so they are restricted to this set.
///
/// # Examples
///
/// ```
/// # use amxbans_migrator::utils::is_plain_identifier;
/// assert!(is_plain_identifier("amx"));
/// assert!(is_plain_identifier("amx_6"));
/// assert!(!is_plain_identifier(""));
/// assert!(!is_plain_identifier("amx`; --"));
/// ```
pub fn is_plain_identifier(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Sanitize an identifier (table name, database name, etc.) for display
///
/// Removes control characters and limits length to prevent log injection
/// and keep error messages readable.
///
/// # Examples
///
/// ```
/// # use amxbans_migrator::utils::sanitize_identifier;
/// assert_eq!(sanitize_identifier("amx_bans"), "amx_bans");
/// assert_eq!(sanitize_identifier("amx\x00bans"), "amxbans");
/// assert_eq!(sanitize_identifier("amx\nbans"), "amxbans");
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}

/// Format bytes into human-readable string
///
/// # Examples
///
/// ```
/// # use amxbans_migrator::utils::format_bytes;
/// assert_eq!(format_bytes(1024), "1.0 KB");
/// assert_eq!(format_bytes(1536), "1.5 KB");
/// assert_eq!(format_bytes(1073741824), "1.0 GB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{:.1} {}", size, UNITS[unit_idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_required_tools_reports_missing() {
        let tools = ToolsConfig {
            client: "definitely-not-a-mysql-client-binary".to_string(),
            dump: "definitely-not-a-dump-binary".to_string(),
        };

        match check_required_tools(&tools, true) {
            Err(MigrateError::MissingTools(missing)) => {
                assert_eq!(missing.len(), 2);
                assert_eq!(missing[0], "definitely-not-a-mysql-client-binary");
            }
            other => panic!("expected MissingTools, got {:?}", other),
        }

        match check_required_tools(&tools, false) {
            Err(MigrateError::MissingTools(missing)) => assert_eq!(missing.len(), 1),
            other => panic!("expected MissingTools, got {:?}", other),
        }
    }

    #[test]
    fn test_is_plain_identifier() {
        assert!(is_plain_identifier("amx"));
        assert!(is_plain_identifier("AMX_bans2"));
        assert!(!is_plain_identifier(""));
        assert!(!is_plain_identifier("amx-bans"));
        assert!(!is_plain_identifier("amx bans"));
        assert!(!is_plain_identifier("amx`"));
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("normal_table"), "normal_table");
        assert_eq!(sanitize_identifier("table\x00name"), "tablename");

        let long_name = "a".repeat(200);
        assert_eq!(sanitize_identifier(&long_name).len(), 100);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.0 B");
        assert_eq!(format_bytes(500), "500.0 B");
        assert_eq!(format_bytes(1048576), "1.0 MB");
        assert_eq!(format_bytes(1099511627776), "1.0 TB");
    }
}
