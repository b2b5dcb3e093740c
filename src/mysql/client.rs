// ABOUTME: Database client seam and its mysql/mysqldump subprocess implementation
// ABOUTME: Every query or dump is one blocking client invocation awaited to completion

use super::options_file::ClientOptionsFile;
use crate::config::{Endpoint, ToolsConfig};
use crate::error::ClientError;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Executes SQL text and full dumps against a database endpoint
///
/// Each call is independent: no session state survives between calls, so
/// callers that need a session setting must include it in the SQL they send.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Run `sql` against the endpoint's database and return its stdout
    /// (tab-separated rows, no column headers)
    async fn query(&self, endpoint: &Endpoint, sql: &str) -> Result<String, ClientError>;

    /// Write a full logical dump of the endpoint's database to `output`
    async fn dump(&self, endpoint: &Endpoint, output: &Path) -> Result<(), ClientError>;
}

/// [`DatabaseClient`] backed by the `mysql` and `mysqldump` binaries
#[derive(Debug, Clone, Default)]
pub struct MysqlCli {
    tools: ToolsConfig,
}

impl MysqlCli {
    pub fn new(tools: ToolsConfig) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl DatabaseClient for MysqlCli {
    async fn query(&self, endpoint: &Endpoint, sql: &str) -> Result<String, ClientError> {
        let program = &self.tools.client;
        let options = ClientOptionsFile::new(endpoint)?;

        tracing::debug!("{} <- {}", endpoint.describe(), sql);

        let mut child = Command::new(program)
            .arg(options.arg())
            .arg("--batch")
            .arg("--skip-column-names")
            .arg(&endpoint.database)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ClientError::Spawn {
                program: program.clone(),
                source,
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClientError::Output("client stdin is not available".to_string()))?;
        let input = sql.as_bytes().to_vec();
        let writer = tokio::spawn(async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        });

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(ClientError::Failed {
                program: program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        writer.await.map_err(std::io::Error::other)??;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn dump(&self, endpoint: &Endpoint, output_path: &Path) -> Result<(), ClientError> {
        let program = &self.tools.dump;
        let options = ClientOptionsFile::new(endpoint)?;
        let file = std::fs::File::create(output_path)?;

        tracing::debug!(
            "Dumping {} to {}",
            endpoint.describe(),
            output_path.display()
        );

        // stdout goes straight to the file; only stderr is captured
        let child = Command::new(program)
            .arg(options.arg())
            .arg("--single-transaction")
            .arg("--routines")
            .arg("--triggers")
            .arg(&endpoint.database)
            .stdin(Stdio::null())
            .stdout(file)
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ClientError::Spawn {
                program: program.clone(),
                source,
            })?;
        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(ClientError::Failed {
                program: program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if std::fs::metadata(output_path)?.len() == 0 {
            return Err(ClientError::EmptyDump {
                path: output_path.to_path_buf(),
            });
        }

        Ok(())
    }
}

/// Parse the single-value output of a `SELECT COUNT(*)` query
pub fn parse_count(stdout: &str) -> Result<u64, ClientError> {
    let value = stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .ok_or_else(|| ClientError::Output("empty result for row count".to_string()))?;

    value
        .parse()
        .map_err(|_| ClientError::Output(format!("expected a row count, got '{}'", value)))
}

/// Parse `is_null<TAB>value<TAB>count` rows as produced by a `GROUP BY` query
///
/// The NULL flag column keeps a stored `'NULL'` string apart from SQL NULL.
/// Values are unescaped from the client's batch encoding.
pub fn parse_value_counts(stdout: &str) -> Result<Vec<(Option<String>, u64)>, ClientError> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let malformed = || ClientError::Output(format!("malformed row: '{}'", line));
            let fields: Vec<&str> = line.split('\t').collect();
            let [is_null, value, count] = fields.as_slice() else {
                return Err(malformed());
            };
            let count = count.trim().parse().map_err(|_| malformed())?;
            let value = match is_null.trim() {
                "1" => None,
                "0" => Some(unescape_batch_field(value)),
                _ => return Err(malformed()),
            };
            Ok((value, count))
        })
        .collect()
}

/// Undo the `--batch` escaping of tab, newline, NUL and backslash
fn unescape_batch_field(field: &str) -> String {
    let mut value = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => value.push('\t'),
            Some('n') => value.push('\n'),
            Some('0') => value.push('\0'),
            Some(other) => value.push(other),
            None => value.push('\\'),
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint {
            host: "127.0.0.1".to_string(),
            user: "root".to_string(),
            database: "amxbans".to_string(),
            ..Endpoint::default()
        }
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("42\n").unwrap(), 42);
        assert_eq!(parse_count("  7  ").unwrap(), 7);
        assert_eq!(parse_count("\n0\n\n").unwrap(), 0);
        assert!(parse_count("").is_err());
        assert!(parse_count("abc").is_err());
    }

    #[test]
    fn test_parse_value_counts() {
        let rows =
            parse_value_counts("0\t0\t12\n0\t30\t4\n1\tNULL\t2\n0\tpermanent\t1\n").unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], (Some("0".to_string()), 12));
        assert_eq!(rows[2], (None, 2));

        let empty_value = parse_value_counts("0\t\t3\n").unwrap();
        assert_eq!(empty_value, vec![(Some(String::new()), 3)]);

        assert!(parse_value_counts("no-tab-here\n").is_err());
        assert!(parse_value_counts("30\t4\n").is_err());
        assert!(parse_value_counts("x\t30\t4\n").is_err());
    }

    #[test]
    fn test_stored_null_string_is_not_sql_null() {
        let rows = parse_value_counts("0\tNULL\t5\n1\tNULL\t2\n").unwrap();
        assert_eq!(rows, vec![(Some("NULL".to_string()), 5), (None, 2)]);
    }

    #[test]
    fn test_batch_escapes_are_undone() {
        let rows = parse_value_counts("0\t\\t30\t1\n0\t30\\n\t2\n0\ta\\\\b\t3\n").unwrap();
        assert_eq!(rows[0], (Some("\t30".to_string()), 1));
        assert_eq!(rows[1], (Some("30\n".to_string()), 2));
        assert_eq!(rows[2], (Some("a\\b".to_string()), 3));
    }

    #[tokio::test]
    async fn test_query_with_missing_binary_fails_to_spawn() {
        let client = MysqlCli::new(ToolsConfig {
            client: "definitely-not-a-mysql-client-binary".to_string(),
            dump: "mysqldump".to_string(),
        });

        let result = client.query(&endpoint(), "SELECT 1").await;
        assert!(matches!(result, Err(ClientError::Spawn { .. })));
    }

    #[tokio::test]
    #[ignore]
    async fn test_query_against_real_server() {
        let mut endpoint = endpoint();
        endpoint.host = std::env::var("AMXMIGRATE_TARGET_HOST").unwrap();
        endpoint.user = std::env::var("AMXMIGRATE_TARGET_USER").unwrap();
        endpoint.password = std::env::var("AMXMIGRATE_TARGET_PASSWORD").unwrap_or_default();
        endpoint.database = std::env::var("AMXMIGRATE_TARGET_DATABASE").unwrap();

        let output = MysqlCli::default().query(&endpoint, "SELECT 1").await.unwrap();
        assert_eq!(parse_count(&output).unwrap(), 1);
    }
}
