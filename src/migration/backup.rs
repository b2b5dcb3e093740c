// ABOUTME: Timestamped full logical backups taken around the migration
// ABOUTME: Dumps to a dedicated directory and records size and checksum of each file

use crate::config::Endpoint;
use crate::error::ClientError;
use crate::mysql::DatabaseClient;
use crate::utils::format_bytes;
use chrono::{DateTime, Local};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Which database a dump captures and when
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupLabel {
    SourceBefore,
    TargetBefore,
    TargetAfter,
}

impl BackupLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupLabel::SourceBefore => "source_before",
            BackupLabel::TargetBefore => "target_before",
            BackupLabel::TargetAfter => "target_after",
        }
    }
}

impl std::fmt::Display for BackupLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed dump file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupArtifact {
    pub label: BackupLabel,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub sha256: String,
}

/// `{dir}/{label}_{database}_{YYYYmmdd_HHMMSS}.sql`
pub fn backup_path(
    dir: &Path,
    label: BackupLabel,
    database: &str,
    at: DateTime<Local>,
) -> PathBuf {
    let database = crate::utils::sanitize_identifier(database).replace(['/', '\\'], "_");
    dir.join(format!(
        "{}_{}_{}.sql",
        label,
        database,
        at.format("%Y%m%d_%H%M%S")
    ))
}

/// Dump `endpoint` into `dir`, creating the directory if needed
pub async fn take_backup<C: DatabaseClient + ?Sized>(
    client: &C,
    endpoint: &Endpoint,
    dir: &Path,
    label: BackupLabel,
) -> Result<BackupArtifact, ClientError> {
    std::fs::create_dir_all(dir)?;
    let path = backup_path(dir, label, &endpoint.database, Local::now());

    tracing::info!(
        "Backing up {} ({}) to {}",
        endpoint.describe(),
        label,
        path.display()
    );
    client.dump(endpoint, &path).await?;

    let size_bytes = std::fs::metadata(&path)?.len();
    if size_bytes == 0 {
        return Err(ClientError::EmptyDump { path });
    }
    let sha256 = sha256_file(&path)?;

    tracing::info!("✓ Backup written ({})", format_bytes(size_bytes));
    Ok(BackupArtifact {
        label,
        path,
        size_bytes,
        sha256,
    })
}

fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Print every artifact with its size and location
pub fn print_summary(artifacts: &[BackupArtifact]) {
    println!();
    println!("Backups:");
    println!("{}", "─".repeat(60));
    for artifact in artifacts {
        println!(
            "{:<15} {:>10}  {}",
            artifact.label.as_str(),
            format_bytes(artifact.size_bytes),
            artifact.path.display()
        );
        println!("{:<15} sha256 {}", "", artifact.sha256);
    }
    println!("{}", "─".repeat(60));
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct FixedDump(&'static str);

    #[async_trait]
    impl DatabaseClient for FixedDump {
        async fn query(&self, _: &Endpoint, _: &str) -> Result<String, ClientError> {
            unreachable!("backups never query")
        }

        async fn dump(&self, _: &Endpoint, output: &Path) -> Result<(), ClientError> {
            std::fs::write(output, self.0)?;
            Ok(())
        }
    }

    fn endpoint() -> Endpoint {
        Endpoint {
            host: "localhost".into(),
            user: "root".into(),
            database: "amxbans".into(),
            ..Endpoint::default()
        }
    }

    #[test]
    fn test_backup_path_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let path = backup_path(Path::new("/backups"), BackupLabel::TargetAfter, "amx6", at);
        assert_eq!(
            path,
            PathBuf::from("/backups/target_after_amx6_20240309_070501.sql")
        );
    }

    #[tokio::test]
    async fn test_take_backup_creates_directory_and_checksums() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested").join("backups");

        let artifact = take_backup(
            &FixedDump("-- dump\n"),
            &endpoint(),
            &dir,
            BackupLabel::SourceBefore,
        )
        .await
        .unwrap();

        assert!(dir.is_dir());
        assert!(artifact.path.starts_with(&dir));
        assert_eq!(artifact.size_bytes, 8);
        assert_eq!(artifact.sha256.len(), 64);
        assert_eq!(artifact.label, BackupLabel::SourceBefore);
    }

    #[tokio::test]
    async fn test_empty_dump_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let result = take_backup(
            &FixedDump(""),
            &endpoint(),
            root.path(),
            BackupLabel::TargetBefore,
        )
        .await;

        assert!(matches!(result, Err(ClientError::EmptyDump { .. })));
    }
}
