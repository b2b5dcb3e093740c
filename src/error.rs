// ABOUTME: Error taxonomy for the migration runner and database client
// ABOUTME: Maps each failure class to the process exit code the CLI reports

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single database client invocation (query or dump)
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to execute `{program}`: {source}. Is the MySQL client installed?")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("dump produced no output at {}", path.display())]
    EmptyDump { path: PathBuf },

    #[error("unexpected client output: {0}")]
    Output(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Top-level failure of a migration run
///
/// Every variant is fatal: the runner stops at the first one it hits and
/// never retries.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("missing required client tools: {}", .0.join(", "))]
    MissingTools(Vec<String>),

    #[error("cannot connect to {side} database ({endpoint})")]
    Connectivity {
        side: &'static str,
        endpoint: String,
        #[source]
        source: ClientError,
    },

    #[error("backup '{label}' failed")]
    Backup {
        label: String,
        #[source]
        source: ClientError,
    },

    #[error("statement failed during {step}")]
    Statement {
        step: String,
        #[source]
        source: ClientError,
    },

    #[error("migration cancelled by user")]
    Cancelled,
}

impl MigrateError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            MigrateError::Config(_)
            | MigrateError::MissingTools(_)
            | MigrateError::Connectivity { .. }
            | MigrateError::Backup { .. } => 1,
            MigrateError::Statement { .. } => 2,
            MigrateError::Cancelled => 130,
        }
    }

    pub(crate) fn statement(step: impl Into<String>, source: ClientError) -> Self {
        MigrateError::Statement {
            step: step.into(),
            source,
        }
    }
}
