//! Error types for database access and provisioning.

use pgboot_secrets::SecretError;
use thiserror::Error;

/// Failures talking to the database server.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{0}")]
    Connect(#[source] sqlx::Error),

    #[error("connection to {host}:{port}/{database} timed out after {timeout_ms}ms")]
    ConnectTimeout {
        host: String,
        port: u16,
        database: String,
        timeout_ms: u64,
    },

    #[error("{0}")]
    Statement(#[source] sqlx::Error),

    #[error("{0}")]
    Close(#[source] sqlx::Error),

    #[error("query returned no rows")]
    NoRows,

    /// Failure reported by a connector that does not go through sqlx.
    #[error("{0}")]
    Backend(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Everything that can stop a provisioning phase.
///
/// Display is the underlying error's own message so that the single ERROR
/// record for a phase carries it unchanged.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Database(#[from] DbError),

    /// Carries no value: the offending username is itself a secret.
    #[error("admin username from secret store is not a safe SQL identifier")]
    AdminIdentifier,
}

impl ProvisionError {
    /// Coarse classification used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ProvisionError::Secret(_) => "secret_retrieval",
            ProvisionError::Database(DbError::Connect(_) | DbError::ConnectTimeout { .. }) => {
                "connection"
            }
            ProvisionError::Database(_) => "statement_execution",
            ProvisionError::AdminIdentifier => "unexpected",
        }
    }
}
