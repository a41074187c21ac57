//! Error types for TableKV
//!
//! One taxonomy shared by the in-memory engine and the networked adapter, so
//! callers see the same failures regardless of backend.

use thiserror::Error;

use crate::remote::BackendError;

/// Result type alias using TableError
pub type Result<T> = std::result::Result<T, TableError>;

/// Unified error type for TableKV operations
#[derive(Debug, Error)]
pub enum TableError {
    // -------------------------------------------------------------------------
    // Conflict Errors
    // -------------------------------------------------------------------------
    #[error("Entity already exists: {table}/{partition_key}/{row_key}")]
    AlreadyExists {
        table: String,
        partition_key: String,
        row_key: String,
    },

    #[error("Entity does not exist: {table}/{partition_key}/{row_key}")]
    DoesNotExist {
        table: String,
        partition_key: String,
        row_key: String,
    },

    #[error("Entity has been changed: {table}/{partition_key}/{row_key}")]
    Changed {
        table: String,
        partition_key: String,
        row_key: String,
    },

    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    #[error("Atomic batch constraint violated: {0}")]
    AtomicConstraintViolation(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    // -------------------------------------------------------------------------
    // Backend Errors
    // -------------------------------------------------------------------------
    #[error("Transient backend failure after {attempts} attempts: {source}")]
    Transient {
        attempts: u32,
        #[source]
        source: BackendError,
    },

    #[error("Backend error: {0}")]
    Backend(BackendError),

    // -------------------------------------------------------------------------
    // Shell Errors
    // -------------------------------------------------------------------------
    #[error("Script error on line {line}: {message}")]
    Script { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TableError {
    pub(crate) fn already_exists(table: &str, partition_key: &str, row_key: &str) -> Self {
        Self::AlreadyExists {
            table: table.to_string(),
            partition_key: partition_key.to_string(),
            row_key: row_key.to_string(),
        }
    }

    pub(crate) fn does_not_exist(table: &str, partition_key: &str, row_key: &str) -> Self {
        Self::DoesNotExist {
            table: table.to_string(),
            partition_key: partition_key.to_string(),
            row_key: row_key.to_string(),
        }
    }

    pub(crate) fn changed(table: &str, partition_key: &str, row_key: &str) -> Self {
        Self::Changed {
            table: table.to_string(),
            partition_key: partition_key.to_string(),
            row_key: row_key.to_string(),
        }
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    pub fn is_does_not_exist(&self) -> bool {
        matches!(self, Self::DoesNotExist { .. })
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}
