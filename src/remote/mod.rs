//! Remote Module
//!
//! Adapter from the session/commit machinery to a networked table store.
//!
//! ## Responsibilities
//! - Forward single operations, atomic batches and query pages to a `TableBackend`
//! - Map backend status codes onto the shared `TableError` taxonomy
//! - Retry transient failures with exponential backoff
//! - Enforce atomic-batch constraints before dispatch
//!
//! ## Status Mapping
//! | status | error |
//! |--------|-------|
//! | 409 | `AlreadyExists` |
//! | 404 | `DoesNotExist` (success for an unbatched delete) |
//! | 412 | `Changed` |
//! | 400 | `InvalidOperation` (success for an unbatched delete on a missing table) |
//! | 0, 408, 429, 500, 502, 503, 504 | retried, then `Transient` |
//! | anything else | `Backend` |

mod retry;

use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::engine::StorageEngine;
use crate::error::{Result, TableError};
use crate::operation::{validate_atomic_batch, OperationKind, PendingOperation};
use crate::query::{ContinuationToken, Page, QueryDescriptor, QuerySource};

pub use retry::{RetryFailure, RetryPolicy};

/// Error code a store reports when a table does not exist
pub const OUT_OF_RANGE_INPUT: &str = "OutOfRangeInput";

// =============================================================================
// Backend Interface
// =============================================================================

/// Failure reported by a networked store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    /// HTTP-style status; 0 when no response was received
    pub status: u16,
    pub error_code: Option<String>,
    pub message: String,
    /// Position of the failing operation within a batch
    pub operation_index: Option<usize>,
}

impl BackendError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            error_code: None,
            message: message.into(),
            operation_index: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    pub fn at_index(mut self, index: usize) -> Self {
        self.operation_index = Some(index);
        self
    }

    /// Failures worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self.status, 0 | 408 | 429 | 500 | 502 | 503 | 504)
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}", self.status)?;
        if let Some(code) = &self.error_code {
            write!(f, " ({})", code)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for BackendError {}

/// A networked table store
///
/// Implementations translate operations into requests; conditional writes
/// should send `PendingOperation::if_match()` as their precondition.
pub trait TableBackend: Send + Sync {
    fn execute(&self, table: &str, op: &PendingOperation) -> std::result::Result<(), BackendError>;

    fn execute_batch(&self, table: &str, ops: &[PendingOperation]) -> std::result::Result<(), BackendError>;

    fn query(
        &self,
        table: &str,
        descriptor: &QueryDescriptor,
        continuation: Option<&ContinuationToken>,
    ) -> std::result::Result<Page, BackendError>;
}

impl<B: TableBackend + ?Sized> TableBackend for Arc<B> {
    fn execute(&self, table: &str, op: &PendingOperation) -> std::result::Result<(), BackendError> {
        (**self).execute(table, op)
    }

    fn execute_batch(&self, table: &str, ops: &[PendingOperation]) -> std::result::Result<(), BackendError> {
        (**self).execute_batch(table, ops)
    }

    fn query(
        &self,
        table: &str,
        descriptor: &QueryDescriptor,
        continuation: Option<&ContinuationToken>,
    ) -> std::result::Result<Page, BackendError> {
        (**self).query(table, descriptor, continuation)
    }
}

// =============================================================================
// Remote Storage
// =============================================================================

/// Storage engine backed by a `TableBackend`
pub struct RemoteStorage<B> {
    backend: B,
    retry: RetryPolicy,
}

impl<B: TableBackend> RemoteStorage<B> {
    pub fn new(backend: B, config: &Config) -> Self {
        Self {
            backend,
            retry: config.retry,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}

impl<B: TableBackend> QuerySource for RemoteStorage<B> {
    fn fetch_page(
        &self,
        table: &str,
        descriptor: &QueryDescriptor,
        continuation: Option<&ContinuationToken>,
    ) -> Result<Page> {
        match self
            .retry
            .run("query", || self.backend.query(table, descriptor, continuation))
        {
            Ok(page) => Ok(page),
            // Querying a table that doesn't exist yields nothing
            Err(RetryFailure::Permanent(e)) if e.status == 404 => Ok(Page::default()),
            Err(RetryFailure::Permanent(e)) if e.status == 400 => Err(TableError::InvalidOperation(e.to_string())),
            Err(RetryFailure::Permanent(e)) => Err(TableError::Backend(e)),
            Err(RetryFailure::Exhausted { attempts, last }) => Err(TableError::Transient { attempts, source: last }),
        }
    }
}

impl<B: TableBackend> StorageEngine for RemoteStorage<B> {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn execute(&self, op: &PendingOperation) -> Result<()> {
        let result = self.retry.run("execute", || self.backend.execute(&op.table, op));
        let unbatched_delete = op.kind == OperationKind::Delete;
        map_failure(result, std::slice::from_ref(op), unbatched_delete)
    }

    fn execute_batch(&self, ops: &[PendingOperation]) -> Result<()> {
        validate_atomic_batch(ops)?;
        let Some(first) = ops.first() else {
            return Ok(());
        };
        let result = self
            .retry
            .run("execute_batch", || self.backend.execute_batch(&first.table, ops));
        map_failure(result, ops, false)
    }
}

/// Translate a backend outcome into the shared taxonomy
fn map_failure(
    result: std::result::Result<(), RetryFailure>,
    ops: &[PendingOperation],
    unbatched_delete: bool,
) -> Result<()> {
    let e = match result {
        Ok(()) => return Ok(()),
        Err(RetryFailure::Exhausted { attempts, last }) => {
            return Err(TableError::Transient { attempts, source: last })
        }
        Err(RetryFailure::Permanent(e)) => e,
    };

    if unbatched_delete {
        if e.status == 404 {
            return Ok(());
        }
        if e.status == 400 && e.error_code.as_deref() == Some(OUT_OF_RANGE_INPUT) {
            return Ok(());
        }
    }

    let Some(op) = e.operation_index.and_then(|i| ops.get(i)).or_else(|| ops.first()) else {
        return Err(TableError::Backend(e));
    };
    let (table, pk, rk) = (op.table.as_str(), op.partition_key(), op.row_key());

    Err(match e.status {
        409 => TableError::already_exists(table, pk, rk),
        404 => TableError::does_not_exist(table, pk, rk),
        412 => TableError::changed(table, pk, rk),
        400 => TableError::InvalidOperation(format!("table storage returned 'Bad Request': {}", e)),
        _ => TableError::Backend(e),
    })
}
