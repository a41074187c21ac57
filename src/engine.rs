//! Engine Module
//!
//! The seam between sessions and storage backends, and the commit driver
//! that executes a drained queue under one of the three execution modes.
//!
//! ## Responsibilities
//! - Define what a storage engine must provide (single ops, atomic batches, pages)
//! - Execute a queue Individually, InBatches or Atomically
//! - Record per-group outcomes so callers can see partial success

use crate::error::{Result, TableError};
use crate::operation::{split_into_batches, validate_atomic_batch, Execute, PendingOperation};
use crate::query::QuerySource;

/// A backend a session can commit to and query
///
/// Implemented by the in-memory engine and by the networked adapter. Both map
/// failures onto the same `TableError` variants.
pub trait StorageEngine: QuerySource {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Apply one operation on its own
    fn execute(&self, op: &PendingOperation) -> Result<()>;

    /// Apply a group all-or-nothing. Callers validate the group first.
    fn execute_batch(&self, ops: &[PendingOperation]) -> Result<()>;
}

// =============================================================================
// Commit Report
// =============================================================================

/// The operations of one executed group and how it ended
#[derive(Debug)]
pub struct GroupOutcome {
    pub operations: Vec<PendingOperation>,
    pub result: Result<()>,
}

impl GroupOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcome of one commit, group by group, in execution order
#[derive(Debug)]
pub struct CommitReport {
    mode: Execute,
    groups: Vec<GroupOutcome>,
}

impl CommitReport {
    fn new(mode: Execute, groups: Vec<GroupOutcome>) -> Self {
        Self { mode, groups }
    }

    pub fn mode(&self) -> Execute {
        self.mode
    }

    pub fn groups(&self) -> &[GroupOutcome] {
        &self.groups
    }

    /// Total operations the commit consumed
    pub fn operation_count(&self) -> usize {
        self.groups.iter().map(|g| g.operations.len()).sum()
    }

    pub fn is_success(&self) -> bool {
        self.groups.iter().all(GroupOutcome::is_success)
    }

    /// Operations whose group was applied
    pub fn succeeded(&self) -> impl Iterator<Item = &PendingOperation> {
        self.groups
            .iter()
            .filter(|g| g.is_success())
            .flat_map(|g| g.operations.iter())
    }

    /// Operations whose group failed, with the group's error
    pub fn failed(&self) -> impl Iterator<Item = (&PendingOperation, &TableError)> {
        self.groups.iter().filter_map(|g| g.result.as_ref().err().map(|e| (g, e))).flat_map(
            |(g, e)| g.operations.iter().map(move |op| (op, e)),
        )
    }

    /// The first failure, if any
    pub fn into_result(self) -> Result<()> {
        self.groups
            .into_iter()
            .map(|g| g.result)
            .find(|r| r.is_err())
            .unwrap_or(Ok(()))
    }
}

// =============================================================================
// Commit Driver
// =============================================================================

/// Execute a drained queue
///
/// Every group runs even if an earlier one failed; order is enqueue order.
pub fn commit<E: StorageEngine + ?Sized>(
    engine: &E,
    operations: Vec<PendingOperation>,
    mode: Execute,
) -> CommitReport {
    if operations.is_empty() {
        return CommitReport::new(mode, Vec::new());
    }

    tracing::debug!(
        engine = engine.name(),
        ?mode,
        operations = operations.len(),
        "commit started"
    );

    let groups = match mode {
        Execute::Individually => operations
            .into_iter()
            .map(|op| run_group(engine, vec![op]))
            .collect(),
        Execute::InBatches => split_into_batches(operations)
            .into_iter()
            .map(|batch| run_group(engine, batch))
            .collect(),
        Execute::Atomically => {
            let result = match validate_atomic_batch(&operations) {
                Ok(()) => engine.execute_batch(&operations),
                Err(e) => Err(e),
            };
            log_group(engine, &operations, &result);
            vec![GroupOutcome { operations, result }]
        }
    };

    let report = CommitReport::new(mode, groups);
    tracing::debug!(
        engine = engine.name(),
        ?mode,
        groups = report.groups.len(),
        success = report.is_success(),
        "commit finished"
    );
    report
}

fn run_group<E: StorageEngine + ?Sized>(engine: &E, operations: Vec<PendingOperation>) -> GroupOutcome {
    // A lone operation runs unbatched so deletes stay idempotent
    let result = match operations.as_slice() {
        [single] => engine.execute(single),
        batch => validate_atomic_batch(batch).and_then(|_| engine.execute_batch(batch)),
    };
    log_group(engine, &operations, &result);
    GroupOutcome { operations, result }
}

fn log_group<E: StorageEngine + ?Sized>(engine: &E, operations: &[PendingOperation], result: &Result<()>) {
    match result {
        Ok(()) => tracing::trace!(engine = engine.name(), operations = operations.len(), "group applied"),
        Err(e) => tracing::warn!(
            engine = engine.name(),
            operations = operations.len(),
            first = %operations[0],
            "group failed: {}",
            e
        ),
    }
}
