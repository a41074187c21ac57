//! Batch partitioning
//!
//! Splits a queue into the longest contiguous runs that can be committed as
//! one atomic unit, in a single left-to-right pass.

use std::collections::HashSet;

use crate::error::{Result, TableError};

use super::{OperationKind, PendingOperation};

/// Maximum number of operations in one atomic batch
pub const MAX_BATCH_SIZE: usize = 100;

/// Whether two operations may share a grouped batch
///
/// Same table, same partition, different rows, and neither is a delete.
pub fn can_batch(a: &PendingOperation, b: &PendingOperation) -> bool {
    a.table == b.table
        && a.partition_key() == b.partition_key()
        && a.kind != OperationKind::Delete
        && b.kind != OperationKind::Delete
        && a.row_key() != b.row_key()
}

/// Group operations into batches, preserving order
pub fn split_into_batches(operations: Vec<PendingOperation>) -> Vec<Vec<PendingOperation>> {
    let mut batches: Vec<Vec<PendingOperation>> = Vec::new();

    for next in operations {
        let fits = match batches.last() {
            Some(current) => {
                current.len() < MAX_BATCH_SIZE && current.iter().all(|op| can_batch(op, &next))
            }
            None => false,
        };

        match batches.last_mut() {
            Some(current) if fits => current.push(next),
            _ => batches.push(vec![next]),
        }
    }

    batches
}

/// Check a group against the atomic-commit constraints
///
/// One table, one partition, distinct row keys, at most `MAX_BATCH_SIZE`.
pub fn validate_atomic_batch(operations: &[PendingOperation]) -> Result<()> {
    if operations.len() > MAX_BATCH_SIZE {
        return Err(TableError::AtomicConstraintViolation(format!(
            "batch of {} operations exceeds the limit of {}",
            operations.len(),
            MAX_BATCH_SIZE
        )));
    }

    let Some(first) = operations.first() else {
        return Ok(());
    };

    let mut rows = HashSet::with_capacity(operations.len());
    for op in operations {
        if op.table != first.table {
            return Err(TableError::AtomicConstraintViolation(
                "cannot atomically execute operations on multiple tables".to_string(),
            ));
        }
        if op.partition_key() != first.partition_key() {
            return Err(TableError::AtomicConstraintViolation(
                "cannot atomically execute operations on different partitions".to_string(),
            ));
        }
        if !rows.insert(op.row_key()) {
            return Err(TableError::AtomicConstraintViolation(format!(
                "row key {:?} appears more than once in the batch",
                op.row_key()
            )));
        }
    }

    Ok(())
}
