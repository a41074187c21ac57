//! Commit Tests
//!
//! Tests for the commit driver: execution modes, grouping and reports.

use std::sync::Arc;

use parking_lot::Mutex;
use tablekv::engine::{self, StorageEngine};
use tablekv::entity::Entity;
use tablekv::operation::{ConflictHandling, Execute, OperationKind, PendingOperation};
use tablekv::query::{ContinuationToken, Page, QueryDescriptor, QuerySource};
use tablekv::{MemoryStorage, TableError};

// =============================================================================
// Helpers
// =============================================================================

/// Records how each group reached the engine, then delegates to memory
#[derive(Default)]
struct RecordingEngine {
    inner: MemoryStorage,
    calls: Mutex<Vec<(&'static str, usize)>>,
}

impl QuerySource for RecordingEngine {
    fn fetch_page(
        &self,
        table: &str,
        descriptor: &QueryDescriptor,
        continuation: Option<&ContinuationToken>,
    ) -> tablekv::Result<Page> {
        self.inner.fetch_page(table, descriptor, continuation)
    }
}

impl StorageEngine for RecordingEngine {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn execute(&self, op: &PendingOperation) -> tablekv::Result<()> {
        self.calls.lock().push(("single", 1));
        self.inner.execute(op)
    }

    fn execute_batch(&self, ops: &[PendingOperation]) -> tablekv::Result<()> {
        self.calls.lock().push(("batch", ops.len()));
        self.inner.execute_batch(ops)
    }
}

fn op(kind: OperationKind, pk: &str, rk: &str) -> PendingOperation {
    PendingOperation::new(kind, "t", Entity::new(pk, rk), ConflictHandling::Throw)
}

fn setup_engine() -> Arc<RecordingEngine> {
    Arc::new(RecordingEngine::default())
}

// =============================================================================
// Mode Tests
// =============================================================================

#[test]
fn test_empty_commit_touches_nothing() {
    let engine = setup_engine();
    let report = engine::commit(engine.as_ref(), Vec::new(), Execute::Atomically);
    assert!(report.is_success());
    assert_eq!(report.operation_count(), 0);
    assert!(engine.calls.lock().is_empty());
}

#[test]
fn test_individually_continues_after_failure() {
    let engine = setup_engine();
    let ops = vec![
        op(OperationKind::Insert, "p", "1"),
        op(OperationKind::Replace, "p", "missing"),
        op(OperationKind::Insert, "p", "2"),
    ];

    let report = engine::commit(engine.as_ref(), ops, Execute::Individually);
    assert_eq!(report.groups().len(), 3);
    assert!(!report.is_success());
    assert_eq!(report.succeeded().count(), 2);

    let failed: Vec<_> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0.row_key(), "missing");
    assert!(failed[0].1.is_does_not_exist());

    assert!(engine.inner.get("t", "p", "2").is_some());
}

#[test]
fn test_in_batches_groups_by_partition() {
    let engine = setup_engine();
    let ops = vec![
        op(OperationKind::Insert, "p", "1"),
        op(OperationKind::Insert, "p", "2"),
        op(OperationKind::Insert, "q", "1"),
    ];

    let report = engine::commit(engine.as_ref(), ops, Execute::InBatches);
    assert!(report.is_success());
    assert_eq!(*engine.calls.lock(), vec![("batch", 2), ("single", 1)]);
}

#[test]
fn test_in_batches_failed_group_is_all_or_nothing() {
    let engine = setup_engine();
    engine.inner.execute(&op(OperationKind::Insert, "p", "2")).unwrap();

    let ops = vec![
        op(OperationKind::Insert, "p", "1"),
        op(OperationKind::Insert, "p", "2"),
        op(OperationKind::Insert, "q", "1"),
        op(OperationKind::Insert, "q", "2"),
    ];
    let report = engine::commit(engine.as_ref(), ops, Execute::InBatches);

    assert_eq!(report.groups().len(), 2);
    assert!(!report.groups()[0].is_success());
    assert!(report.groups()[1].is_success());
    assert!(engine.inner.get("t", "p", "1").is_none());
    assert!(engine.inner.get("t", "q", "2").is_some());
}

#[test]
fn test_in_batches_delete_of_missing_succeeds() {
    let engine = setup_engine();
    let ops = vec![
        op(OperationKind::Insert, "p", "1"),
        op(OperationKind::Delete, "p", "never"),
        op(OperationKind::Delete, "p", "1"),
    ];

    let report = engine::commit(engine.as_ref(), ops, Execute::InBatches);
    assert!(report.is_success());
    assert_eq!(engine.inner.entity_count(), 0);
}

#[test]
fn test_atomically_is_one_group() {
    let engine = setup_engine();
    let ops = vec![
        op(OperationKind::Insert, "p", "1"),
        op(OperationKind::Insert, "p", "2"),
        op(OperationKind::Delete, "p", "3"),
    ];

    let report = engine::commit(engine.as_ref(), ops, Execute::Atomically);
    assert!(report.is_success());
    assert_eq!(report.groups().len(), 1);
    assert_eq!(*engine.calls.lock(), vec![("batch", 3)]);
}

#[test]
fn test_atomically_rejects_before_execution() {
    let engine = setup_engine();
    let ops = vec![op(OperationKind::Insert, "p", "1"), op(OperationKind::Insert, "q", "1")];

    let report = engine::commit(engine.as_ref(), ops, Execute::Atomically);
    assert!(engine.calls.lock().is_empty());
    assert!(matches!(
        report.into_result(),
        Err(TableError::AtomicConstraintViolation(_))
    ));
}

#[test]
fn test_into_result_returns_first_error() {
    let engine = setup_engine();
    let ops = vec![
        op(OperationKind::Merge, "p", "a"),
        op(OperationKind::Insert, "p", "b"),
        op(OperationKind::Insert, "p", "b"),
    ];

    let report = engine::commit(engine.as_ref(), ops, Execute::Individually);
    assert_eq!(report.mode(), Execute::Individually);
    assert!(report.into_result().unwrap_err().is_does_not_exist());
}
