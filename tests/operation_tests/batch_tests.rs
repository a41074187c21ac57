//! Operation Tests
//!
//! Tests for the operation buffer, batch partitioning and atomic validation.

use tablekv::entity::Entity;
use tablekv::operation::{
    can_batch, split_into_batches, validate_atomic_batch, ConflictHandling, IfMatch, OperationBuffer,
    OperationKind, PendingOperation, MAX_BATCH_SIZE,
};
use tablekv::{ETag, TableError};

// =============================================================================
// Helpers
// =============================================================================

fn op(kind: OperationKind, table: &str, pk: &str, rk: &str) -> PendingOperation {
    PendingOperation::new(kind, table, Entity::new(pk, rk), ConflictHandling::Throw)
}

fn sizes(batches: &[Vec<PendingOperation>]) -> Vec<usize> {
    batches.iter().map(Vec::len).collect()
}

// =============================================================================
// Batch Partitioning Tests
// =============================================================================

#[test]
fn test_can_batch_rules() {
    let a = op(OperationKind::Insert, "t", "p", "1");
    assert!(can_batch(&a, &op(OperationKind::Merge, "t", "p", "2")));
    assert!(!can_batch(&a, &op(OperationKind::Insert, "other", "p", "2")));
    assert!(!can_batch(&a, &op(OperationKind::Insert, "t", "q", "2")));
    assert!(!can_batch(&a, &op(OperationKind::Insert, "t", "p", "1")));
    assert!(!can_batch(&a, &op(OperationKind::Delete, "t", "p", "2")));
}

#[test]
fn test_split_groups_same_partition_runs() {
    let ops = vec![
        op(OperationKind::Insert, "t", "p", "1"),
        op(OperationKind::Insert, "t", "p", "2"),
        op(OperationKind::Insert, "t", "q", "1"),
        op(OperationKind::Upsert, "t", "q", "2"),
        op(OperationKind::Insert, "t", "p", "3"),
    ];
    assert_eq!(sizes(&split_into_batches(ops)), vec![2, 2, 1]);
}

#[test]
fn test_split_isolates_deletes() {
    let ops = vec![
        op(OperationKind::Insert, "t", "p", "1"),
        op(OperationKind::Delete, "t", "p", "2"),
        op(OperationKind::Delete, "t", "p", "3"),
        op(OperationKind::Insert, "t", "p", "4"),
    ];
    assert_eq!(sizes(&split_into_batches(ops)), vec![1, 1, 1, 1]);
}

#[test]
fn test_split_breaks_on_repeated_row() {
    let ops = vec![
        op(OperationKind::Insert, "t", "p", "1"),
        op(OperationKind::Insert, "t", "p", "2"),
        op(OperationKind::Merge, "t", "p", "1"),
    ];
    assert_eq!(sizes(&split_into_batches(ops)), vec![2, 1]);
}

#[test]
fn test_split_caps_batch_size() {
    let ops: Vec<_> = (0..MAX_BATCH_SIZE + 5)
        .map(|i| op(OperationKind::Upsert, "t", "p", &format!("{:04}", i)))
        .collect();
    assert_eq!(sizes(&split_into_batches(ops)), vec![MAX_BATCH_SIZE, 5]);
}

#[test]
fn test_split_preserves_order() {
    let ops: Vec<_> = ["1", "2", "3"]
        .iter()
        .map(|rk| op(OperationKind::Insert, "t", "p", rk))
        .collect();
    let flattened: Vec<_> = split_into_batches(ops.clone()).into_iter().flatten().collect();
    assert_eq!(flattened, ops);
}

#[test]
fn test_split_empty() {
    assert!(split_into_batches(Vec::new()).is_empty());
}

// =============================================================================
// Atomic Validation Tests
// =============================================================================

#[test]
fn test_validate_accepts_single_partition() {
    let ops = vec![
        op(OperationKind::Insert, "t", "p", "1"),
        op(OperationKind::Delete, "t", "p", "2"),
    ];
    assert!(validate_atomic_batch(&ops).is_ok());
    assert!(validate_atomic_batch(&[]).is_ok());
}

#[test]
fn test_validate_rejects_multiple_tables() {
    let ops = vec![op(OperationKind::Insert, "a", "p", "1"), op(OperationKind::Insert, "b", "p", "2")];
    assert!(matches!(
        validate_atomic_batch(&ops),
        Err(TableError::AtomicConstraintViolation(_))
    ));
}

#[test]
fn test_validate_rejects_multiple_partitions() {
    let ops = vec![op(OperationKind::Insert, "t", "p", "1"), op(OperationKind::Insert, "t", "q", "2")];
    assert!(matches!(
        validate_atomic_batch(&ops),
        Err(TableError::AtomicConstraintViolation(_))
    ));
}

#[test]
fn test_validate_rejects_duplicate_rows() {
    let ops = vec![op(OperationKind::Insert, "t", "p", "1"), op(OperationKind::Merge, "t", "p", "1")];
    assert!(matches!(
        validate_atomic_batch(&ops),
        Err(TableError::AtomicConstraintViolation(_))
    ));
}

#[test]
fn test_validate_rejects_oversized() {
    let ops: Vec<_> = (0..=MAX_BATCH_SIZE)
        .map(|i| op(OperationKind::Insert, "t", "p", &i.to_string()))
        .collect();
    assert!(validate_atomic_batch(&ops).is_err());
}

// =============================================================================
// Pending Operation Tests
// =============================================================================

#[test]
fn test_if_match_rules() {
    let etag = ETag::new("v1");
    let tagged = Entity::new("p", "r").etag_from(Some(etag.clone()));

    let replace = PendingOperation::new(OperationKind::Replace, "t", tagged.clone(), ConflictHandling::Throw);
    assert_eq!(replace.if_match(), IfMatch::Tag(&etag));

    let overwrite = PendingOperation::new(OperationKind::Replace, "t", tagged.clone(), ConflictHandling::Overwrite);
    assert_eq!(overwrite.if_match(), IfMatch::Any);

    let untagged = PendingOperation::new(OperationKind::Merge, "t", Entity::new("p", "r"), ConflictHandling::Throw);
    assert_eq!(untagged.if_match(), IfMatch::Any);

    let upsert = PendingOperation::new(OperationKind::Upsert, "t", tagged, ConflictHandling::Throw);
    assert_eq!(upsert.if_match(), IfMatch::Any);
}

#[test]
fn test_operation_display() {
    let pending = op(OperationKind::Merge, "orders", "2024", "17");
    assert_eq!(pending.to_string(), "merge orders/2024/17");
}

// =============================================================================
// Buffer Tests
// =============================================================================

#[test]
fn test_buffer_keeps_enqueue_order() {
    let mut buffer = OperationBuffer::new();
    buffer.insert("t", Entity::new("p", "1")).unwrap();
    buffer.delete("t", "p", "2").unwrap();
    buffer.upsert("t", Entity::new("p", "3")).unwrap();

    let kinds: Vec<_> = buffer.iter().map(|op| op.kind).collect();
    assert_eq!(kinds, vec![OperationKind::Insert, OperationKind::Delete, OperationKind::Upsert]);
}

#[test]
fn test_buffer_rejects_invalid_key_without_enqueueing() {
    let mut buffer = OperationBuffer::new();
    let err = buffer.insert("t", Entity::new("bad/key", "1")).unwrap_err();
    assert!(matches!(err, TableError::InvalidKey(_)));
    assert!(buffer.is_empty());
}

#[test]
fn test_buffer_rejects_empty_table() {
    let mut buffer = OperationBuffer::new();
    assert!(matches!(
        buffer.upsert("", Entity::new("p", "r")),
        Err(TableError::InvalidOperation(_))
    ));
}

#[test]
fn test_delete_entity_carries_etag_only() {
    let mut buffer = OperationBuffer::new();
    let entity = Entity::new("p", "r")
        .property("name", "x")
        .etag_from(Some(ETag::new("v7")));
    buffer.delete_entity("t", &entity, ConflictHandling::Throw).unwrap();

    let queued = buffer.iter().next().unwrap();
    assert_eq!(queued.kind, OperationKind::Delete);
    assert!(queued.entity.properties().is_empty());
    assert_eq!(queued.entity.etag(), Some(&ETag::new("v7")));
}

#[test]
fn test_drain_empties_buffer() {
    let mut buffer = OperationBuffer::new();
    buffer.upsert("t", Entity::new("p", "r")).unwrap();
    let drained = buffer.drain();
    assert_eq!(drained.len(), 1);
    assert!(buffer.is_empty());
    assert_eq!(buffer.len(), 0);
}
