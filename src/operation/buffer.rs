//! Operation buffer
//!
//! The ordered queue of writes a session has issued since its last commit.
//! Keys are validated on the way in, so a bad key fails the call that
//! enqueued it rather than the later commit.

use crate::entity::Entity;
use crate::error::{Result, TableError};
use crate::key;

use super::{ConflictHandling, OperationKind, PendingOperation};

/// Ordered queue of pending writes
#[derive(Debug, Default)]
pub struct OperationBuffer {
    queue: Vec<PendingOperation>,
}

impl OperationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append an operation
    pub fn enqueue(&mut self, op: PendingOperation) -> Result<()> {
        if op.table.is_empty() {
            return Err(TableError::InvalidOperation("table name is empty".to_string()));
        }
        key::validate_keys(op.partition_key(), op.row_key())?;

        tracing::trace!("enqueue {}", op);
        self.queue.push(op);
        Ok(())
    }

    pub fn insert(&mut self, table: &str, entity: Entity) -> Result<()> {
        self.enqueue(PendingOperation::new(OperationKind::Insert, table, entity, ConflictHandling::Throw))
    }

    pub fn upsert(&mut self, table: &str, entity: Entity) -> Result<()> {
        self.enqueue(PendingOperation::new(OperationKind::Upsert, table, entity, ConflictHandling::Overwrite))
    }

    pub fn replace(&mut self, table: &str, entity: Entity, conflict: ConflictHandling) -> Result<()> {
        self.enqueue(PendingOperation::new(OperationKind::Replace, table, entity, conflict))
    }

    pub fn merge(&mut self, table: &str, entity: Entity, conflict: ConflictHandling) -> Result<()> {
        self.enqueue(PendingOperation::new(OperationKind::Merge, table, entity, conflict))
    }

    /// Unconditional delete by key
    pub fn delete(&mut self, table: &str, partition_key: &str, row_key: &str) -> Result<()> {
        self.enqueue(PendingOperation::new(
            OperationKind::Delete,
            table,
            Entity::new(partition_key, row_key),
            ConflictHandling::Overwrite,
        ))
    }

    /// Delete checked against the entity's ETag
    pub fn delete_entity(&mut self, table: &str, entity: &Entity, conflict: ConflictHandling) -> Result<()> {
        let target = Entity::new(entity.partition_key(), entity.row_key()).etag_from(entity.etag().cloned());
        self.enqueue(PendingOperation::new(OperationKind::Delete, table, target, conflict))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingOperation> {
        self.queue.iter()
    }

    /// Take every queued operation, leaving the buffer empty
    pub fn drain(&mut self) -> Vec<PendingOperation> {
        std::mem::take(&mut self.queue)
    }
}
