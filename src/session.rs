//! Session
//!
//! A caller-owned buffer of pending writes bound to one storage engine.
//!
//! Writes are only enqueued; nothing becomes visible, not even to this
//! session, until `commit`. Each commit drains the buffer exactly once, even
//! when it fails, so a failed commit is never resubmitted by the next one.

use std::sync::Arc;

use crate::engine::{self, CommitReport, StorageEngine};
use crate::entity::Entity;
use crate::error::{Result, TableError};
use crate::operation::{ConflictHandling, Execute, OperationBuffer, PendingOperation};
use crate::query::{QueryDescriptor, QuerySource, TableQuery, Unfiltered};

/// One unit of work against a storage engine
pub struct Session<E> {
    engine: Arc<E>,
    buffer: OperationBuffer,
}

impl<E: StorageEngine + 'static> Session<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            buffer: OperationBuffer::new(),
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    // =========================================================================
    // Deferred Writes
    // =========================================================================

    /// Insert; fails at commit with `AlreadyExists` if the key is taken
    pub fn add_new(&mut self, table: &str, entity: Entity) -> Result<()> {
        self.buffer.insert(table, entity)
    }

    /// Insert or replace, ignoring ETags
    pub fn upsert(&mut self, table: &str, entity: Entity) -> Result<()> {
        self.buffer.upsert(table, entity)
    }

    /// Replace all properties of an existing entity
    pub fn replace(&mut self, table: &str, entity: Entity, conflict: ConflictHandling) -> Result<()> {
        self.buffer.replace(table, entity, conflict)
    }

    /// Overwrite only the listed properties of an existing entity
    pub fn merge(&mut self, table: &str, entity: Entity, conflict: ConflictHandling) -> Result<()> {
        self.buffer.merge(table, entity, conflict)
    }

    /// Unconditional delete by key; missing entities are ignored
    pub fn delete(&mut self, table: &str, partition_key: &str, row_key: &str) -> Result<()> {
        self.buffer.delete(table, partition_key, row_key)
    }

    /// Delete checked against the entity's ETag
    pub fn delete_entity(&mut self, table: &str, entity: &Entity, conflict: ConflictHandling) -> Result<()> {
        self.buffer.delete_entity(table, entity, conflict)
    }

    /// Enqueue a delete for every entity currently committed in a partition
    pub fn delete_all(&mut self, table: &str, partition_key: &str) -> Result<()> {
        let rows = self.scan(table, &QueryDescriptor::partition(partition_key))?;
        for entity in rows {
            self.buffer.delete(table, entity.partition_key(), entity.row_key())?;
        }
        Ok(())
    }

    /// Enqueue a prepared operation
    pub fn enqueue(&mut self, op: PendingOperation) -> Result<()> {
        self.buffer.enqueue(op)
    }

    pub fn pending_count(&self) -> usize {
        self.buffer.len()
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingOperation> {
        self.buffer.iter()
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Commit every pending write; returns the first failure
    pub fn commit(&mut self, mode: Execute) -> Result<()> {
        self.commit_with_report(mode).into_result()
    }

    /// Commit every pending write and report each group's outcome
    pub fn commit_with_report(&mut self, mode: Execute) -> CommitReport {
        let operations = self.buffer.drain();
        engine::commit(self.engine.as_ref(), operations, mode)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Start a query against committed state
    pub fn query(&self, table: &str, include_etag: bool) -> TableQuery<Unfiltered> {
        let source: Arc<dyn QuerySource> = self.engine.clone();
        TableQuery::new(source, table, include_etag)
    }

    /// Run a prepared descriptor, keeping ETags
    pub fn scan(&self, table: &str, descriptor: &QueryDescriptor) -> Result<Vec<Entity>> {
        let source: Arc<dyn QuerySource> = self.engine.clone();
        crate::query::Pages::new(source, table.to_string(), descriptor.clone(), true)
            .collect::<Result<Vec<_>>>()
            .map(|pages| pages.into_iter().flatten().collect())
    }

    /// Fetch one committed entity
    pub fn get(&self, table: &str, partition_key: &str, row_key: &str) -> Result<Entity> {
        let found = self
            .query(table, true)
            .partition_key_equals(partition_key)
            .row_key_equals(row_key)
            .top(1)
            .execute()?;
        found
            .into_iter()
            .next()
            .ok_or_else(|| TableError::does_not_exist(table, partition_key, row_key))
    }
}
