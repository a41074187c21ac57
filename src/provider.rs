//! Table Storage Provider
//!
//! Convenience façade over a [`Session`] that accepts caller items (typed
//! values or dynamic property bags), applies the configured defaults, and
//! converts read results back into caller types.
//!
//! ## Responsibilities
//! - Normalize items through the configured reserved-property handling
//! - Apply the default conflict policy to replace, merge and delete
//! - Expose whole-table, partition and inclusive range reads
//! - Forward `save` to the session's commit

use std::sync::Arc;

use crate::config::Config;
use crate::engine::{CommitReport, StorageEngine};
use crate::entity::{Entity, Item, TableEntity};
use crate::error::Result;
use crate::operation::{ConflictHandling, Execute};
use crate::query::{TableQuery, Unfiltered};
use crate::session::Session;

/// Explicit keys supplied alongside an item
pub type Keys<'k> = Option<(&'k str, &'k str)>;

pub struct TableStorageProvider<E> {
    session: Session<E>,
    config: Config,
}

impl<E: StorageEngine + 'static> TableStorageProvider<E> {
    pub fn new(engine: Arc<E>, config: Config) -> Self {
        Self {
            session: Session::new(engine),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Session<E> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<E> {
        &mut self.session
    }

    fn normalize(&self, item: Item<'_>, keys: Keys<'_>) -> Result<Entity> {
        item.into_entity(keys, self.config.reserved_properties)
    }

    fn conflict(&self) -> ConflictHandling {
        self.config.conflict_handling
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Queue an insert
    pub fn add(&mut self, table: &str, item: Item<'_>, keys: Keys<'_>) -> Result<()> {
        let entity = self.normalize(item, keys)?;
        self.session.add_new(table, entity)
    }

    /// Queue an insert-or-replace
    pub fn upsert(&mut self, table: &str, item: Item<'_>, keys: Keys<'_>) -> Result<()> {
        let entity = self.normalize(item, keys)?;
        self.session.upsert(table, entity)
    }

    /// Queue a full replacement of an existing entity
    pub fn update(&mut self, table: &str, item: Item<'_>, keys: Keys<'_>) -> Result<()> {
        let entity = self.normalize(item, keys)?;
        let conflict = self.conflict();
        self.session.replace(table, entity, conflict)
    }

    /// Queue a property merge into an existing entity
    pub fn merge(&mut self, table: &str, item: Item<'_>, keys: Keys<'_>) -> Result<()> {
        let entity = self.normalize(item, keys)?;
        let conflict = self.conflict();
        self.session.merge(table, entity, conflict)
    }

    /// Queue an unconditional delete by key
    pub fn delete(&mut self, table: &str, partition_key: &str, row_key: &str) -> Result<()> {
        self.session.delete(table, partition_key, row_key)
    }

    /// Queue a delete of an item, checked against its ETag unless overwriting
    pub fn delete_item(&mut self, table: &str, item: Item<'_>, keys: Keys<'_>) -> Result<()> {
        let entity = self.normalize(item, keys)?;
        let conflict = self.conflict();
        self.session.delete_entity(table, &entity, conflict)
    }

    /// Queue deletes for every committed entity in a partition
    pub fn delete_collection(&mut self, table: &str, partition_key: &str) -> Result<()> {
        self.session.delete_all(table, partition_key)
    }

    /// Commit everything queued so far
    pub fn save(&mut self, mode: Execute) -> Result<()> {
        self.session.commit(mode)
    }

    pub fn save_with_report(&mut self, mode: Execute) -> CommitReport {
        self.session.commit_with_report(mode)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Start a dynamic query; ETags follow `include_etag_for_dynamic`
    pub fn create_query(&self, table: &str) -> TableQuery<Unfiltered> {
        self.session.query(table, self.config.include_etag_for_dynamic)
    }

    /// Fetch one entity as a caller type
    pub fn get<T: TableEntity>(&self, table: &str, partition_key: &str, row_key: &str) -> Result<T> {
        T::from_entity(&self.session.get(table, partition_key, row_key)?)
    }

    /// Fetch one entity in its dynamic form
    pub fn get_entity(&self, table: &str, partition_key: &str, row_key: &str) -> Result<Entity> {
        let mut entity = self.session.get(table, partition_key, row_key)?;
        if !self.config.include_etag_for_dynamic {
            entity.set_etag(None);
        }
        Ok(entity)
    }

    /// Every entity in a table
    pub fn get_collection<T: TableEntity>(&self, table: &str) -> Result<Vec<T>> {
        convert(self.session.query(table, true).execute()?)
    }

    /// Every entity in one partition
    pub fn get_partition<T: TableEntity>(&self, table: &str, partition_key: &str) -> Result<Vec<T>> {
        convert(
            self.session
                .query(table, true)
                .partition_key_equals(partition_key)
                .execute()?,
        )
    }

    /// Entities whose partition key lies in `[low, high]`
    pub fn get_range_by_partition_key<T: TableEntity>(&self, table: &str, low: &str, high: &str) -> Result<Vec<T>> {
        convert(
            self.session
                .query(table, true)
                .partition_key_from(low)
                .inclusive()
                .partition_key_to(high)
                .inclusive()
                .execute()?,
        )
    }

    /// Entities of one partition whose row key lies in `[low, high]`
    pub fn get_range_by_row_key<T: TableEntity>(
        &self,
        table: &str,
        partition_key: &str,
        low: &str,
        high: &str,
    ) -> Result<Vec<T>> {
        convert(
            self.session
                .query(table, true)
                .partition_key_equals(partition_key)
                .row_key_from(low)
                .inclusive()
                .row_key_to(high)
                .inclusive()
                .execute()?,
        )
    }
}

fn convert<T: TableEntity>(entities: Vec<Entity>) -> Result<Vec<T>> {
    entities.iter().map(T::from_entity).collect()
}
