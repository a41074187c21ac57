//! Partition
//!
//! A key-ordered map of row key → entity behind one exclusive lock. Every
//! write to the partition is serialized by that lock; other partitions are
//! unaffected.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::entity::{ETag, Entity};
use crate::error::{Result, TableError};
use crate::operation::{IfMatch, OperationKind, PendingOperation};
use crate::query::QueryDescriptor;

/// Entities of one partition, ordered by row key
#[derive(Debug, Default)]
pub struct Partition {
    entities: Mutex<BTreeMap<String, Entity>>,
}

impl Partition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Independent copy of the current contents
    pub fn deep_clone(&self) -> Self {
        Self {
            entities: Mutex::new(self.entities.lock().clone()),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.lock().is_empty()
    }

    pub fn get(&self, row_key: &str) -> Option<Entity> {
        self.entities.lock().get(row_key).cloned()
    }

    /// Copy of every entity, in row key order
    pub fn entities(&self) -> BTreeMap<String, Entity> {
        self.entities.lock().clone()
    }

    /// Apply one write, stamping a stored entity with `etag`
    pub fn apply(&self, table: &str, op: &PendingOperation, etag: ETag) -> Result<()> {
        let mut entities = self.entities.lock();
        let row_key = op.row_key();

        match op.kind {
            OperationKind::Insert => {
                if entities.contains_key(row_key) {
                    return Err(TableError::already_exists(table, op.partition_key(), row_key));
                }
                entities.insert(row_key.to_string(), stamped(&op.entity, etag));
            }
            OperationKind::Upsert => {
                entities.insert(row_key.to_string(), stamped(&op.entity, etag));
            }
            OperationKind::Replace => {
                let existing = entities
                    .get_mut(row_key)
                    .ok_or_else(|| TableError::does_not_exist(table, op.partition_key(), row_key))?;
                check_version(table, op, existing)?;
                *existing = stamped(&op.entity, etag);
            }
            OperationKind::Merge => {
                let existing = entities
                    .get_mut(row_key)
                    .ok_or_else(|| TableError::does_not_exist(table, op.partition_key(), row_key))?;
                check_version(table, op, existing)?;
                existing.merge_from(&op.entity);
                existing.set_etag(Some(etag));
            }
            OperationKind::Delete => {
                // Deleting a missing entity is a no-op
                if let Some(existing) = entities.get(row_key) {
                    check_version(table, op, existing)?;
                    entities.remove(row_key);
                }
            }
        }

        Ok(())
    }

    /// Append matching entities (starting at `resume_row` if given) to `out`
    /// until it holds `limit` entries. Returns the row key of the first
    /// matching entity left behind, if any.
    pub(crate) fn collect_rows(
        &self,
        partition_key: &str,
        descriptor: &QueryDescriptor,
        resume_row: Option<&str>,
        limit: usize,
        out: &mut Vec<Entity>,
    ) -> Option<String> {
        let entities = self.entities.lock();
        let rows = entities.range::<str, _>(descriptor.row_key_range.bounds());

        for (row_key, entity) in rows {
            if resume_row.is_some_and(|resume| row_key.as_str() < resume) {
                continue;
            }
            if !descriptor.matches(partition_key, row_key) {
                continue;
            }
            if out.len() >= limit {
                return Some(row_key.clone());
            }
            out.push(entity.clone());
        }

        None
    }
}

fn stamped(entity: &Entity, etag: ETag) -> Entity {
    let mut stored = entity.clone();
    stored.set_etag(Some(etag));
    stored
}

fn check_version(table: &str, op: &PendingOperation, stored: &Entity) -> Result<()> {
    match op.if_match() {
        IfMatch::Any => Ok(()),
        IfMatch::Tag(expected) if stored.etag() == Some(expected) => Ok(()),
        IfMatch::Tag(_) => Err(TableError::changed(table, op.partition_key(), op.row_key())),
    }
}
