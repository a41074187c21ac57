//! Memory Storage
//!
//! The shared, explicitly owned in-memory backend.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::engine::StorageEngine;
use crate::entity::{ETag, Entity};
use crate::error::Result;
use crate::operation::{validate_atomic_batch, OperationKind, PendingOperation};
use crate::query::{ContinuationToken, Page, QueryDescriptor, QuerySource};

use super::{Account, Partition};

/// Visible contents of a storage instance: table → partition → row → entity.
/// Empty partitions and tables are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageSnapshot {
    pub tables: BTreeMap<String, BTreeMap<String, BTreeMap<String, Entity>>>,
}

impl StorageSnapshot {
    pub fn entity_count(&self) -> usize {
        self.tables
            .values()
            .flat_map(|partitions| partitions.values())
            .map(BTreeMap::len)
            .sum()
    }
}

/// In-memory table storage
///
/// ## Concurrency
/// - `live`: the current account, swapped wholesale by atomic batches.
///   Readers clone the `Arc` and never wait on writers.
/// - `write_gate`: single-operation writes share it (they serialize on the
///   partition lock instead); an atomic batch holds it exclusively from copy
///   to publish so no concurrent write lands in the account being replaced.
/// - `etag_seq`: lock-free counter behind every version token.
pub struct MemoryStorage {
    live: RwLock<Arc<Account>>,
    write_gate: RwLock<()>,
    etag_seq: AtomicU64,
    page_size: usize,
}

impl MemoryStorage {
    /// Create an empty storage with default settings
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        Self {
            live: RwLock::new(Arc::new(Account::default())),
            write_gate: RwLock::new(()),
            etag_seq: AtomicU64::new(0),
            page_size: config.page_size.max(1),
        }
    }

    /// Create an empty storage ready to share between sessions
    pub fn shared(config: &Config) -> Arc<Self> {
        Arc::new(Self::with_config(config))
    }

    fn current(&self) -> Arc<Account> {
        Arc::clone(&self.live.read())
    }

    fn next_etag(&self) -> ETag {
        let seq = self.etag_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        ETag::new(format!("W/\"{}.{:08}\"", nanos, seq))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Apply one operation to the live state
    pub fn apply(&self, op: &PendingOperation) -> Result<()> {
        let _gate = self.write_gate.read();
        let account = self.current();

        let partition = match op.kind {
            OperationKind::Insert | OperationKind::Upsert => account
                .table_or_create(&op.table)
                .partition_or_create(op.partition_key()),
            _ => match account.partition(&op.table, op.partition_key()) {
                Some(partition) => partition,
                // Replace and merge still need a DoesNotExist
                None => Arc::new(Partition::new()),
            },
        };

        partition.apply(&op.table, op, self.next_etag())
    }

    /// Apply a group all-or-nothing
    ///
    /// The target partition is copied, every operation is applied to the
    /// copy, and the copy is published only if all of them succeeded.
    pub fn apply_atomic(&self, ops: &[PendingOperation]) -> Result<()> {
        validate_atomic_batch(ops)?;
        let Some(first) = ops.first() else {
            return Ok(());
        };
        let (table, partition_key) = (first.table.as_str(), first.partition_key());

        let _gate = self.write_gate.write();
        let account = self.current();

        let staged = account
            .partition(table, partition_key)
            .map(|p| p.deep_clone())
            .unwrap_or_default();

        for op in ops {
            staged.apply(table, op, self.next_etag())?;
        }

        let next = account.with_partition(table, partition_key, Arc::new(staged));
        *self.live.write() = Arc::new(next);

        tracing::trace!(table, partition_key, operations = ops.len(), "atomic batch published");
        Ok(())
    }

    /// Drop every table. Intended for test fixtures.
    pub fn reset_all(&self) {
        let _gate = self.write_gate.write();
        *self.live.write() = Arc::new(Account::default());
        tracing::debug!("memory storage reset");
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get(&self, table: &str, partition_key: &str, row_key: &str) -> Option<Entity> {
        self.current().partition(table, partition_key)?.get(row_key)
    }

    /// Names of tables that hold at least one entity
    pub fn table_names(&self) -> Vec<String> {
        self.snapshot().tables.into_keys().collect()
    }

    pub fn entity_count(&self) -> usize {
        self.snapshot().entity_count()
    }

    /// Consistent copy of everything currently visible
    pub fn snapshot(&self) -> StorageSnapshot {
        let account = self.current();
        let mut snapshot = StorageSnapshot::default();

        for (name, table) in account.tables() {
            let partitions: BTreeMap<_, _> = table
                .partitions()
                .into_iter()
                .map(|(key, partition)| (key, partition.entities()))
                .filter(|(_, entities)| !entities.is_empty())
                .collect();
            if !partitions.is_empty() {
                snapshot.tables.insert(name, partitions);
            }
        }

        snapshot
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl QuerySource for MemoryStorage {
    fn fetch_page(
        &self,
        table: &str,
        descriptor: &QueryDescriptor,
        continuation: Option<&ContinuationToken>,
    ) -> Result<Page> {
        if descriptor.is_empty() {
            return Ok(Page::default());
        }
        let Some(table) = self.current().table(table) else {
            return Ok(Page::default());
        };

        let limit = descriptor.top_count.unwrap_or(usize::MAX).min(self.page_size);
        let mut entities = Vec::new();

        for (partition_key, partition) in table.partitions_in(descriptor.partition_key_range.bounds()) {
            let resume_row = match continuation {
                Some(token) if partition_key < token.next_partition_key => continue,
                Some(token) if partition_key == token.next_partition_key => Some(token.next_row_key.as_str()),
                _ => None,
            };

            if let Some(next_row_key) =
                partition.collect_rows(&partition_key, descriptor, resume_row, limit, &mut entities)
            {
                return Ok(Page {
                    entities,
                    continuation: Some(ContinuationToken {
                        next_partition_key: partition_key,
                        next_row_key,
                    }),
                });
            }
        }

        Ok(Page {
            entities,
            continuation: None,
        })
    }
}

impl StorageEngine for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn execute(&self, op: &PendingOperation) -> Result<()> {
        self.apply(op)
    }

    fn execute_batch(&self, ops: &[PendingOperation]) -> Result<()> {
        self.apply_atomic(ops)
    }
}
