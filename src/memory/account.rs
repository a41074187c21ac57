//! Account and Table
//!
//! `Account → Table → Partition`. Both maps grow lazily and never evict.
//! Children are shared through `Arc`, so producing a new account that differs
//! in one partition copies only the maps on the path to it.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::Partition;

/// Partitions of one table, ordered by partition key
#[derive(Debug, Default)]
pub struct Table {
    partitions: RwLock<BTreeMap<String, Arc<Partition>>>,
}

impl Table {
    pub fn partition(&self, partition_key: &str) -> Option<Arc<Partition>> {
        self.partitions.read().get(partition_key).cloned()
    }

    pub fn partition_or_create(&self, partition_key: &str) -> Arc<Partition> {
        if let Some(partition) = self.partition(partition_key) {
            return partition;
        }
        let mut partitions = self.partitions.write();
        Arc::clone(partitions.entry(partition_key.to_string()).or_default())
    }

    /// Current partitions, shared, in key order
    pub fn partitions(&self) -> Vec<(String, Arc<Partition>)> {
        self.partitions
            .read()
            .iter()
            .map(|(key, partition)| (key.clone(), Arc::clone(partition)))
            .collect()
    }

    /// Partitions whose key lies within `bounds`
    pub(crate) fn partitions_in(
        &self,
        bounds: (std::ops::Bound<&str>, std::ops::Bound<&str>),
    ) -> Vec<(String, Arc<Partition>)> {
        self.partitions
            .read()
            .range::<str, _>(bounds)
            .map(|(key, partition)| (key.clone(), Arc::clone(partition)))
            .collect()
    }

    fn with_partition(&self, partition_key: &str, partition: Arc<Partition>) -> Table {
        let mut partitions = self.partitions.read().clone();
        partitions.insert(partition_key.to_string(), partition);
        Table {
            partitions: RwLock::new(partitions),
        }
    }
}

/// Every table of one storage instance
#[derive(Debug, Default)]
pub struct Account {
    tables: RwLock<BTreeMap<String, Arc<Table>>>,
}

impl Account {
    pub fn table(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.read().get(name).cloned()
    }

    pub fn table_or_create(&self, name: &str) -> Arc<Table> {
        if let Some(table) = self.table(name) {
            return table;
        }
        let mut tables = self.tables.write();
        Arc::clone(tables.entry(name.to_string()).or_default())
    }

    pub fn partition(&self, table: &str, partition_key: &str) -> Option<Arc<Partition>> {
        self.table(table)?.partition(partition_key)
    }

    pub fn tables(&self) -> Vec<(String, Arc<Table>)> {
        self.tables
            .read()
            .iter()
            .map(|(name, table)| (name.clone(), Arc::clone(table)))
            .collect()
    }

    /// A new account identical to this one except for one partition
    pub fn with_partition(&self, table: &str, partition_key: &str, partition: Arc<Partition>) -> Account {
        let mut tables = self.tables.read().clone();
        let next_table = match tables.get(table) {
            Some(existing) => existing.with_partition(partition_key, partition),
            None => Table::default().with_partition(partition_key, partition),
        };
        tables.insert(table.to_string(), Arc::new(next_table));
        Account {
            tables: RwLock::new(tables),
        }
    }
}
