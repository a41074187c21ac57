//! Operation Module
//!
//! Deferred writes and how they are grouped for commit.
//!
//! ## Responsibilities
//! - Represent a pending write (insert/upsert/replace/merge/delete)
//! - Hold a session's ordered queue of pending writes
//! - Split the queue into atomic batches
//! - Validate a batch against atomic-commit constraints

mod batch;
mod buffer;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::{ETag, Entity};

pub use batch::{can_batch, split_into_batches, validate_atomic_batch, MAX_BATCH_SIZE};
pub use buffer::OperationBuffer;

/// Kind of deferred write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Insert,
    Upsert,
    Replace,
    Merge,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Insert => "insert",
            OperationKind::Upsert => "upsert",
            OperationKind::Replace => "replace",
            OperationKind::Merge => "merge",
            OperationKind::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Behavior when a supplied ETag is stale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictHandling {
    /// Fail with `Changed`
    #[default]
    Throw,
    /// Write regardless of the stored version
    Overwrite,
}

/// How `commit` executes the queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Execute {
    /// One operation at a time; failures don't stop later operations
    #[default]
    Individually,
    /// Maximal atomic groups; a failed group doesn't stop later groups
    InBatches,
    /// The whole queue as one all-or-nothing group
    Atomically,
}

/// Precondition a conditional write carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfMatch<'a> {
    /// Unconditional
    Any,
    /// Only if the stored ETag equals this one
    Tag(&'a ETag),
}

/// A write waiting for the next commit
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOperation {
    pub kind: OperationKind,
    pub table: String,
    pub entity: Entity,
    pub conflict_handling: ConflictHandling,
}

impl PendingOperation {
    pub fn new(kind: OperationKind, table: impl Into<String>, entity: Entity, conflict_handling: ConflictHandling) -> Self {
        Self {
            kind,
            table: table.into(),
            entity,
            conflict_handling,
        }
    }

    pub fn partition_key(&self) -> &str {
        self.entity.partition_key()
    }

    pub fn row_key(&self) -> &str {
        self.entity.row_key()
    }

    /// The version check this operation performs.
    ///
    /// Inserts and upserts never check. Other writes check only when the
    /// caller supplied an ETag and asked to throw on conflict.
    pub fn if_match(&self) -> IfMatch<'_> {
        match (self.kind, self.conflict_handling, self.entity.etag()) {
            (OperationKind::Insert | OperationKind::Upsert, _, _) => IfMatch::Any,
            (_, ConflictHandling::Overwrite, _) | (_, _, None) => IfMatch::Any,
            (_, ConflictHandling::Throw, Some(etag)) => IfMatch::Tag(etag),
        }
    }
}

impl fmt::Display for PendingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{}/{}",
            self.kind,
            self.table,
            self.partition_key(),
            self.row_key()
        )
    }
}
