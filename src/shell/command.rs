//! Shell commands
//!
//! One parsed script line.

use crate::entity::PropertyMap;
use crate::operation::{Execute, OperationKind};
use crate::query::QueryDescriptor;

/// Command names as written in scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Insert,
    Upsert,
    Replace,
    Merge,
    Delete,
    DeleteAll,
    Commit,
    Get,
    Query,
}

impl CommandType {
    pub fn from_keyword(word: &str) -> Option<Self> {
        let ty = match word {
            "insert" => CommandType::Insert,
            "upsert" => CommandType::Upsert,
            "replace" => CommandType::Replace,
            "merge" => CommandType::Merge,
            "delete" => CommandType::Delete,
            "delete-all" => CommandType::DeleteAll,
            "commit" => CommandType::Commit,
            "get" => CommandType::Get,
            "query" => CommandType::Query,
            _ => return None,
        };
        Some(ty)
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Queue an insert, upsert, replace or merge
    Write {
        kind: OperationKind,
        table: String,
        partition_key: String,
        row_key: String,
        properties: PropertyMap,
    },

    /// Queue a delete of one entity
    Delete {
        table: String,
        partition_key: String,
        row_key: String,
    },

    /// Queue deletes for a whole partition
    DeleteAll { table: String, partition_key: String },

    /// Commit the queue
    Commit { mode: Execute },

    /// Print one committed entity
    Get {
        table: String,
        partition_key: String,
        row_key: String,
    },

    /// Print every committed entity matching a descriptor
    Query { table: String, descriptor: QueryDescriptor },
}

impl Command {
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Write { kind, .. } => match kind {
                OperationKind::Insert => CommandType::Insert,
                OperationKind::Upsert => CommandType::Upsert,
                OperationKind::Replace => CommandType::Replace,
                OperationKind::Merge => CommandType::Merge,
                OperationKind::Delete => CommandType::Delete,
            },
            Command::Delete { .. } => CommandType::Delete,
            Command::DeleteAll { .. } => CommandType::DeleteAll,
            Command::Commit { .. } => CommandType::Commit,
            Command::Get { .. } => CommandType::Get,
            Command::Query { .. } => CommandType::Query,
        }
    }
}
