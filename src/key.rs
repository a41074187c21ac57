//! Key Validator
//!
//! Partition and row keys must be non-empty, at most 1024 UTF-16 code units,
//! and free of `/`, `\`, `#`, `?` and control characters.

use crate::error::{Result, TableError};

/// Maximum key length in UTF-16 code units
pub const MAX_KEY_LENGTH: usize = 1024;

/// Characters never allowed in a key
pub const RESERVED_KEY_CHARS: [char; 4] = ['/', '\\', '#', '?'];

/// Which half of the two-level key is being validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Partition,
    Row,
}

impl KeyKind {
    fn label(self) -> &'static str {
        match self {
            KeyKind::Partition => "partition key",
            KeyKind::Row => "row key",
        }
    }
}

/// Validate a partition key
pub fn validate_partition_key(key: &str) -> Result<()> {
    validate_key(KeyKind::Partition, key)
}

/// Validate a row key
pub fn validate_row_key(key: &str) -> Result<()> {
    validate_key(KeyKind::Row, key)
}

/// Validate both halves of an entity key
pub fn validate_keys(partition_key: &str, row_key: &str) -> Result<()> {
    validate_partition_key(partition_key)?;
    validate_row_key(row_key)
}

/// Validate a key of the given kind
pub fn validate_key(kind: KeyKind, key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(TableError::InvalidKey(format!("{} is empty", kind.label())));
    }

    let length = key.encode_utf16().count();
    if length > MAX_KEY_LENGTH {
        return Err(TableError::InvalidKey(format!(
            "{} is {} UTF-16 units long (max {})",
            kind.label(),
            length,
            MAX_KEY_LENGTH
        )));
    }

    if let Some(c) = key.chars().find(|c| is_disallowed(*c)) {
        return Err(TableError::InvalidKey(format!(
            "{} contains disallowed character {:?}",
            kind.label(),
            c
        )));
    }

    Ok(())
}

fn is_disallowed(c: char) -> bool {
    RESERVED_KEY_CHARS.contains(&c) || matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}')
}
