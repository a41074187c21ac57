//! Key Validator Tests
//!
//! Tests for partition and row key validation.

use tablekv::key::{validate_key, validate_keys, validate_partition_key, validate_row_key, KeyKind, MAX_KEY_LENGTH};
use tablekv::TableError;

// =============================================================================
// Accepted Keys
// =============================================================================

#[test]
fn test_plain_keys_accepted() {
    assert!(validate_keys("customers", "0001").is_ok());
    assert!(validate_keys("a b c", "with-dash_and.dot").is_ok());
}

#[test]
fn test_unicode_keys_accepted() {
    assert!(validate_partition_key("größe").is_ok());
    assert!(validate_row_key("日本語").is_ok());
}

#[test]
fn test_max_length_accepted() {
    let key = "k".repeat(MAX_KEY_LENGTH);
    assert!(validate_partition_key(&key).is_ok());
}

// =============================================================================
// Rejected Keys
// =============================================================================

#[test]
fn test_empty_key_rejected() {
    let err = validate_partition_key("").unwrap_err();
    assert!(matches!(err, TableError::InvalidKey(_)));
}

#[test]
fn test_too_long_key_rejected() {
    let key = "k".repeat(MAX_KEY_LENGTH + 1);
    assert!(matches!(validate_row_key(&key), Err(TableError::InvalidKey(_))));
}

#[test]
fn test_length_counts_utf16_units() {
    // Each of these is two UTF-16 code units
    let key = "😀".repeat(MAX_KEY_LENGTH / 2 + 1);
    assert!(key.chars().count() <= MAX_KEY_LENGTH);
    assert!(validate_row_key(&key).is_err());
}

#[test]
fn test_reserved_characters_rejected() {
    for key in ["a/b", "a\\b", "a#b", "a?b"] {
        assert!(
            matches!(validate_key(KeyKind::Row, key), Err(TableError::InvalidKey(_))),
            "expected {:?} to be rejected",
            key
        );
    }
}

#[test]
fn test_control_characters_rejected() {
    for key in ["tab\there", "nul\u{0}", "del\u{7f}", "c1\u{85}", "c1end\u{9f}"] {
        assert!(validate_partition_key(key).is_err(), "expected {:?} to be rejected", key);
    }
}

#[test]
fn test_error_names_which_key() {
    let err = validate_keys("ok", "bad/row").unwrap_err();
    assert!(err.to_string().contains("row key"));

    let err = validate_keys("bad#pk", "ok").unwrap_err();
    assert!(err.to_string().contains("partition key"));
}
