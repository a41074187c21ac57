//! Entity Module
//!
//! The normalized record every engine stores and every query returns.
//!
//! ## Responsibilities
//! - Two-level key (partition key, row key), immutable once assigned
//! - Typed property map (each value carries its declared type)
//! - Opaque version token (ETag) assigned by the engine on every write
//! - Normalization of typed and dynamic caller items into an `Entity`

mod item;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use item::{Item, ReservedPropertyHandling, TableEntity};

/// Property names the storage layer owns
pub const PARTITION_KEY: &str = "PartitionKey";
pub const ROW_KEY: &str = "RowKey";
pub const TIMESTAMP: &str = "Timestamp";
pub const ETAG: &str = "ETag";

/// All reserved property names
pub const RESERVED_PROPERTY_NAMES: [&str; 4] = [PARTITION_KEY, ROW_KEY, TIMESTAMP, ETAG];

/// Property name → typed value
pub type PropertyMap = BTreeMap<String, PropertyValue>;

// =============================================================================
// Property Values
// =============================================================================

/// Declared type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    String,
    Boolean,
    Int32,
    Int64,
    Double,
    DateTime,
    Guid,
    Binary,
}

/// A property value tagged with its type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    String(String),
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    /// UTC milliseconds since the unix epoch
    DateTime(i64),
    Guid(u128),
    Binary(Vec<u8>),
    /// A missing value that still declares its type
    Null(PropertyType),
}

impl PropertyValue {
    /// The declared type of this value
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::Boolean(_) => PropertyType::Boolean,
            PropertyValue::Int32(_) => PropertyType::Int32,
            PropertyValue::Int64(_) => PropertyType::Int64,
            PropertyValue::Double(_) => PropertyType::Double,
            PropertyValue::DateTime(_) => PropertyType::DateTime,
            PropertyValue::Guid(_) => PropertyType::Guid,
            PropertyValue::Binary(_) => PropertyType::Binary,
            PropertyValue::Null(ty) => *ty,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int32(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int64(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Double(value)
    }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(value: Vec<u8>) -> Self {
        PropertyValue::Binary(value)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "{:?}", s),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Int32(n) => write!(f, "{}i32", n),
            PropertyValue::Int64(n) => write!(f, "{}", n),
            PropertyValue::Double(n) => write!(f, "{:?}", n),
            PropertyValue::DateTime(ms) => write!(f, "datetime({})", ms),
            PropertyValue::Guid(g) => write!(f, "guid({:032x})", g),
            PropertyValue::Binary(bytes) => write!(f, "binary({} bytes)", bytes.len()),
            PropertyValue::Null(ty) => write!(f, "null({:?})", ty),
        }
    }
}

// =============================================================================
// Version Token
// =============================================================================

/// Opaque version token; compare for equality only
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ETag(String);

impl ETag {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Entity
// =============================================================================

/// A stored record: keys, properties and an optional version token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    partition_key: String,
    row_key: String,
    properties: PropertyMap,
    etag: Option<ETag>,
}

impl Entity {
    /// Create an entity with no properties and no ETag
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            properties: PropertyMap::new(),
            etag: None,
        }
    }

    /// Create an entity from an existing property map
    pub fn with_properties(
        partition_key: impl Into<String>,
        row_key: impl Into<String>,
        properties: PropertyMap,
    ) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            properties,
            etag: None,
        }
    }

    /// Builder-style property setter
    pub fn property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Builder-style ETag setter
    pub fn etag_from(mut self, etag: Option<ETag>) -> Self {
        self.etag = etag;
        self
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    pub fn row_key(&self) -> &str {
        &self.row_key
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut PropertyMap {
        &mut self.properties
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn etag(&self) -> Option<&ETag> {
        self.etag.as_ref()
    }

    pub fn set_etag(&mut self, etag: Option<ETag>) {
        self.etag = etag;
    }

    pub fn into_properties(self) -> PropertyMap {
        self.properties
    }

    /// Overwrite listed properties with those of `other`, keeping the rest
    pub(crate) fn merge_from(&mut self, other: &Entity) {
        for (name, value) in &other.properties {
            self.properties.insert(name.clone(), value.clone());
        }
    }
}
