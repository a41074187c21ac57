//! Item normalization
//!
//! Callers hand the storage layer either a typed value implementing
//! [`TableEntity`] or a dynamic property bag. Both become an [`Entity`].

use crate::error::{Result, TableError};

use super::{Entity, ETag, PropertyMap, PropertyValue, ETAG, PARTITION_KEY, RESERVED_PROPERTY_NAMES, ROW_KEY, TIMESTAMP};

/// Explicit mapping between a caller type and the normalized entity shape
pub trait TableEntity {
    /// Partition key carried by the value itself, if any
    fn partition_key(&self) -> Option<String>;

    /// Row key carried by the value itself, if any
    fn row_key(&self) -> Option<String>;

    /// Every stored property except the keys
    fn properties(&self) -> PropertyMap;

    /// Version token captured on a previous read
    fn etag(&self) -> Option<ETag> {
        None
    }

    /// Rebuild a value from a stored entity
    fn from_entity(entity: &Entity) -> Result<Self>
    where
        Self: Sized;
}

/// How reserved names in a dynamic property bag are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReservedPropertyHandling {
    /// Reject the item with `InvalidEntity`
    #[default]
    Throw,
    /// Take `PartitionKey`/`RowKey`/`ETag` as the entity's keys and version,
    /// drop `Timestamp`
    UseAsKeys,
}

/// A caller item before normalization
pub enum Item<'a> {
    Typed(&'a dyn TableEntity),
    Dynamic(PropertyMap),
}

impl<'a> Item<'a> {
    /// Normalize into an entity.
    ///
    /// `explicit_keys` fills keys the item does not carry; a key the item
    /// does carry must agree with it.
    pub fn into_entity(
        self,
        explicit_keys: Option<(&str, &str)>,
        handling: ReservedPropertyHandling,
    ) -> Result<Entity> {
        let (partition_key, row_key, properties, etag) = match self {
            Item::Typed(value) => {
                let properties = value.properties();
                if let Some(name) = first_reserved(&properties) {
                    return Err(TableError::InvalidEntity(format!(
                        "typed entity defines reserved property {}",
                        name
                    )));
                }
                (value.partition_key(), value.row_key(), properties, value.etag())
            }
            Item::Dynamic(mut properties) => match handling {
                ReservedPropertyHandling::Throw => {
                    if let Some(name) = first_reserved(&properties) {
                        return Err(TableError::InvalidEntity(format!(
                            "reserved property name {}",
                            name
                        )));
                    }
                    (None, None, properties, None)
                }
                ReservedPropertyHandling::UseAsKeys => {
                    let partition_key = take_string(&mut properties, PARTITION_KEY)?;
                    let row_key = take_string(&mut properties, ROW_KEY)?;
                    let etag = take_string(&mut properties, ETAG)?.map(ETag::new);
                    properties.remove(TIMESTAMP);
                    (partition_key, row_key, properties, etag)
                }
            },
        };

        let partition_key = resolve_key(PARTITION_KEY, partition_key, explicit_keys.map(|k| k.0))?;
        let row_key = resolve_key(ROW_KEY, row_key, explicit_keys.map(|k| k.1))?;

        Ok(Entity::with_properties(partition_key, row_key, properties).etag_from(etag))
    }
}

fn first_reserved(properties: &PropertyMap) -> Option<&'static str> {
    RESERVED_PROPERTY_NAMES
        .iter()
        .copied()
        .find(|name| properties.contains_key(*name))
}

fn take_string(properties: &mut PropertyMap, name: &str) -> Result<Option<String>> {
    match properties.remove(name) {
        None | Some(PropertyValue::Null(_)) => Ok(None),
        Some(PropertyValue::String(s)) => Ok(Some(s)),
        Some(other) => Err(TableError::InvalidEntity(format!(
            "{} must be a string, found {:?}",
            name,
            other.property_type()
        ))),
    }
}

fn resolve_key(name: &str, carried: Option<String>, explicit: Option<&str>) -> Result<String> {
    match (carried.filter(|k| !k.is_empty()), explicit) {
        (Some(carried), Some(explicit)) if carried != explicit => Err(TableError::InvalidEntity(format!(
            "entity defines {} {:?} but it conflicts with argument {:?}",
            name, carried, explicit
        ))),
        (Some(carried), _) => Ok(carried),
        (None, Some(explicit)) => Ok(explicit.to_string()),
        (None, None) => Err(TableError::InvalidEntity(format!(
            "required property {} missing",
            name
        ))),
    }
}
