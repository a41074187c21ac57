//! Query Module
//!
//! Key-range queries over a table.
//!
//! ## Responsibilities
//! - Describe partition/row key bounds and an optional result cap
//! - Restrict filter combinations through the builder's stage types
//! - Evaluate a descriptor against a key-ordered entity sequence
//! - Merge paginated results lazily, stopping once the cap is met
//!
//! ## Evaluation
//! Sources deliver entities in ascending (partition key, row key) order. An
//! entity matches iff its partition key lies inside the partition range and,
//! when a row range is set, its row key lies inside the row range.

mod builder;
mod pages;

use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::Result;

pub use builder::{
    BoundChoice, Complete, PartitionLowBounded, PartitionSet, RowFilterable, RowLowBounded, TableQuery,
    Unfiltered,
};
pub use pages::{Pages, PartialResult, QueryIter};

// =============================================================================
// Key Bounds
// =============================================================================

/// One end of a key range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBound {
    pub value: String,
    pub inclusive: bool,
}

impl KeyBound {
    pub fn inclusive(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            inclusive: true,
        }
    }

    pub fn exclusive(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            inclusive: false,
        }
    }

    fn as_bound(&self) -> Bound<&str> {
        if self.inclusive {
            Bound::Included(self.value.as_str())
        } else {
            Bound::Excluded(self.value.as_str())
        }
    }
}

/// Lower and upper bound on one key column; `None` means open-ended
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    pub lower: Option<KeyBound>,
    pub upper: Option<KeyBound>,
}

impl KeyRange {
    /// A range matching exactly one key
    pub fn exact(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            lower: Some(KeyBound::inclusive(value.clone())),
            upper: Some(KeyBound::inclusive(value)),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// The single key this range pins, if lower and upper are the same inclusive key
    pub fn exact_key(&self) -> Option<&str> {
        match (&self.lower, &self.upper) {
            (Some(lo), Some(hi)) if lo.inclusive && hi.inclusive && lo.value == hi.value => {
                Some(lo.value.as_str())
            }
            _ => None,
        }
    }

    /// True if no key can satisfy both bounds
    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(lo), Some(hi)) => {
                lo.value > hi.value || (lo.value == hi.value && !(lo.inclusive && hi.inclusive))
            }
            _ => false,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        let above_lower = match &self.lower {
            None => true,
            Some(b) if b.inclusive => key >= b.value.as_str(),
            Some(b) => key > b.value.as_str(),
        };
        let below_upper = match &self.upper {
            None => true,
            Some(b) if b.inclusive => key <= b.value.as_str(),
            Some(b) => key < b.value.as_str(),
        };
        above_lower && below_upper
    }

    /// Bounds usable with `BTreeMap::range`; callers must check `is_empty` first
    pub fn bounds(&self) -> (Bound<&str>, Bound<&str>) {
        (
            self.lower.as_ref().map_or(Bound::Unbounded, KeyBound::as_bound),
            self.upper.as_ref().map_or(Bound::Unbounded, KeyBound::as_bound),
        )
    }
}

// =============================================================================
// Query Descriptor
// =============================================================================

/// Immutable description of a key-range query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub partition_key_range: KeyRange,
    pub row_key_range: KeyRange,
    pub top_count: Option<usize>,
}

impl QueryDescriptor {
    /// All entities of one partition
    pub fn partition(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key_range: KeyRange::exact(partition_key),
            ..Self::default()
        }
    }

    /// True if the descriptor can never match anything
    pub fn is_empty(&self) -> bool {
        self.top_count == Some(0) || self.partition_key_range.is_empty() || self.row_key_range.is_empty()
    }

    pub fn matches(&self, partition_key: &str, row_key: &str) -> bool {
        self.partition_key_range.contains(partition_key)
            && (self.row_key_range.is_unbounded() || self.row_key_range.contains(row_key))
    }

    pub fn matches_entity(&self, entity: &Entity) -> bool {
        self.matches(entity.partition_key(), entity.row_key())
    }

    /// Filter a key-ordered sequence and apply the result cap
    pub fn evaluate<'a, I>(&'a self, entities: I) -> impl Iterator<Item = Entity> + 'a
    where
        I: IntoIterator<Item = Entity>,
        I::IntoIter: 'a,
    {
        let cap = self.top_count.unwrap_or(usize::MAX);
        entities
            .into_iter()
            .filter(move |e| self.matches_entity(e))
            .take(cap)
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Where the next page of a query resumes (inclusive)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationToken {
    pub next_partition_key: String,
    pub next_row_key: String,
}

/// One page of query results
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub entities: Vec<Entity>,
    pub continuation: Option<ContinuationToken>,
}

/// Anything that serves query pages for a table
pub trait QuerySource: Send + Sync {
    /// Fetch one page. `descriptor.top_count` is the number of results the
    /// caller still needs; sources may return fewer.
    fn fetch_page(
        &self,
        table: &str,
        descriptor: &QueryDescriptor,
        continuation: Option<&ContinuationToken>,
    ) -> Result<Page>;
}
