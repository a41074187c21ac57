//! Query builder
//!
//! Every call returns a new query; the receiver is never modified, so a
//! partially built query can be reused. The stage parameter decides which
//! filters are still available, so `partition_key_equals(..)` followed by
//! another partition filter does not compile.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::entity::Entity;
use crate::error::Result;

use super::{KeyBound, KeyRange, Pages, PartialResult, QueryDescriptor, QueryIter, QuerySource};

// =============================================================================
// Stages
// =============================================================================

/// No filter applied yet
#[derive(Debug, Clone, Copy)]
pub struct Unfiltered;

/// Partition lower bound set; only an upper bound may follow
#[derive(Debug, Clone, Copy)]
pub struct PartitionLowBounded;

/// Partition filter complete; row filters may follow
#[derive(Debug, Clone, Copy)]
pub struct PartitionSet;

/// Row lower bound set; only a row upper bound may follow
#[derive(Debug, Clone, Copy)]
pub struct RowLowBounded;

/// No further key filters
#[derive(Debug, Clone, Copy)]
pub struct Complete;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Unfiltered {}
    impl Sealed for super::PartitionSet {}
}

/// Stages that still accept row key filters
pub trait RowFilterable: sealed::Sealed {}
impl RowFilterable for Unfiltered {}
impl RowFilterable for PartitionSet {}

// =============================================================================
// TableQuery
// =============================================================================

/// A query against one table
pub struct TableQuery<S> {
    source: Arc<dyn QuerySource>,
    table: String,
    include_etag: bool,
    descriptor: QueryDescriptor,
    _stage: PhantomData<S>,
}

impl<S> Clone for TableQuery<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            table: self.table.clone(),
            include_etag: self.include_etag,
            descriptor: self.descriptor.clone(),
            _stage: PhantomData,
        }
    }
}

impl<S> fmt::Debug for TableQuery<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableQuery")
            .field("table", &self.table)
            .field("include_etag", &self.include_etag)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

impl TableQuery<Unfiltered> {
    /// Start a query against any page source
    pub fn new(source: Arc<dyn QuerySource>, table: impl Into<String>, include_etag: bool) -> Self {
        Self {
            source,
            table: table.into(),
            include_etag,
            descriptor: QueryDescriptor::default(),
            _stage: PhantomData,
        }
    }

    /// Restrict to exactly one partition
    pub fn partition_key_equals(&self, value: impl Into<String>) -> TableQuery<PartitionSet> {
        let mut next = self.advance();
        next.descriptor.partition_key_range = KeyRange::exact(value);
        next
    }

    /// Start a partition range
    pub fn partition_key_from(&self, value: impl Into<String>) -> BoundChoice<PartitionLowBounded> {
        BoundChoice::new(self.advance(), BoundTarget::PartitionLower, value.into())
    }

    /// Partition range open at the bottom
    pub fn partition_key_to(&self, value: impl Into<String>) -> BoundChoice<PartitionSet> {
        BoundChoice::new(self.advance(), BoundTarget::PartitionUpper, value.into())
    }
}

impl TableQuery<PartitionLowBounded> {
    /// Close the partition range
    pub fn partition_key_to(&self, value: impl Into<String>) -> BoundChoice<PartitionSet> {
        BoundChoice::new(self.advance(), BoundTarget::PartitionUpper, value.into())
    }
}

impl<S: RowFilterable> TableQuery<S> {
    /// Restrict to exactly one row key
    pub fn row_key_equals(&self, value: impl Into<String>) -> TableQuery<Complete> {
        let mut next = self.advance();
        next.descriptor.row_key_range = KeyRange::exact(value);
        next
    }

    /// Start a row range
    pub fn row_key_from(&self, value: impl Into<String>) -> BoundChoice<RowLowBounded> {
        BoundChoice::new(self.advance(), BoundTarget::RowLower, value.into())
    }

    /// Row range open at the bottom
    pub fn row_key_to(&self, value: impl Into<String>) -> BoundChoice<Complete> {
        BoundChoice::new(self.advance(), BoundTarget::RowUpper, value.into())
    }
}

impl TableQuery<RowLowBounded> {
    /// Close the row range
    pub fn row_key_to(&self, value: impl Into<String>) -> BoundChoice<Complete> {
        BoundChoice::new(self.advance(), BoundTarget::RowUpper, value.into())
    }
}

impl<S> TableQuery<S> {
    fn advance<N>(&self) -> TableQuery<N> {
        TableQuery {
            source: Arc::clone(&self.source),
            table: self.table.clone(),
            include_etag: self.include_etag,
            descriptor: self.descriptor.clone(),
            _stage: PhantomData,
        }
    }

    /// Cap the number of results
    pub fn top(&self, count: usize) -> TableQuery<Complete> {
        let mut next = self.advance();
        next.descriptor.top_count = Some(count);
        next
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    /// Lazily fetched pages
    pub fn pages(&self) -> Pages {
        Pages::new(
            Arc::clone(&self.source),
            self.table.clone(),
            self.descriptor.clone(),
            self.include_etag,
        )
    }

    /// Lazily merged results
    pub fn iter(&self) -> QueryIter {
        QueryIter::new(self.pages())
    }

    /// Fetch only the first page
    pub fn first_page(&self) -> Result<PartialResult> {
        PartialResult::first(self.pages())
    }

    /// Fetch every result, merging pages until exhausted or capped
    pub fn execute(&self) -> Result<Vec<Entity>> {
        self.iter().collect()
    }
}

// =============================================================================
// Bound Choice
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum BoundTarget {
    PartitionLower,
    PartitionUpper,
    RowLower,
    RowUpper,
}

/// A key bound awaiting its inclusivity
#[derive(Debug)]
#[must_use = "a bound is only applied by calling inclusive() or exclusive()"]
pub struct BoundChoice<N> {
    query: TableQuery<N>,
    target: BoundTarget,
    value: String,
}

impl<N> BoundChoice<N> {
    fn new(query: TableQuery<N>, target: BoundTarget, value: String) -> Self {
        Self { query, target, value }
    }

    pub fn inclusive(self) -> TableQuery<N> {
        self.apply(true)
    }

    pub fn exclusive(self) -> TableQuery<N> {
        self.apply(false)
    }

    fn apply(self, inclusive: bool) -> TableQuery<N> {
        let Self {
            mut query,
            target,
            value,
        } = self;
        let bound = Some(KeyBound { value, inclusive });
        let descriptor = &mut query.descriptor;
        match target {
            BoundTarget::PartitionLower => descriptor.partition_key_range.lower = bound,
            BoundTarget::PartitionUpper => descriptor.partition_key_range.upper = bound,
            BoundTarget::RowLower => descriptor.row_key_range.lower = bound,
            BoundTarget::RowUpper => descriptor.row_key_range.upper = bound,
        }
        query
    }
}
