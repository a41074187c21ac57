//! Page merging
//!
//! Sources answer in pages. `Pages` fetches them one at a time on demand and
//! stops as soon as the descriptor's `top_count` has been produced, so an
//! unbounded source is never over-fetched.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::entity::Entity;
use crate::error::Result;

use super::{ContinuationToken, QueryDescriptor, QuerySource};

/// Lazy iterator over result pages
pub struct Pages {
    source: Arc<dyn QuerySource>,
    table: String,
    descriptor: QueryDescriptor,
    include_etag: bool,
    continuation: Option<ContinuationToken>,
    produced: usize,
    pages_fetched: usize,
    exhausted: bool,
}

impl Pages {
    pub(crate) fn new(
        source: Arc<dyn QuerySource>,
        table: String,
        descriptor: QueryDescriptor,
        include_etag: bool,
    ) -> Self {
        let exhausted = descriptor.is_empty();
        Self {
            source,
            table,
            descriptor,
            include_etag,
            continuation: None,
            produced: 0,
            pages_fetched: 0,
            exhausted,
        }
    }

    /// Results still wanted before the cap is met
    fn remaining(&self) -> Option<usize> {
        self.descriptor
            .top_count
            .map(|top| top.saturating_sub(self.produced))
    }

    /// True while another page may yield results
    pub fn has_more(&self) -> bool {
        !self.exhausted && self.remaining() != Some(0)
    }

    /// Number of pages requested from the source so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}

impl Iterator for Pages {
    type Item = Result<Vec<Entity>>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_more() {
            return None;
        }

        let remaining = self.remaining();
        let mut request = self.descriptor.clone();
        request.top_count = remaining;

        self.pages_fetched += 1;
        let page = match self
            .source
            .fetch_page(&self.table, &request, self.continuation.as_ref())
        {
            Ok(page) => page,
            Err(e) => {
                self.exhausted = true;
                return Some(Err(e));
            }
        };

        let cap = remaining.unwrap_or(usize::MAX);
        let include_etag = self.include_etag;
        let entities: Vec<Entity> = page
            .entities
            .into_iter()
            .filter(|e| self.descriptor.matches_entity(e))
            .take(cap)
            .map(|mut e| {
                if !include_etag {
                    e.set_etag(None);
                }
                e
            })
            .collect();

        self.produced += entities.len();
        self.continuation = page.continuation;
        if self.continuation.is_none() {
            self.exhausted = true;
        }

        tracing::trace!(
            table = %self.table,
            page = self.pages_fetched,
            results = entities.len(),
            more = self.has_more(),
            "query page merged"
        );

        Some(Ok(entities))
    }
}

/// Lazy iterator over individual results, pulling pages on demand
pub struct QueryIter {
    pages: Pages,
    buffer: VecDeque<Entity>,
}

impl QueryIter {
    pub(crate) fn new(pages: Pages) -> Self {
        Self {
            pages,
            buffer: VecDeque::new(),
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages.pages_fetched()
    }
}

impl Iterator for QueryIter {
    type Item = Result<Entity>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entity) = self.buffer.pop_front() {
                return Some(Ok(entity));
            }
            match self.pages.next()? {
                Ok(page) => self.buffer.extend(page),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// One page of results plus the means to fetch the rest
pub struct PartialResult {
    entities: Vec<Entity>,
    rest: Pages,
}

impl PartialResult {
    pub(crate) fn first(mut pages: Pages) -> Result<Self> {
        let entities = pages.next().transpose()?.unwrap_or_default();
        Ok(Self { entities, rest: pages })
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn into_entities(self) -> Vec<Entity> {
        self.entities
    }

    pub fn has_more_results(&self) -> bool {
        self.rest.has_more()
    }

    /// Fetch the following page, or `None` when the query is complete
    pub fn next_page(mut self) -> Result<Option<PartialResult>> {
        match self.rest.next().transpose()? {
            Some(entities) => Ok(Some(Self {
                entities,
                rest: self.rest,
            })),
            None => Ok(None),
        }
    }

    /// Merge this page with every following one, stopping once capped
    pub fn flatten(self) -> Result<Vec<Entity>> {
        let Self { mut entities, rest } = self;
        for page in rest {
            entities.extend(page?);
        }
        Ok(entities)
    }
}
