//! Configuration for TableKV
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::entity::ReservedPropertyHandling;
use crate::operation::ConflictHandling;
use crate::remote::RetryPolicy;

/// Main configuration shared by sessions, providers and engines
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Write Configuration
    // -------------------------------------------------------------------------
    /// Conflict handling used by provider calls that don't name one
    pub conflict_handling: ConflictHandling,

    /// What to do when a dynamic item carries `PartitionKey`, `RowKey`,
    /// `Timestamp` or `ETag` as ordinary properties
    pub reserved_properties: ReservedPropertyHandling,

    // -------------------------------------------------------------------------
    // Read Configuration
    // -------------------------------------------------------------------------
    /// Keep the ETag on entities returned by schema-less queries
    pub include_etag_for_dynamic: bool,

    /// Max entities per page served by the in-memory engine
    pub page_size: usize,

    // -------------------------------------------------------------------------
    // Networked Backend Configuration
    // -------------------------------------------------------------------------
    /// Retry policy for transient backend failures
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            conflict_handling: ConflictHandling::Throw,
            reserved_properties: ReservedPropertyHandling::Throw,
            include_etag_for_dynamic: false,
            page_size: 1000,
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the default conflict handling
    pub fn conflict_handling(mut self, handling: ConflictHandling) -> Self {
        self.config.conflict_handling = handling;
        self
    }

    /// Set how reserved property names on dynamic items are treated
    pub fn reserved_properties(mut self, handling: ReservedPropertyHandling) -> Self {
        self.config.reserved_properties = handling;
        self
    }

    /// Keep ETags on schema-less query results
    pub fn include_etag_for_dynamic(mut self, include: bool) -> Self {
        self.config.include_etag_for_dynamic = include;
        self
    }

    /// Set the in-memory page size (clamped to at least 1)
    pub fn page_size(mut self, size: usize) -> Self {
        self.config.page_size = size.max(1);
        self
    }

    /// Replace the whole retry policy
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    /// Set the maximum number of attempts for one backend call
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts.max(1);
        self
    }

    /// Set the delay before the first retry
    pub fn initial_backoff(mut self, delay: Duration) -> Self {
        self.config.retry.initial_backoff = delay;
        self
    }

    /// Set the upper bound on a single retry delay
    pub fn max_backoff(mut self, delay: Duration) -> Self {
        self.config.retry.max_backoff = delay;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
