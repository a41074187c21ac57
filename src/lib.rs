//! # TableKV
//!
//! Partitioned table storage with:
//! - Entities addressed by (table, partition key, row key)
//! - Deferred writes committed individually, in batches, or atomically
//! - Optimistic concurrency through ETags
//! - An in-memory engine with the same semantics as the networked adapter
//! - Typed, lazily paged range queries
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │            TableStorageProvider / Shell (callers)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Session                               │
//! │        (OperationBuffer → commit planner, TableQuery)        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  StorageEngine / QuerySource
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Memory    │          │   Remote    │
//!   │ (RwLock/Arc)│          │ (retrying)  │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │TableBackend │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod key;
pub mod entity;
pub mod operation;
pub mod query;
pub mod engine;
pub mod memory;
pub mod remote;
pub mod session;
pub mod provider;
pub mod shell;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{TableError, Result};
pub use config::Config;
pub use engine::{CommitReport, StorageEngine};
pub use entity::{ETag, Entity, Item, PropertyMap, PropertyValue, TableEntity};
pub use memory::MemoryStorage;
pub use operation::{ConflictHandling, Execute};
pub use provider::TableStorageProvider;
pub use remote::{RemoteStorage, RetryPolicy, TableBackend};
pub use session::Session;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of TableKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
