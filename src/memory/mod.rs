//! Memory Module
//!
//! In-process emulation of the networked table store, with the same
//! consistency and isolation semantics.
//!
//! ## Responsibilities
//! - Hold `Account → Table → Partition → Entity`, created lazily
//! - Serialize writes per partition; run different partitions concurrently
//! - Detect version conflicts through ETags
//! - Apply atomic batches to a copy and publish it only on full success
//!
//! ## Data Structure Choice
//! BTreeMaps at every level keep keys ordered, which range queries need.
//! Children sit behind `Arc`, so an atomic batch copies the path to its one
//! partition and readers holding the previous account keep a stable view.

mod account;
mod partition;
mod storage;

pub use account::{Account, Table};
pub use partition::Partition;
pub use storage::{MemoryStorage, StorageSnapshot};
