//! # Store
//!
//! Persistence backends for the revalidation pipeline.
//!
//! - [`MemoryEventStore`], [`MemoryStateStore`], [`MemoryQueue`]: process-local,
//!   used by tests and ephemeral runs
//! - [`SqliteStore`]: one SQLite database implementing all three traits
//!
//! Every backend implements the traits from `contracts`, so callers hold
//! `Arc<dyn EventStore>` / `Arc<dyn StateStore>` / `Arc<dyn RetryQueue>`.

mod memory;
mod sqlite;

pub use contracts::{EventStore, RetryQueue, StateStore};
pub use memory::{MemoryEventStore, MemoryQueue, MemoryStateStore};
pub use sqlite::SqliteStore;
