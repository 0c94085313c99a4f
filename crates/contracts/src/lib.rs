//! # Contracts
//!
//! Frozen interface contracts shared by every revalidator crate: configuration
//! records, dispatch metadata, event-log rows, queue items and the storage /
//! secret-store traits. Business crates depend on this crate only, never on
//! each other in reverse.
//!
//! ## Time Model
//! - Attempts are stamped with wall-clock UTC (`chrono::DateTime<Utc>`)
//! - Attempt ids are monotonic and break ties between equal timestamps

mod attempt;
mod config;
mod entity;
mod error;
mod frontend;
mod meta;
mod queue;
mod store;

pub use attempt::*;
pub use config::*;
pub use entity::*;
pub use error::*;
pub use frontend::*;
pub use meta::*;
pub use queue::*;
pub use store::*;
