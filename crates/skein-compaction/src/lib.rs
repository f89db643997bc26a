//! # Skein Compaction
//!
//! Bounded-to-now channel replay: a [`CompactionService`] rebuilds a
//! channel's derived state in a
//! [`StateRepository`](skein_core::StateRepository) and persists it through a
//! [`SnapshotWriter`] together with the position the replay reached. Because
//! the replay stops once every partition catches up, compaction completes
//! even though the underlying channel is unbounded.
//!
//! Resuming consumption from a snapshot means loading its entries, then
//! calling
//! [`consume_all`](skein_core::EventSource::consume_all) from the snapshot's
//! position.

pub mod error;
pub mod service;
pub mod snapshot;

// Re-exports
pub use error::{CompactionError, CompactionResult};
pub use service::CompactionService;
pub use snapshot::{
    FileSnapshotConfig, FileSnapshotWriter, InMemorySnapshotWriter, Snapshot, SnapshotDescriptor,
    SnapshotError, SnapshotWriter,
};
