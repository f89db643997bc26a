//! Error types for skein-compaction

use thiserror::Error;

use skein_core::EventSourceError;

use crate::snapshot::SnapshotError;

/// A compaction run that did not produce a snapshot
///
/// Whatever failed, the state sink is cleared before the error reaches the
/// caller; a failed run never leaves partial compaction state behind.
#[derive(Debug, Error)]
pub enum CompactionError {
    /// The replay aborted before catching up
    #[error("compaction replay failed: {0}")]
    Replay(#[from] EventSourceError),

    /// The snapshot could not be written
    #[error("compaction snapshot failed: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Result type alias for compaction operations
pub type CompactionResult<T> = Result<T, CompactionError>;
