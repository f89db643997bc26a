//! Error types for skein-store

use thiserror::Error;

/// Errors raised by the message store
#[derive(Debug, Error)]
pub enum StoreError {
    /// A writer panicked while holding the store lock
    #[error("message store lock poisoned")]
    LockPoisoned,
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
