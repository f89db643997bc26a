//! Error types for skein-core

use thiserror::Error;

/// Errors surfaced at the channel transport boundary
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The channel is closed and can no longer be read or written
    #[error("channel closed: {0}")]
    Closed(String),

    /// The named channel is not registered
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    /// The partition id is not part of the channel
    #[error("unknown partition: {0}")]
    UnknownPartition(String),

    /// A cursor value could not be interpreted by this transport
    #[error("invalid cursor {cursor:?} for partition {partition_id}")]
    InvalidCursor {
        partition_id: String,
        cursor: String,
    },

    /// Transport-defined failure; the engine does not interpret it
    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors raised by message consumers during dispatch
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// The payload could not be decoded into the consumer's type
    #[error("payload decode failed: {0}")]
    Decode(String),

    /// The handler rejected or failed to process the message
    #[error("handler failed: {0}")]
    Handler(String),
}

impl From<serde_json::Error> for ConsumerError {
    fn from(e: serde_json::Error) -> Self {
        ConsumerError::Decode(e.to_string())
    }
}

/// Errors aborting an event-source consumption call
///
/// The loop never retries internally; callers resume from the last known-good
/// position.
#[derive(Debug, Error)]
pub enum EventSourceError {
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("consumer error: {0}")]
    Consumer(#[from] ConsumerError),
}

/// Result type alias for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Result type alias for consumer operations
pub type ConsumerResult<T> = Result<T, ConsumerError>;

/// Result type alias for event-source operations
pub type EventSourceResult<T> = Result<T, EventSourceError>;
