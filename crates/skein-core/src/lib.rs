//! # Skein Core
//!
//! Core abstractions for consuming partitioned, append-only message
//! channels: resumable positions, ordered dispatch, and a stop-condition
//! driven consumption loop.
//!
//! ## Pieces
//!
//! - [`ChannelPosition`]/[`PartitionCursor`]: immutable per-partition
//!   consumption positions with merge semantics
//! - [`MessageDispatcher`]: registration-ordered fan-out to
//!   [`MessageConsumer`]s selected by [`KeyPattern`]
//! - [`EventSource`]: the consumption loop over an abstract
//!   [`ChannelReader`], bounded by [`StopCondition`]s
//! - [`InMemoryChannels`](channel::inmemory::InMemoryChannels): in-process
//!   channels for tests and single-process deployments
//! - [`StateRepository`]: the key-value sink compaction replays into
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use skein_core::channel::inmemory::InMemoryChannels;
//! use skein_core::{ChannelPosition, EventSource, FnMessageConsumer, KeyPattern, stop};
//!
//! let channels = InMemoryChannels::new();
//! channels.sender("orders").send(message).await?;
//!
//! let mut source = EventSource::new("orders-source", Arc::new(channels.reader("orders")));
//! source.register(Arc::new(FnMessageConsumer::new(KeyPattern::Any, |message| async move {
//!     println!("{}", message.key);
//!     Ok(())
//! })));
//!
//! let position = source.consume_all(ChannelPosition::empty(), stop::on_empty_poll()).await?;
//! ```

pub mod channel;
pub mod clock;
pub mod consumer;
pub mod dispatcher;
pub mod error;
pub mod eventsource;
pub mod message;
pub mod notification;
pub mod position;
pub mod state;

// Re-exports
pub use channel::{ChannelReader, ExhaustionBehavior, MessageSender, PartitionIterator, Polled};
pub use clock::{Clock, SystemClock};
pub use consumer::{DecodingConsumer, FnMessageConsumer, KeyPattern, MessageConsumer};
pub use dispatcher::MessageDispatcher;
pub use error::{
    ChannelError, ChannelResult, ConsumerError, ConsumerResult, EventSourceError,
    EventSourceResult,
};
pub use eventsource::{stop, EventSource, EventSourceBuilder, EventSourceFactory, StopCondition};
pub use message::{Header, Message, DEFAULT_CONTENT_TYPE};
pub use notification::{EventSourceNotification, EventSourceStatus, LifecycleNotifier};
pub use position::{ChannelPosition, PartitionCursor};
pub use state::{InMemoryStateRepository, StateConsumer, StateRepository};
