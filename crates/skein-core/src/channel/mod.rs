//! Partitioned-channel reader and sender abstractions
//!
//! Concrete transports implement these traits; the event source drives them
//! without knowing the transport. Transport-level retry and backoff live
//! inside the implementations, never in the consumption loop.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ChannelResult;
use crate::message::Message;
use crate::position::PartitionCursor;

pub mod inmemory;

/// One poll result from a partition iterator
#[derive(Debug, Clone)]
pub struct Polled {
    /// The next message, or `None` when nothing is available right now
    pub message: Option<Message>,
    /// Resume cursor for the partition after this poll
    pub cursor: String,
    /// Estimated time behind the newest record of the partition
    pub behind_latest: Duration,
}

/// What the consumption loop does when a full polling sweep finds no message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustionBehavior {
    /// The channel has no further data to expect; the loop returns
    Return,
    /// More data may arrive; pause, then poll again
    Backoff(Duration),
}

/// Cursor-addressable iterator over one partition of a channel
#[async_trait]
pub trait PartitionIterator: Send {
    /// Partition this iterator reads
    fn partition_id(&self) -> &str;

    /// Pull the next record, advancing the iterator
    ///
    /// The returned cursor is always the partition's resume point after this
    /// poll, whether or not a message was available.
    async fn poll_next(&mut self) -> ChannelResult<Polled>;
}

/// Reader side of a partitioned, append-only channel
#[async_trait]
pub trait ChannelReader: Send + Sync {
    /// Name of the channel this reader consumes
    fn channel_name(&self) -> &str;

    /// Partition ids, in stable order
    async fn partitions(&self) -> ChannelResult<Vec<String>>;

    /// Open an iterator on one partition
    ///
    /// `from` is the resume cursor of a previous consumption; `None` starts
    /// at the beginning of the partition.
    async fn open(
        &self,
        partition_id: &str,
        from: Option<&PartitionCursor>,
    ) -> ChannelResult<Box<dyn PartitionIterator>>;

    /// Behavior when a full polling sweep yields no message
    ///
    /// Each reader documents its own choice; test channels return, tailing
    /// transports back off and keep polling.
    fn on_exhausted(&self) -> ExhaustionBehavior {
        ExhaustionBehavior::Return
    }
}

/// Sender side of a channel
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Name of the channel this sender writes to
    fn channel_name(&self) -> &str;

    /// Append one message to the channel
    async fn send(&self, message: Message) -> ChannelResult<()>;

    /// Append a batch of messages, in order
    async fn send_batch(&self, messages: Vec<Message>) -> ChannelResult<()> {
        for message in messages {
            self.send(message).await?;
        }
        Ok(())
    }
}
