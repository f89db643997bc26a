//! In-process channels for testing and single-process deployments
//!
//! An in-memory channel has a single partition (id `"0"`) and uses the
//! message offset as its cursor value: cursor `"n"` means the first `n`
//! messages have been consumed.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::channel::{ChannelReader, ExhaustionBehavior, MessageSender, PartitionIterator, Polled};
use crate::error::{ChannelError, ChannelResult};
use crate::message::Message;
use crate::position::PartitionCursor;

/// Partition id of every in-memory channel
pub const IN_MEMORY_PARTITION: &str = "0";

/// A named, single-partition, append-only in-process channel
pub struct InMemoryChannel {
    name: String,
    messages: RwLock<Vec<Message>>,
}

impl InMemoryChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            messages: RwLock::new(Vec::new()),
        }
    }

    /// Channel name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append one message
    pub fn send(&self, message: Message) -> ChannelResult<()> {
        let mut messages = self
            .messages
            .write()
            .map_err(|_| ChannelError::Closed(self.name.clone()))?;
        messages.push(message);
        Ok(())
    }

    /// Number of messages ever sent to the channel
    pub fn len(&self) -> ChannelResult<usize> {
        let messages = self
            .messages
            .read()
            .map_err(|_| ChannelError::Closed(self.name.clone()))?;
        Ok(messages.len())
    }

    /// Whether the channel has never been written to
    pub fn is_empty(&self) -> ChannelResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Message at an offset, with its estimated time behind the channel head
    fn poll(&self, index: usize) -> ChannelResult<Option<(Message, Duration)>> {
        let messages = self
            .messages
            .read()
            .map_err(|_| ChannelError::Closed(self.name.clone()))?;
        let Some(message) = messages.get(index) else {
            return Ok(None);
        };
        // zero only at the channel head; estimate from arrival times behind it
        let behind_latest = if index + 1 == messages.len() {
            Duration::ZERO
        } else {
            messages
                .last()
                .map(|newest| newest.header.arrival - message.header.arrival)
                .and_then(|delta| delta.to_std().ok())
                .unwrap_or_default()
                .max(Duration::from_nanos(1))
        };
        Ok(Some((message.clone(), behind_latest)))
    }
}

/// Iterator over the single partition of an in-memory channel
pub struct InMemoryPartitionIterator {
    channel: Arc<InMemoryChannel>,
    next_index: usize,
}

#[async_trait]
impl PartitionIterator for InMemoryPartitionIterator {
    fn partition_id(&self) -> &str {
        IN_MEMORY_PARTITION
    }

    async fn poll_next(&mut self) -> ChannelResult<Polled> {
        match self.channel.poll(self.next_index)? {
            Some((message, behind_latest)) => {
                self.next_index += 1;
                Ok(Polled {
                    message: Some(message),
                    cursor: self.next_index.to_string(),
                    behind_latest,
                })
            }
            None => Ok(Polled {
                message: None,
                cursor: self.next_index.to_string(),
                behind_latest: Duration::ZERO,
            }),
        }
    }
}

/// Reader over an in-memory channel
///
/// Polling empty means the channel is drained: this reader returns rather
/// than keep polling, so `consume_all` reports exhaustion once every sent
/// message has been dispatched.
pub struct InMemoryChannelReader {
    channel: Arc<InMemoryChannel>,
}

impl InMemoryChannelReader {
    pub fn new(channel: Arc<InMemoryChannel>) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl ChannelReader for InMemoryChannelReader {
    fn channel_name(&self) -> &str {
        self.channel.name()
    }

    async fn partitions(&self) -> ChannelResult<Vec<String>> {
        Ok(vec![IN_MEMORY_PARTITION.to_string()])
    }

    async fn open(
        &self,
        partition_id: &str,
        from: Option<&PartitionCursor>,
    ) -> ChannelResult<Box<dyn PartitionIterator>> {
        if partition_id != IN_MEMORY_PARTITION {
            return Err(ChannelError::UnknownPartition(partition_id.to_string()));
        }
        let next_index = match from {
            Some(cursor) => {
                cursor
                    .cursor()
                    .parse::<usize>()
                    .map_err(|_| ChannelError::InvalidCursor {
                        partition_id: partition_id.to_string(),
                        cursor: cursor.cursor().to_string(),
                    })?
            }
            None => 0,
        };
        Ok(Box::new(InMemoryPartitionIterator {
            channel: self.channel.clone(),
            next_index,
        }))
    }

    fn on_exhausted(&self) -> ExhaustionBehavior {
        ExhaustionBehavior::Return
    }
}

/// Sender appending to an in-memory channel
pub struct InMemoryMessageSender {
    channel: Arc<InMemoryChannel>,
}

impl InMemoryMessageSender {
    pub fn new(channel: Arc<InMemoryChannel>) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl MessageSender for InMemoryMessageSender {
    fn channel_name(&self) -> &str {
        self.channel.name()
    }

    async fn send(&self, message: Message) -> ChannelResult<()> {
        self.channel.send(message)
    }
}

/// Registry of named in-process channels
///
/// Owned by the composition root and passed explicitly to every component
/// that resolves channels by name; never a hidden global.
#[derive(Default)]
pub struct InMemoryChannels {
    channels: DashMap<String, Arc<InMemoryChannel>>,
}

impl InMemoryChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel by name, created on first use
    pub fn channel(&self, name: &str) -> Arc<InMemoryChannel> {
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(channel = %name, "creating in-memory channel");
                Arc::new(InMemoryChannel::new(name))
            })
            .clone()
    }

    /// Channel by name, if it exists
    pub fn get(&self, name: &str) -> Option<Arc<InMemoryChannel>> {
        self.channels.get(name).map(|c| c.clone())
    }

    /// Reader over the named channel, creating the channel on first use
    pub fn reader(&self, name: &str) -> InMemoryChannelReader {
        InMemoryChannelReader::new(self.channel(name))
    }

    /// Sender into the named channel, creating the channel on first use
    pub fn sender(&self, name: &str) -> InMemoryMessageSender {
        InMemoryMessageSender::new(self.channel(name))
    }

    /// Names of every registered channel
    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn message(key: &str, payload: &str) -> Message {
        Message::new(key, Bytes::copy_from_slice(payload.as_bytes()))
    }

    #[tokio::test]
    async fn test_poll_in_send_order_with_offset_cursors() {
        let channel = Arc::new(InMemoryChannel::new("orders"));
        channel.send(message("k1", "one")).unwrap();
        channel.send(message("k2", "two")).unwrap();

        let reader = InMemoryChannelReader::new(channel);
        let mut iterator = reader.open(IN_MEMORY_PARTITION, None).await.unwrap();

        let first = iterator.poll_next().await.unwrap();
        assert_eq!(first.message.unwrap().key, "k1");
        assert_eq!(first.cursor, "1");

        let second = iterator.poll_next().await.unwrap();
        assert_eq!(second.message.unwrap().key, "k2");
        assert_eq!(second.cursor, "2");
        assert_eq!(second.behind_latest, Duration::ZERO);

        let drained = iterator.poll_next().await.unwrap();
        assert!(drained.message.is_none());
        assert_eq!(drained.cursor, "2");
    }

    #[tokio::test]
    async fn test_resume_from_cursor() {
        let channel = Arc::new(InMemoryChannel::new("orders"));
        channel.send(message("k1", "one")).unwrap();
        channel.send(message("k2", "two")).unwrap();

        let reader = InMemoryChannelReader::new(channel);
        let cursor = PartitionCursor::new(IN_MEMORY_PARTITION, "1");
        let mut iterator = reader
            .open(IN_MEMORY_PARTITION, Some(&cursor))
            .await
            .unwrap();

        let polled = iterator.poll_next().await.unwrap();
        assert_eq!(polled.message.unwrap().key, "k2");
    }

    #[tokio::test]
    async fn test_open_rejects_unknown_partition() {
        let reader = InMemoryChannelReader::new(Arc::new(InMemoryChannel::new("orders")));

        let err = reader.open("7", None).await.err().unwrap();
        assert!(matches!(err, ChannelError::UnknownPartition(_)));
    }

    #[tokio::test]
    async fn test_open_rejects_malformed_cursor() {
        let reader = InMemoryChannelReader::new(Arc::new(InMemoryChannel::new("orders")));
        let cursor = PartitionCursor::new(IN_MEMORY_PARTITION, "not-a-number");

        let err = reader
            .open(IN_MEMORY_PARTITION, Some(&cursor))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ChannelError::InvalidCursor { .. }));
    }

    #[tokio::test]
    async fn test_registry_shares_channels_by_name() {
        let channels = InMemoryChannels::new();

        let sender = channels.sender("orders");
        sender.send(message("k1", "one")).await.unwrap();

        assert_eq!(channels.channel("orders").len().unwrap(), 1);
        assert!(channels.get("unseen").is_none());
        assert_eq!(channels.channel_names(), vec!["orders".to_string()]);
    }
}
