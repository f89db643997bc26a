//! Dispatcher-registered feed into a message store

use std::sync::Arc;

use async_trait::async_trait;

use skein_core::{ConsumerError, ConsumerResult, KeyPattern, Message, MessageConsumer};

use crate::entry::MessageStoreEntry;
use crate::store::MessageStore;

/// Consumer appending every observed message into a shared message store
///
/// Register one with an event source to materialize a channel: each
/// dispatched message lands in the store tagged with the channel name and
/// the cursor the consumption loop recorded in its header.
pub struct StoreConsumer {
    pattern: KeyPattern,
    channel_name: String,
    store: Arc<MessageStore>,
}

impl StoreConsumer {
    /// Catch-all store feed for a channel
    pub fn new(channel_name: impl Into<String>, store: Arc<MessageStore>) -> Self {
        Self {
            pattern: KeyPattern::Any,
            channel_name: channel_name.into(),
            store,
        }
    }
}

#[async_trait]
impl MessageConsumer for StoreConsumer {
    fn key_pattern(&self) -> &KeyPattern {
        &self.pattern
    }

    async fn accept(&self, message: &Message) -> ConsumerResult<()> {
        let entry = MessageStoreEntry::new(&self.channel_name, message.clone());
        self.store
            .add(entry)
            .map_err(|e| ConsumerError::Handler(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use skein_core::{Header, PartitionCursor};

    use super::*;

    #[tokio::test]
    async fn test_appends_observed_messages_with_cursor() {
        let store = Arc::new(MessageStore::new());
        let consumer = StoreConsumer::new("orders", store.clone());

        let header = Header::response(
            PartitionCursor::new("0", "1"),
            chrono::Utc::now(),
            std::time::Duration::ZERO,
        );
        let message = Message::with_header("k1", header, Bytes::from_static(b"{}"));
        consumer.accept(&message).await.unwrap();

        assert_eq!(store.size().unwrap(), 1);
        let position = store.latest_channel_position("orders").unwrap();
        assert_eq!(position.cursor("0").unwrap().cursor(), "1");
    }
}
