//! Entries recorded by the message store

use serde::{Deserialize, Serialize};

use skein_core::{Message, PartitionCursor};

/// A message as recorded by the store
///
/// Carries the originating channel name and the partition cursor in effect
/// when the entry was appended. Entries are owned by the store once added
/// and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageStoreEntry {
    channel_name: String,
    cursor: Option<PartitionCursor>,
    message: Message,
}

impl MessageStoreEntry {
    /// Entry taking its cursor from the message header, where the
    /// consumption loop recorded it
    pub fn new(channel_name: impl Into<String>, message: Message) -> Self {
        let cursor = message.header.cursor.clone();
        Self {
            channel_name: channel_name.into(),
            cursor,
            message,
        }
    }

    /// Entry with an explicit cursor
    pub fn with_cursor(
        channel_name: impl Into<String>,
        cursor: PartitionCursor,
        message: Message,
    ) -> Self {
        Self {
            channel_name: channel_name.into(),
            cursor: Some(cursor),
            message,
        }
    }

    /// Channel the message was observed on
    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    /// Cursor in effect when the entry was appended
    pub fn cursor(&self) -> Option<&PartitionCursor> {
        self.cursor.as_ref()
    }

    /// The recorded message
    pub fn message(&self) -> &Message {
        &self.message
    }
}
