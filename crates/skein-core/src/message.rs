//! Messages and headers exchanged over channels

use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::position::PartitionCursor;

/// Content type assumed for payloads unless a sender says otherwise
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Metadata travelling with a message
///
/// The cursor slot and the behind-latest estimate are filled in by the
/// consumption loop once the message has been read from a partition; senders
/// leave them unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Cursor in effect when the message was read from its partition
    pub cursor: Option<PartitionCursor>,
    /// When the message entered the channel
    pub arrival: DateTime<Utc>,
    /// Reported time behind the newest record of the partition
    pub behind_latest: Option<Duration>,
    /// Free-form transport attributes
    pub attributes: BTreeMap<String, String>,
}

impl Header {
    /// Header stamped with the current wall-clock time
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Header with an explicit arrival time
    pub fn at(arrival: DateTime<Utc>) -> Self {
        Self {
            cursor: None,
            arrival,
            behind_latest: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Header describing a record read from a partition
    pub fn response(
        cursor: PartitionCursor,
        arrival: DateTime<Utc>,
        behind_latest: Duration,
    ) -> Self {
        Self {
            cursor: Some(cursor),
            arrival,
            behind_latest: Some(behind_latest),
            attributes: BTreeMap::new(),
        }
    }

    /// Partition the message was read from, once known
    pub fn partition_id(&self) -> Option<&str> {
        self.cursor.as_ref().map(PartitionCursor::partition_id)
    }

    /// Look up a transport attribute
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Add a transport attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// A single message as produced by senders and observed by consumers
///
/// Messages are never mutated after creation; the consumption loop produces a
/// decorated copy when it fills in receipt metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Routing and state key
    pub key: String,
    /// Receipt metadata
    pub header: Header,
    /// Opaque payload; empty payloads are tombstones
    pub payload: Bytes,
    /// MIME-style content type of the payload
    pub content_type: String,
}

impl Message {
    /// Message with a freshly stamped header and the default content type
    pub fn new(key: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self::with_header(key, Header::new(), payload)
    }

    /// Message with an explicit header
    pub fn with_header(
        key: impl Into<String>,
        header: Header,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            key: key.into(),
            header,
            payload: payload.into(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    /// Override the content type
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Whether this message deletes its key in state-applying consumers
    pub fn is_tombstone(&self) -> bool {
        self.payload.is_empty()
    }
}
