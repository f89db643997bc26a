//! Consumption positions over partitioned channels

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Cursor into a single partition of a channel
///
/// The cursor value is opaque to the engine; a transport may encode sequence
/// numbers, byte offsets, or iterator tokens in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionCursor {
    partition_id: String,
    cursor: String,
}

impl PartitionCursor {
    /// Create a cursor for a partition
    pub fn new(partition_id: impl Into<String>, cursor: impl Into<String>) -> Self {
        Self {
            partition_id: partition_id.into(),
            cursor: cursor.into(),
        }
    }

    /// Partition this cursor points into
    pub fn partition_id(&self) -> &str {
        &self.partition_id
    }

    /// Opaque cursor value
    pub fn cursor(&self) -> &str {
        &self.cursor
    }
}

impl fmt::Display for PartitionCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.partition_id, self.cursor)
    }
}

/// Consumption position across all partitions of a channel
///
/// A partition absent from the mapping means "consume from the beginning".
/// Positions are immutable: every update produces a new instance, so they can
/// be shared across tasks without locking. Two positions are equal when their
/// full partition-to-cursor mappings are equal; there is no ordering between
/// positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPosition {
    partitions: BTreeMap<String, PartitionCursor>,
}

impl ChannelPosition {
    /// Position with no cursors: every partition starts at the beginning
    pub fn empty() -> Self {
        Self::default()
    }

    /// Position built from a set of cursors
    ///
    /// Later cursors win when several name the same partition.
    pub fn of(cursors: impl IntoIterator<Item = PartitionCursor>) -> Self {
        let partitions = cursors
            .into_iter()
            .map(|c| (c.partition_id.clone(), c))
            .collect();
        Self { partitions }
    }

    /// Position holding a single partition cursor
    pub fn single(cursor: PartitionCursor) -> Self {
        Self::of([cursor])
    }

    /// Merge with a more recently observed position
    ///
    /// Per partition, `other`'s cursor wins when both sides define it;
    /// partitions present on only one side carry through unchanged.
    #[must_use]
    pub fn merge(&self, other: &ChannelPosition) -> ChannelPosition {
        let mut partitions = self.partitions.clone();
        for (partition_id, cursor) in &other.partitions {
            partitions.insert(partition_id.clone(), cursor.clone());
        }
        ChannelPosition { partitions }
    }

    /// New position with one partition cursor replaced
    #[must_use]
    pub fn with(&self, cursor: PartitionCursor) -> ChannelPosition {
        let mut partitions = self.partitions.clone();
        partitions.insert(cursor.partition_id.clone(), cursor);
        ChannelPosition { partitions }
    }

    /// Cursor for a partition; `None` means "start of partition"
    pub fn cursor(&self, partition_id: &str) -> Option<&PartitionCursor> {
        self.partitions.get(partition_id)
    }

    /// Partition ids with a recorded cursor
    pub fn partition_ids(&self) -> impl Iterator<Item = &str> {
        self.partitions.keys().map(String::as_str)
    }

    /// Whether no partition has a recorded cursor
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Number of partitions with a recorded cursor
    pub fn len(&self) -> usize {
        self.partitions.len()
    }
}

impl fmt::Display for ChannelPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for cursor in self.partitions.values() {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{cursor}")?;
            first = false;
        }
        Ok(())
    }
}
