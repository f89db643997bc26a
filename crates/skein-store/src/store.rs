//! Concurrent, insertion-ordered message store with named indexes

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use tracing::trace;

use skein_core::ChannelPosition;

use crate::entry::MessageStoreEntry;
use crate::error::{StoreError, StoreResult};
use crate::indexer::{Index, Indexer, NoOpIndexer};

/// In-memory record of every message added to it, in insertion order, with
/// point-in-time index views and per-channel position tracking
///
/// All mutation happens under the exclusive write lock; reads share the read
/// lock. Nothing is evicted: compaction, not eviction, is the mechanism that
/// bounds history. `stream` methods return a snapshot taken at call time, so
/// concurrent `add`s never corrupt or skip entries an iteration has already
/// yielded.
pub struct MessageStore {
    inner: RwLock<StoreInner>,
    indexer: Box<dyn Indexer>,
}

#[derive(Default)]
struct StoreInner {
    entries: Vec<Arc<MessageStoreEntry>>,
    indexes: HashMap<(Index, String), Vec<Arc<MessageStoreEntry>>>,
    positions: HashMap<String, ChannelPosition>,
}

impl MessageStore {
    /// Store without indexes
    pub fn new() -> Self {
        Self::with_indexer(Box::new(NoOpIndexer))
    }

    /// Store maintaining the indexes implied by `indexer`
    pub fn with_indexer(indexer: Box<dyn Indexer>) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            indexer,
        }
    }

    /// Append an entry to the log, its index sub-sequences, and the
    /// channel's merged position
    pub fn add(&self, entry: MessageStoreEntry) -> StoreResult<()> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        let entry = Arc::new(entry);

        for (index, value) in self.indexer.index(&entry) {
            inner
                .indexes
                .entry((index, value))
                .or_default()
                .push(entry.clone());
        }

        if let Some(cursor) = entry.cursor() {
            let merged = inner
                .positions
                .get(entry.channel_name())
                .cloned()
                .unwrap_or_default()
                .with(cursor.clone());
            inner
                .positions
                .insert(entry.channel_name().to_string(), merged);
        }

        trace!(channel = %entry.channel_name(), key = %entry.message().key, "added entry");
        inner.entries.push(entry);
        Ok(())
    }

    /// Entries in insertion order, snapshot taken at call time
    pub fn stream(&self) -> StoreResult<Vec<Arc<MessageStoreEntry>>> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.entries.clone())
    }

    /// Entries of one index sub-sequence, in main-log order; an unknown
    /// index key yields an empty sequence
    pub fn stream_index(&self, index: &Index, value: &str) -> StoreResult<Vec<Arc<MessageStoreEntry>>> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner
            .indexes
            .get(&(index.clone(), value.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    /// Merged position for a channel; empty if nothing has been added for it
    pub fn latest_channel_position(&self, channel_name: &str) -> StoreResult<ChannelPosition> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner
            .positions
            .get(channel_name)
            .cloned()
            .unwrap_or_default())
    }

    /// Number of entries in the main log
    pub fn size(&self) -> StoreResult<usize> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.entries.len())
    }

    /// Every channel name observed so far
    pub fn channel_names(&self) -> StoreResult<BTreeSet<String>> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner
            .entries
            .iter()
            .map(|e| e.channel_name().to_string())
            .collect())
    }

    /// The indexes this store maintains
    pub fn indexes(&self) -> Vec<Index> {
        self.indexer.indexes()
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use skein_core::{Header, Message, PartitionCursor};

    use crate::indexer::{AttributeIndexer, CompositeIndexer};

    use super::*;

    fn entry(channel: &str, key: &str, cursor: PartitionCursor) -> MessageStoreEntry {
        MessageStoreEntry::with_cursor(
            channel,
            cursor,
            Message::new(key, Bytes::from_static(b"{}")),
        )
    }

    #[test]
    fn test_append_only_in_call_order() {
        let store = MessageStore::new();
        for i in 0..5 {
            store
                .add(entry(
                    "orders",
                    &format!("k{i}"),
                    PartitionCursor::new("p1", i.to_string()),
                ))
                .unwrap();
        }

        assert_eq!(store.size().unwrap(), 5);
        let keys: Vec<_> = store
            .stream()
            .unwrap()
            .iter()
            .map(|e| e.message().key.clone())
            .collect();
        assert_eq!(keys, vec!["k0", "k1", "k2", "k3", "k4"]);
    }

    #[test]
    fn test_positions_merge_per_channel() {
        let store = MessageStore::new();
        store
            .add(entry("orders", "a", PartitionCursor::new("p1", "10")))
            .unwrap();
        store
            .add(entry("orders", "b", PartitionCursor::new("p2", "7")))
            .unwrap();
        store
            .add(entry("orders", "c", PartitionCursor::new("p1", "11")))
            .unwrap();

        let position = store.latest_channel_position("orders").unwrap();
        assert_eq!(position.cursor("p1").unwrap().cursor(), "11");
        assert_eq!(position.cursor("p2").unwrap().cursor(), "7");

        assert!(store.latest_channel_position("unseen").unwrap().is_empty());
    }

    #[test]
    fn test_channel_names() {
        let store = MessageStore::new();
        store
            .add(entry("orders", "a", PartitionCursor::new("p1", "1")))
            .unwrap();
        store
            .add(entry("invoices", "b", PartitionCursor::new("p1", "1")))
            .unwrap();

        let names = store.channel_names().unwrap();
        assert!(names.contains("orders"));
        assert!(names.contains("invoices"));
        assert_eq!(names.len(), 2);
    }

    fn attribute_entry(key: &str, attributes: &[(&str, &str)]) -> MessageStoreEntry {
        let mut header = Header::new();
        for (name, value) in attributes {
            header = header.with_attribute(*name, *value);
        }
        MessageStoreEntry::new(
            "orders",
            Message::with_header(key, header, Bytes::from_static(b"{}")),
        )
    }

    #[test]
    fn test_entry_in_two_indexes_and_main_log() {
        let store = MessageStore::with_indexer(Box::new(CompositeIndexer::of(vec![
            Box::new(AttributeIndexer::new("byColor", "color")),
            Box::new(AttributeIndexer::new("bySize", "size")),
        ])));

        store
            .add(attribute_entry("k1", &[("color", "blue"), ("size", "xl")]))
            .unwrap();

        assert_eq!(store.stream().unwrap().len(), 1);
        assert_eq!(
            store
                .stream_index(&Index::new("byColor"), "blue")
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            store
                .stream_index(&Index::new("bySize"), "xl")
                .unwrap()
                .len(),
            1
        );
        assert_eq!(store.indexes().len(), 2);
    }

    #[test]
    fn test_index_preserves_main_log_order() {
        let store =
            MessageStore::with_indexer(Box::new(AttributeIndexer::new("byColor", "color")));

        store
            .add(attribute_entry("k1", &[("color", "blue")]))
            .unwrap();
        store
            .add(attribute_entry("k2", &[("color", "green")]))
            .unwrap();
        store
            .add(attribute_entry("k3", &[("color", "blue")]))
            .unwrap();

        let blues: Vec<_> = store
            .stream_index(&Index::new("byColor"), "blue")
            .unwrap()
            .iter()
            .map(|e| e.message().key.clone())
            .collect();
        assert_eq!(blues, vec!["k1", "k3"]);
    }

    #[test]
    fn test_unknown_index_key_yields_empty() {
        let store =
            MessageStore::with_indexer(Box::new(AttributeIndexer::new("byColor", "color")));

        assert!(store
            .stream_index(&Index::new("byColor"), "unseen")
            .unwrap()
            .is_empty());
        assert!(store
            .stream_index(&Index::new("unknown"), "x")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_stream_snapshot_is_stable_across_adds() {
        let store = MessageStore::new();
        store
            .add(entry("orders", "a", PartitionCursor::new("p1", "1")))
            .unwrap();

        let snapshot = store.stream().unwrap();
        store
            .add(entry("orders", "b", PartitionCursor::new("p1", "2")))
            .unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.size().unwrap(), 2);
    }
}
