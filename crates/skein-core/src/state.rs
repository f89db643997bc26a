//! State repositories: the sinks compaction replays into

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::consumer::{KeyPattern, MessageConsumer};
use crate::error::ConsumerResult;
use crate::message::Message;

/// Key-value sink for derived channel state
///
/// Implementations synchronize internally; the engine calls them from
/// multiple partition contexts without additional locking.
pub trait StateRepository: Send + Sync {
    /// Remove every entry
    fn clear(&self);

    /// Upsert a value under a key
    fn put(&self, key: String, value: Bytes);

    /// Remove a key, if present
    fn remove(&self, key: &str);

    /// Value under a key
    fn get(&self, key: &str) -> Option<Bytes>;

    /// Number of entries
    fn size(&self) -> usize;

    /// Snapshot of current contents
    fn entries(&self) -> Vec<(String, Bytes)>;
}

/// In-memory state repository over a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryStateRepository {
    entries: DashMap<String, Bytes>,
}

impl InMemoryStateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateRepository for InMemoryStateRepository {
    fn clear(&self) {
        self.entries.clear();
    }

    fn put(&self, key: String, value: Bytes) {
        self.entries.insert(key, value);
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    fn get(&self, key: &str) -> Option<Bytes> {
        self.entries.get(key).map(|v| v.clone())
    }

    fn size(&self) -> usize {
        self.entries.len()
    }

    fn entries(&self) -> Vec<(String, Bytes)> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

/// Consumer applying channel messages to a state repository
///
/// Upserts the payload under the message key; a tombstone (empty payload)
/// removes the key. Compaction registers this with a catch-all pattern so
/// the repository converges to the channel's latest state per key.
pub struct StateConsumer<R> {
    pattern: KeyPattern,
    repository: Arc<R>,
}

impl<R> StateConsumer<R> {
    /// Catch-all state consumer
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_pattern(repository, KeyPattern::Any)
    }

    /// State consumer restricted to a key pattern
    pub fn with_pattern(repository: Arc<R>, pattern: KeyPattern) -> Self {
        Self {
            pattern,
            repository,
        }
    }
}

#[async_trait]
impl<R: StateRepository> MessageConsumer for StateConsumer<R> {
    fn key_pattern(&self) -> &KeyPattern {
        &self.pattern
    }

    async fn accept(&self, message: &Message) -> ConsumerResult<()> {
        if message.is_tombstone() {
            self.repository.remove(&message.key);
        } else {
            self.repository.put(message.key.clone(), message.payload.clone());
        }
        Ok(())
    }
}
