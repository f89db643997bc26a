//! Named indexes over message store entries

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entry::MessageStoreEntry;

/// Name of a store index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Index(String);

impl Index {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives index memberships for entries
///
/// Indexers are pure: the same entry always produces the same pairs, so an
/// entry's index memberships are fixed at `add` time.
pub trait Indexer: Send + Sync {
    /// The indexes this indexer maintains
    fn indexes(&self) -> Vec<Index>;

    /// Index/value pairs the entry belongs to
    fn index(&self, entry: &MessageStoreEntry) -> Vec<(Index, String)>;
}

/// Indexer producing no memberships (the default for unindexed stores)
#[derive(Debug, Default)]
pub struct NoOpIndexer;

impl Indexer for NoOpIndexer {
    fn indexes(&self) -> Vec<Index> {
        Vec::new()
    }

    fn index(&self, _entry: &MessageStoreEntry) -> Vec<(Index, String)> {
        Vec::new()
    }
}

/// Indexes entries by message key
#[derive(Debug)]
pub struct KeyIndexer {
    index: Index,
}

impl KeyIndexer {
    pub fn new() -> Self {
        Self::named("key")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            index: Index::new(name),
        }
    }
}

impl Default for KeyIndexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Indexer for KeyIndexer {
    fn indexes(&self) -> Vec<Index> {
        vec![self.index.clone()]
    }

    fn index(&self, entry: &MessageStoreEntry) -> Vec<(Index, String)> {
        vec![(self.index.clone(), entry.message().key.clone())]
    }
}

/// Indexes entries by originating channel
#[derive(Debug)]
pub struct ChannelIndexer {
    index: Index,
}

impl ChannelIndexer {
    pub fn new() -> Self {
        Self {
            index: Index::new("channel"),
        }
    }
}

impl Default for ChannelIndexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Indexer for ChannelIndexer {
    fn indexes(&self) -> Vec<Index> {
        vec![self.index.clone()]
    }

    fn index(&self, entry: &MessageStoreEntry) -> Vec<(Index, String)> {
        vec![(self.index.clone(), entry.channel_name().to_string())]
    }
}

/// Indexes entries by a header attribute; entries without the attribute are
/// left out of the index
#[derive(Debug)]
pub struct AttributeIndexer {
    index: Index,
    attribute: String,
}

impl AttributeIndexer {
    pub fn new(index_name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            index: Index::new(index_name),
            attribute: attribute.into(),
        }
    }
}

impl Indexer for AttributeIndexer {
    fn indexes(&self) -> Vec<Index> {
        vec![self.index.clone()]
    }

    fn index(&self, entry: &MessageStoreEntry) -> Vec<(Index, String)> {
        match entry.message().header.attribute(&self.attribute) {
            Some(value) => vec![(self.index.clone(), value.to_string())],
            None => Vec::new(),
        }
    }
}

/// Combines several indexers into one
#[derive(Default)]
pub struct CompositeIndexer {
    indexers: Vec<Box<dyn Indexer>>,
}

impl CompositeIndexer {
    pub fn of(indexers: Vec<Box<dyn Indexer>>) -> Self {
        Self { indexers }
    }
}

impl Indexer for CompositeIndexer {
    fn indexes(&self) -> Vec<Index> {
        self.indexers.iter().flat_map(|i| i.indexes()).collect()
    }

    fn index(&self, entry: &MessageStoreEntry) -> Vec<(Index, String)> {
        self.indexers.iter().flat_map(|i| i.index(entry)).collect()
    }
}
