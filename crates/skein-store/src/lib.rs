//! # Skein Store
//!
//! Queryable, insertion-ordered in-memory record of channel messages.
//!
//! A [`MessageStore`] keeps every added [`MessageStoreEntry`] in its main
//! log, maintains named index sub-sequences derived by an [`Indexer`], and
//! tracks the merged [`ChannelPosition`](skein_core::ChannelPosition) per
//! channel. A [`StoreConsumer`] feeds a store from any event source's
//! dispatcher.
//!
//! The store is volatile by contract: history is bounded by compaction, not
//! by durability or eviction.

pub mod consumer;
pub mod entry;
pub mod error;
pub mod indexer;
pub mod store;

// Re-exports
pub use consumer::StoreConsumer;
pub use entry::MessageStoreEntry;
pub use error::{StoreError, StoreResult};
pub use indexer::{
    AttributeIndexer, ChannelIndexer, CompositeIndexer, Index, Indexer, KeyIndexer, NoOpIndexer,
};
pub use store::MessageStore;
