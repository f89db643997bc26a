//! End-to-end replay: sender -> channel -> event source -> store + compaction

use std::sync::Arc;

use bytes::Bytes;

use skein_compaction::{CompactionService, InMemorySnapshotWriter, SnapshotWriter};
use skein_core::channel::inmemory::{InMemoryChannelReader, InMemoryChannels};
use skein_core::{
    stop, ChannelError, ChannelPosition, EventSource, EventSourceResult, EventSourceFactory,
    Header, InMemoryStateRepository, Message, MessageSender, StateRepository,
};
use skein_store::{AttributeIndexer, CompositeIndexer, Index, MessageStore, StoreConsumer};

fn order_message(key: &str, payload: &str, color: &str) -> Message {
    let header = Header::new().with_attribute("color", color);
    Message::with_header(key, header, Bytes::copy_from_slice(payload.as_bytes()))
}

fn in_memory_factory(channels: Arc<InMemoryChannels>) -> Box<dyn EventSourceFactory> {
    Box::new(
        move |name: &str, channel_name: &str| -> EventSourceResult<EventSource> {
            let channel = channels
                .get(channel_name)
                .ok_or_else(|| ChannelError::UnknownChannel(channel_name.to_string()))?;
            Ok(EventSource::builder(Arc::new(InMemoryChannelReader::new(channel)))
                .name(name)
                .build())
        },
    )
}

#[tokio::test]
async fn test_store_materializes_channel_with_indexes() {
    let channels = Arc::new(InMemoryChannels::new());
    let sender = channels.sender("orders");
    sender
        .send_batch(vec![
            order_message("o1", "{\"amount\":1}", "blue"),
            order_message("o2", "{\"amount\":2}", "green"),
            order_message("o3", "{\"amount\":3}", "blue"),
        ])
        .await
        .unwrap();

    let store = Arc::new(MessageStore::with_indexer(Box::new(CompositeIndexer::of(
        vec![
            Box::new(AttributeIndexer::new("byColor", "color")),
            Box::new(skein_store::KeyIndexer::new()),
        ],
    ))));

    let source = EventSource::builder(Arc::new(channels.reader("orders")))
        .name("orders-materializer")
        .consumer(Arc::new(StoreConsumer::new("orders", store.clone())))
        .build();

    let position = source
        .consume_all(ChannelPosition::empty(), stop::on_empty_poll())
        .await
        .unwrap()
        .expect("drained channel completes the call");

    assert_eq!(position.cursor("0").unwrap().cursor(), "3");
    assert_eq!(store.size().unwrap(), 3);

    // the store's position view matches what the loop returned
    assert_eq!(store.latest_channel_position("orders").unwrap(), position);

    let blues: Vec<_> = store
        .stream_index(&Index::new("byColor"), "blue")
        .unwrap()
        .iter()
        .map(|e| e.message().key.clone())
        .collect();
    assert_eq!(blues, vec!["o1", "o3"]);

    let by_key = store.stream_index(&Index::new("key"), "o2").unwrap();
    assert_eq!(by_key.len(), 1);
}

#[tokio::test]
async fn test_compaction_after_live_consumption() {
    let channels = Arc::new(InMemoryChannels::new());
    let sender = channels.sender("orders");

    // o1 is overwritten, o2 is deleted, o3 survives as sent
    sender
        .send_batch(vec![
            order_message("o1", "stale", "blue"),
            order_message("o2", "doomed", "green"),
            order_message("o1", "fresh", "blue"),
            Message::new("o2", Bytes::new()),
            order_message("o3", "kept", "red"),
        ])
        .await
        .unwrap();

    let repository = Arc::new(InMemoryStateRepository::new());
    let writer = Arc::new(InMemorySnapshotWriter::new());

    struct SharedWriter(Arc<InMemorySnapshotWriter>);

    #[async_trait::async_trait]
    impl SnapshotWriter for SharedWriter {
        async fn write(
            &self,
            channel_name: &str,
            position: Option<ChannelPosition>,
            entries: Vec<(String, Bytes)>,
        ) -> Result<skein_compaction::SnapshotDescriptor, skein_compaction::SnapshotError> {
            self.0.write(channel_name, position, entries).await
        }
    }

    let service = CompactionService::new(
        Box::new(SharedWriter(writer.clone())),
        repository.clone(),
        in_memory_factory(channels.clone()),
    );

    let descriptor = service.compact("orders").await.unwrap();

    assert_eq!(descriptor.entry_count, 2);
    assert_eq!(
        descriptor
            .position
            .as_ref()
            .unwrap()
            .cursor("0")
            .unwrap()
            .cursor(),
        "5"
    );

    let mut entries = writer.latest("orders").unwrap().entries;
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        entries,
        vec![
            ("o1".to_string(), Bytes::from_static(b"fresh")),
            ("o3".to_string(), Bytes::from_static(b"kept")),
        ]
    );

    // sink cleared after the run; a second compaction reproduces the snapshot
    assert_eq!(repository.size(), 0);
    let second = service.compact("orders").await.unwrap();
    assert_eq!(second.entry_count, 2);
}
