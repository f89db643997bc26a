//! The event-source consumption loop
//!
//! An [`EventSource`] drives an unbounded pull loop against a
//! [`ChannelReader`], folds every returned cursor into a running
//! [`ChannelPosition`], and dispatches each message through its
//! [`MessageDispatcher`] until a stop condition is satisfied.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, trace, warn};

use crate::channel::{ChannelReader, ExhaustionBehavior, PartitionIterator};
use crate::consumer::MessageConsumer;
use crate::dispatcher::MessageDispatcher;
use crate::error::EventSourceResult;
use crate::message::Message;
use crate::notification::{EventSourceNotification, EventSourceStatus, LifecycleNotifier};
use crate::position::{ChannelPosition, PartitionCursor};

/// Stop predicate evaluated after each dispatch
///
/// Receives the message just dispatched, or `None` when a full polling sweep
/// yielded nothing. Returning `true` ends the consumption call.
pub type StopCondition = Arc<dyn Fn(Option<&Message>) -> bool + Send + Sync>;

/// Stop conditions used by the engine and by callers
pub mod stop {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Mutex, PoisonError};

    use super::*;

    /// Never stop; the reader's exhaustion behavior or an external flag ends
    /// the call
    pub fn never() -> StopCondition {
        Arc::new(|_| false)
    }

    /// Stop once a full polling sweep yields nothing: drain, then finish
    pub fn on_empty_poll() -> StopCondition {
        Arc::new(|message| message.is_none())
    }

    /// Stop when the predicate holds for a dispatched message
    ///
    /// Empty polls do not stop; combine with the reader's exhaustion
    /// behavior for channels that may drain first.
    pub fn when(predicate: impl Fn(&Message) -> bool + Send + Sync + 'static) -> StopCondition {
        Arc::new(move |message| message.is_some_and(|m| predicate(m)))
    }

    /// Stop when the flag is raised: the external cancellation signal
    pub fn on_flag(flag: Arc<AtomicBool>) -> StopCondition {
        Arc::new(move |_| flag.load(Ordering::SeqCst))
    }

    /// Stop once every partition has caught up to the channel head, or a
    /// message arrives from past the horizon
    ///
    /// A partition counts as caught up when a dispatched message reports
    /// zero time behind the head, or arrived after `horizon`. An empty sweep
    /// is caught up by definition.
    pub fn caught_up(horizon: DateTime<Utc>, partitions: Vec<String>) -> StopCondition {
        let caught: Mutex<HashSet<String>> = Mutex::new(HashSet::new());
        Arc::new(move |message| {
            let Some(message) = message else {
                return true;
            };
            let Some(partition_id) = message.header.partition_id() else {
                return false;
            };
            let partition_done = message
                .header
                .behind_latest
                .is_some_and(|behind| behind.is_zero())
                || message.header.arrival > horizon;
            if !partition_done {
                return false;
            }
            let mut caught = caught.lock().unwrap_or_else(PoisonError::into_inner);
            caught.insert(partition_id.to_string());
            partitions.iter().all(|p| caught.contains(p.as_str()))
        })
    }
}

/// Drives the consumption loop for one channel
///
/// A source owns its dispatcher: consumers are registered up front, then one
/// of the `consume_*` calls runs the loop. Lifecycle transitions are
/// published through the source's [`LifecycleNotifier`].
pub struct EventSource {
    name: String,
    reader: Arc<dyn ChannelReader>,
    dispatcher: MessageDispatcher,
    notifier: LifecycleNotifier,
}

impl EventSource {
    /// Event source with a fresh dispatcher and notifier
    pub fn new(name: impl Into<String>, reader: Arc<dyn ChannelReader>) -> Self {
        Self {
            name: name.into(),
            reader,
            dispatcher: MessageDispatcher::new(),
            notifier: LifecycleNotifier::new(),
        }
    }

    /// Start building an event source
    pub fn builder(reader: Arc<dyn ChannelReader>) -> EventSourceBuilder {
        EventSourceBuilder::new(reader)
    }

    /// Name of this source (not the channel name)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the consumed channel
    pub fn channel_name(&self) -> &str {
        self.reader.channel_name()
    }

    /// Register a consumer with the source's dispatcher
    pub fn register(&mut self, consumer: Arc<dyn MessageConsumer>) {
        self.dispatcher.register(consumer);
    }

    /// The source's dispatcher
    pub fn dispatcher(&self) -> &MessageDispatcher {
        &self.dispatcher
    }

    /// Subscribe to lifecycle notifications
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EventSourceNotification> {
        self.notifier.subscribe()
    }

    /// Consume the channel from `start` until the stop condition fires
    ///
    /// Returns `Some(position)` once the stop condition is satisfied, with
    /// the merged position after the last dispatched message. Returns
    /// `Ok(None)` when the reader reports exhaustion before any stop: the
    /// call completed nothing and the caller decides how to resume. A
    /// consumer or reader error aborts the call; the position advances only
    /// through the value returned on success.
    #[instrument(skip_all, fields(source = %self.name, channel = %self.reader.channel_name()))]
    pub async fn consume_all(
        &self,
        start: ChannelPosition,
        stop: StopCondition,
    ) -> EventSourceResult<Option<ChannelPosition>> {
        debug!(start = %start, "starting consumption");
        self.publish(
            EventSourceStatus::Started,
            Some(start.clone()),
            "consumption started",
        );
        match self.run_loop(start, stop).await {
            Ok(Some(position)) => {
                info!(position = %position, "consumption finished");
                self.publish(
                    EventSourceStatus::Finished,
                    Some(position.clone()),
                    "stop condition satisfied",
                );
                Ok(Some(position))
            }
            Ok(None) => {
                debug!("reader exhausted before stop condition");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "consumption failed");
                self.publish(EventSourceStatus::Failed, None, &e.to_string());
                Err(e)
            }
        }
    }

    /// Consume from the beginning until every partition has caught up to the
    /// channel head as of `horizon`
    ///
    /// The bounded-replay primitive: the loop stops once each partition
    /// reports zero lag or yields a message from past the horizon, so the
    /// call completes even on an unbounded channel.
    pub async fn consume_until(
        &self,
        horizon: DateTime<Utc>,
    ) -> EventSourceResult<Option<ChannelPosition>> {
        let partitions = self.reader.partitions().await?;
        self.consume_all(ChannelPosition::empty(), stop::caught_up(horizon, partitions))
            .await
    }

    async fn run_loop(
        &self,
        start: ChannelPosition,
        stop: StopCondition,
    ) -> EventSourceResult<Option<ChannelPosition>> {
        let mut position = start;
        let partitions = self.reader.partitions().await?;
        let mut iterators: Vec<Box<dyn PartitionIterator>> =
            Vec::with_capacity(partitions.len());
        for partition_id in &partitions {
            let iterator = self
                .reader
                .open(partition_id, position.cursor(partition_id))
                .await?;
            iterators.push(iterator);
        }

        loop {
            let mut dispatched_any = false;
            for iterator in &mut iterators {
                let polled = iterator.poll_next().await?;
                let partition_id = iterator.partition_id().to_string();
                position = position.with(PartitionCursor::new(
                    partition_id.as_str(),
                    polled.cursor.as_str(),
                ));

                let Some(message) = polled.message else {
                    continue;
                };
                dispatched_any = true;
                let message =
                    decorate(message, &partition_id, &polled.cursor, polled.behind_latest);
                trace!(key = %message.key, partition = %partition_id, "dispatching");
                self.dispatcher.dispatch(&message).await?;
                if stop(Some(&message)) {
                    return Ok(Some(position));
                }
            }

            if !dispatched_any {
                if stop(None) {
                    return Ok(Some(position));
                }
                match self.reader.on_exhausted() {
                    ExhaustionBehavior::Return => return Ok(None),
                    ExhaustionBehavior::Backoff(pause) => tokio::time::sleep(pause).await,
                }
            }
        }
    }

    fn publish(&self, status: EventSourceStatus, position: Option<ChannelPosition>, detail: &str) {
        self.notifier.publish(EventSourceNotification {
            channel_name: self.reader.channel_name().to_string(),
            status,
            position,
            detail: detail.to_string(),
        });
    }
}

/// Fill in receipt metadata the reader did not already supply
fn decorate(
    mut message: Message,
    partition_id: &str,
    cursor: &str,
    behind_latest: std::time::Duration,
) -> Message {
    let header = &mut message.header;
    if header.cursor.is_none() {
        header.cursor = Some(PartitionCursor::new(partition_id, cursor));
    }
    if header.behind_latest.is_none() {
        header.behind_latest = Some(behind_latest);
    }
    message
}

/// Builder for event sources
pub struct EventSourceBuilder {
    name: String,
    reader: Arc<dyn ChannelReader>,
    notifier: Option<LifecycleNotifier>,
    consumers: Vec<Arc<dyn MessageConsumer>>,
}

impl EventSourceBuilder {
    pub fn new(reader: Arc<dyn ChannelReader>) -> Self {
        Self {
            name: "event-source".to_string(),
            reader,
            notifier: None,
            consumers: Vec::new(),
        }
    }

    /// Name the source
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Publish lifecycle notifications through an existing notifier
    #[must_use]
    pub fn notifier(mut self, notifier: LifecycleNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Register a consumer
    #[must_use]
    pub fn consumer(mut self, consumer: Arc<dyn MessageConsumer>) -> Self {
        self.consumers.push(consumer);
        self
    }

    pub fn build(self) -> EventSource {
        let mut source = EventSource {
            name: self.name,
            reader: self.reader,
            dispatcher: MessageDispatcher::new(),
            notifier: self.notifier.unwrap_or_default(),
        };
        for consumer in self.consumers {
            source.register(consumer);
        }
        source
    }
}

/// Builds a fresh event source bound to a channel
///
/// Compaction creates a new source per run so every replay starts with a
/// clean dispatcher. Closures with the matching signature implement this
/// directly.
pub trait EventSourceFactory: Send + Sync {
    fn build(&self, name: &str, channel_name: &str) -> EventSourceResult<EventSource>;
}

impl<F> EventSourceFactory for F
where
    F: Fn(&str, &str) -> EventSourceResult<EventSource> + Send + Sync,
{
    fn build(&self, name: &str, channel_name: &str) -> EventSourceResult<EventSource> {
        self(name, channel_name)
    }
}
