//! Fan-out of messages to registered consumers

use std::sync::Arc;

use tracing::trace;

use crate::consumer::MessageConsumer;
use crate::error::ConsumerResult;
use crate::message::Message;

/// Routes each message to every registered consumer whose key pattern matches
///
/// Consumers are invoked in registration order; the same pattern may be
/// registered any number of times and every match is invoked. Dispatch holds
/// no state per call and catches nothing: a consumer error propagates to the
/// consumption loop, which owns the failure policy.
#[derive(Default)]
pub struct MessageDispatcher {
    consumers: Vec<Arc<dyn MessageConsumer>>,
}

impl MessageDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a consumer; registration order is dispatch order
    pub fn register(&mut self, consumer: Arc<dyn MessageConsumer>) {
        self.consumers.push(consumer);
    }

    /// Number of registered consumers
    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    /// Whether no consumer is registered
    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }

    /// Dispatch one message to every matching consumer, in order
    pub async fn dispatch(&self, message: &Message) -> ConsumerResult<()> {
        for consumer in &self.consumers {
            if consumer.key_pattern().matches(&message.key) {
                trace!(key = %message.key, "dispatching to consumer");
                consumer.accept(message).await?;
            }
        }
        Ok(())
    }
}
