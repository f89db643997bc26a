//! Message consumers and key patterns

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::ConsumerResult;
use crate::message::{Header, Message};

/// Key-matching predicate selecting which messages a consumer receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern {
    /// Match every key (the catch-all used for store feeds and compaction)
    Any,
    /// Match one key exactly
    Exact(String),
    /// Match keys beginning with a prefix
    Prefix(String),
}

impl KeyPattern {
    /// Match an exact key
    pub fn exact(key: impl Into<String>) -> Self {
        Self::Exact(key.into())
    }

    /// Match a key prefix
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into())
    }

    /// Whether the pattern accepts a key
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(exact) => key == exact,
            Self::Prefix(prefix) => key.starts_with(prefix),
        }
    }
}

/// A consumer invoked for every dispatched message whose key matches
///
/// Consumers must be safe to invoke concurrently: partitioned transports
/// drive one execution context per partition into the same dispatcher.
#[async_trait]
pub trait MessageConsumer: Send + Sync {
    /// Pattern deciding which keys this consumer receives
    fn key_pattern(&self) -> &KeyPattern;

    /// Handle one message
    ///
    /// An error aborts the consumption call that dispatched the message.
    async fn accept(&self, message: &Message) -> ConsumerResult<()>;
}

/// Consumer wrapping an async closure over the raw message
pub struct FnMessageConsumer<F> {
    pattern: KeyPattern,
    handler: F,
}

impl<F> FnMessageConsumer<F> {
    pub fn new(pattern: KeyPattern, handler: F) -> Self {
        Self { pattern, handler }
    }
}

#[async_trait]
impl<F, Fut> MessageConsumer for FnMessageConsumer<F>
where
    F: Fn(Message) -> Fut + Send + Sync,
    Fut: Future<Output = ConsumerResult<()>> + Send,
{
    fn key_pattern(&self) -> &KeyPattern {
        &self.pattern
    }

    async fn accept(&self, message: &Message) -> ConsumerResult<()> {
        (self.handler)(message.clone()).await
    }
}

/// Consumer decoding JSON payloads into `T` before invoking its handler
///
/// The handler receives `(key, header, decoded payload)`. Decode failures are
/// consumer errors and abort the consumption call like any handler failure.
pub struct DecodingConsumer<T, F> {
    pattern: KeyPattern,
    handler: F,
    _payload: PhantomData<fn() -> T>,
}

impl<T, F> DecodingConsumer<T, F> {
    pub fn new(pattern: KeyPattern, handler: F) -> Self {
        Self {
            pattern,
            handler,
            _payload: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F, Fut> MessageConsumer for DecodingConsumer<T, F>
where
    T: DeserializeOwned + Send,
    F: Fn(String, Header, T) -> Fut + Send + Sync,
    Fut: Future<Output = ConsumerResult<()>> + Send,
{
    fn key_pattern(&self) -> &KeyPattern {
        &self.pattern
    }

    async fn accept(&self, message: &Message) -> ConsumerResult<()> {
        let payload: T = serde_json::from_slice(&message.payload)?;
        (self.handler)(message.key.clone(), message.header.clone(), payload).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use bytes::Bytes;
    use serde::Deserialize;

    use super::*;
    use crate::error::ConsumerError;

    #[test]
    fn test_key_pattern_matching() {
        assert!(KeyPattern::Any.matches("anything"));
        assert!(KeyPattern::exact("order-1").matches("order-1"));
        assert!(!KeyPattern::exact("order-1").matches("order-2"));
        assert!(KeyPattern::prefix("order-").matches("order-2"));
        assert!(!KeyPattern::prefix("order-").matches("invoice-2"));
    }

    #[tokio::test]
    async fn test_fn_consumer_receives_message() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let consumer = FnMessageConsumer::new(KeyPattern::Any, move |message: Message| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push(message.key);
                Ok(())
            }
        });

        let message = Message::new("k1", Bytes::from_static(b"{}"));
        consumer.accept(&message).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["k1".to_string()]);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Color {
        data: String,
    }

    #[tokio::test]
    async fn test_decoding_consumer_decodes_payload() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let consumer = DecodingConsumer::new(
            KeyPattern::Any,
            move |_key: String, _header: Header, color: Color| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(color.data);
                    Ok(())
                }
            },
        );

        let message = Message::new("k1", Bytes::from_static(b"{\"data\":\"blue\"}"));
        consumer.accept(&message).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["blue".to_string()]);
    }

    #[tokio::test]
    async fn test_decoding_consumer_surfaces_decode_failure() {
        let consumer = DecodingConsumer::new(
            KeyPattern::Any,
            |_key: String, _header: Header, _color: Color| async move { Ok(()) },
        );

        let message = Message::new("k1", Bytes::from_static(b"not json"));
        let err = consumer.accept(&message).await.unwrap_err();

        assert!(matches!(err, ConsumerError::Decode(_)));
    }
}
