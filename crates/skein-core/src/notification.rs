//! Lifecycle notifications published by event sources

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::position::ChannelPosition;

/// Lifecycle phase of a consumption call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSourceStatus {
    /// Consumption entered its loop
    Started,
    /// The stop condition was satisfied
    Finished,
    /// Consumption aborted with an error
    Failed,
}

/// Notification emitted at consumption lifecycle transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSourceNotification {
    /// Channel the event source consumes
    pub channel_name: String,
    /// Lifecycle phase
    pub status: EventSourceStatus,
    /// Position at the transition, where one is known
    pub position: Option<ChannelPosition>,
    /// Human-readable detail
    pub detail: String,
}

/// Best-effort broadcast of lifecycle notifications
///
/// Publishing with no subscriber is a no-op; subscribers that fall behind
/// lose the oldest notifications, per `tokio::sync::broadcast` semantics.
#[derive(Debug, Clone)]
pub struct LifecycleNotifier {
    tx: broadcast::Sender<EventSourceNotification>,
}

impl LifecycleNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Subscribe to notifications published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<EventSourceNotification> {
        self.tx.subscribe()
    }

    /// Publish a notification to current subscribers, if any
    pub fn publish(&self, notification: EventSourceNotification) {
        let _ = self.tx.send(notification);
    }
}

impl Default for LifecycleNotifier {
    fn default() -> Self {
        Self::new()
    }
}
