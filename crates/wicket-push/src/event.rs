//! Notification topics published by the socket session.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Topics a session publishes lifecycle and message notifications under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// The transport reported its open event.
    Opened,
    /// The connection was closed, locally or by the remote end.
    Closed,
    /// The transport reported an error.
    Error,
    /// The runtime has no WebSocket capability.
    NotSupported,
    /// An opaque application message arrived.
    Message,
}

/// Typed payload published under each topic.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The connection is open.
    Opened,
    /// The connection closed; carries the close reason when the remote
    /// end supplied one.
    Closed { reason: Option<String> },
    /// The transport failed.
    Error { detail: String },
    /// No WebSocket capability in this runtime.
    NotSupported { detail: String },
    /// Raw application message, republished unchanged.
    Message { text: String },
}

impl SessionEvent {
    /// The topic this event is published under.
    pub fn topic(&self) -> Topic {
        match self {
            Self::Opened => Topic::Opened,
            Self::Closed { .. } => Topic::Closed,
            Self::Error { .. } => Topic::Error,
            Self::NotSupported { .. } => Topic::NotSupported,
            Self::Message { .. } => Topic::Message,
        }
    }
}

/// Events buffered per subscriber before the oldest is dropped.
const SUBSCRIBER_BUFFER: usize = 64;

/// Observer registry keyed by topic.
///
/// Each topic fans out over its own broadcast channel. Publishing to a
/// topic nobody subscribed to is not an error.
#[derive(Clone, Default)]
pub struct EventBus {
    senders: Arc<Mutex<HashMap<Topic, broadcast::Sender<SessionEvent>>>>,
}

impl EventBus {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<SessionEvent> {
        let mut senders = self.senders.lock();
        senders
            .entry(topic)
            .or_insert_with(|| broadcast::channel(SUBSCRIBER_BUFFER).0)
            .subscribe()
    }

    /// Publish an event to its topic's subscribers.
    pub fn publish(&self, event: SessionEvent) {
        let sender = self.senders.lock().get(&event.topic()).cloned();
        if let Some(sender) = sender {
            // Send only fails when every receiver is gone; same as having
            // no subscribers at all.
            let _ = sender.send(event);
        }
    }
}
