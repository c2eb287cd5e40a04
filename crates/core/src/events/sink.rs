use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, error};

use super::types::{EventEnvelope, SessionEvent, SESSION_TOPIC};

/// Receives events published by the core.
///
/// Publishing never blocks and never fails from the caller's point of view.
pub trait EventSink: Send + Sync {
    fn publish(&self, topic: &str, payload: serde_json::Value);

    /// Publishes a session event on the session topic.
    fn publish_session(&self, event: &SessionEvent) {
        match serde_json::to_value(event) {
            Ok(payload) => self.publish(SESSION_TOPIC, payload),
            Err(e) => error!(event = event.name(), error = %e, "Failed to serialize session event"),
        }
    }
}

/// Event sink backed by a tokio broadcast channel.
///
/// Slow subscribers lag and lose the oldest events; publishers are never held up.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<EventEnvelope>,
}

impl BroadcastEventSink {
    /// Create a new sink with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, topic: &str, payload: serde_json::Value) {
        let envelope = EventEnvelope {
            timestamp: Utc::now(),
            topic: topic.to_string(),
            payload,
        };
        // Ignore send errors - they just mean no one is listening
        if self.sender.send(envelope).is_err() {
            debug!(topic, "Event published with no subscribers");
        }
    }
}
