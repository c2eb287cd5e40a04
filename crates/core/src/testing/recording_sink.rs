//! Event sink that keeps everything it receives.

use std::sync::{Arc, Mutex};

use crate::events::{EventSink, SessionEvent, SESSION_TOPIC};

/// Records published events for assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingEventSink {
    events: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All (topic, payload) pairs in publish order.
    pub fn events(&self) -> Vec<(String, serde_json::Value)> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Session events that could be decoded, in publish order.
    pub fn session_events(&self) -> Vec<SessionEvent> {
        self.events()
            .into_iter()
            .filter(|(topic, _)| topic == SESSION_TOPIC)
            .filter_map(|(_, payload)| serde_json::from_value(payload).ok())
            .collect()
    }

    /// Names of the session events, e.g. `["start", "scan_started"]`.
    pub fn session_event_names(&self) -> Vec<&'static str> {
        self.session_events().iter().map(|e| e.name()).collect()
    }
}

impl EventSink for RecordingEventSink {
    fn publish(&self, topic: &str, payload: serde_json::Value) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((topic.to_string(), payload));
    }
}
