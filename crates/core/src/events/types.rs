use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Topic carrying [`SessionEvent`]s.
pub const SESSION_TOPIC: &str = "session";

/// Session lifecycle notification.
///
/// `data` holds the photo index for `scanned_photo` and a count for
/// `scan_finished` and `holes_skipped`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Start { id: Uuid },
    Stop { id: Uuid },
    ScanStarted { id: Uuid },
    ScannedPhoto { id: Uuid, data: u32 },
    ScanFinished { id: Uuid, data: u32 },
    HolesSkipped { id: Uuid, data: u32 },
}

impl SessionEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            SessionEvent::Start { id }
            | SessionEvent::Stop { id }
            | SessionEvent::ScanStarted { id }
            | SessionEvent::ScannedPhoto { id, .. }
            | SessionEvent::ScanFinished { id, .. }
            | SessionEvent::HolesSkipped { id, .. } => *id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Start { .. } => "start",
            SessionEvent::Stop { .. } => "stop",
            SessionEvent::ScanStarted { .. } => "scan_started",
            SessionEvent::ScannedPhoto { .. } => "scanned_photo",
            SessionEvent::ScanFinished { .. } => "scan_finished",
            SessionEvent::HolesSkipped { .. } => "holes_skipped",
        }
    }
}

/// A published payload as seen by subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub topic: String,
    pub payload: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_shape() {
        let id = Uuid::new_v4();
        let value = serde_json::to_value(SessionEvent::ScannedPhoto { id, data: 4 }).unwrap();
        assert_eq!(
            value,
            json!({"event": "scanned_photo", "id": id.to_string(), "data": 4})
        );

        let value = serde_json::to_value(SessionEvent::Start { id }).unwrap();
        assert_eq!(value, json!({"event": "start", "id": id.to_string()}));
    }

    #[test]
    fn test_roundtrip_and_accessors() {
        let id = Uuid::new_v4();
        let event = SessionEvent::HolesSkipped { id, data: 3 };
        let parsed: SessionEvent =
            serde_json::from_value(serde_json::to_value(&event).unwrap()).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.session_id(), id);
        assert_eq!(parsed.name(), "holes_skipped");
    }
}
