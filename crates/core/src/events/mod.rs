//! Fire-and-forget event publication for UIs and other observers.

mod sink;
mod types;

pub use sink::{BroadcastEventSink, EventSink};
pub use types::{EventEnvelope, SessionEvent, SESSION_TOPIC};
