//! Scan sessions: wiring the scan controller to the camera, the tagging
//! queue and the event sink.
//!
//! At most one [`Session`] exists at a time; [`SessionManager`] enforces it.

mod error;
mod frame_counter;
mod manager;
mod orchestrator;
mod settings;

pub use error::SessionError;
pub use frame_counter::{FrameCounter, ParseFrameError};
pub use manager::{SessionDeps, SessionManager};
pub use orchestrator::Session;
pub use settings::SessionSettings;
