//! Camera capture and file retrieval.
//!
//! [`CaptureCoordinator`] owns the tethered camera. Every hardware call goes
//! through one device lock, including the background monitor that picks up
//! extra files (RAW + JPEG pairs, bracketing) after the first download.

mod coordinator;
mod error;
mod monitor;
mod snapshot;

pub use coordinator::{CaptureCoordinator, FileCallback};
pub use error::CaptureError;
pub use snapshot::SettingsSnapshot;
