//! Driving the motor and detector through a roll.
//!
//! [`ScanLoop`] turns the motor and samples until the detector reports a
//! frame or the end of the film. [`ScanController`] wraps it with the session
//! lifecycle, the scan gate and the capture handshake.

mod cancel;
mod controller;
mod error;
mod scan_loop;
mod types;

pub use cancel::CancelFlag;
pub use controller::ScanController;
pub use error::ScanError;
pub use scan_loop::ScanLoop;
pub use types::{Crop, FrameEvent, PhotoInfo, ScanMode, ScanRig, ScanSignal, SessionState};
