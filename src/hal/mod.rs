// src/hal/mod.rs
//! Hardware abstraction for the camera, inference runtime, display and buzzer

pub mod camera;
pub mod shared;
pub mod simulator;
pub mod sinks;
pub mod traits;
pub mod types;

#[cfg(feature = "embedded")]
pub mod arducam;

pub use camera::{CaptureBus, CaptureError, PolledCamera};
pub use shared::SharedCamera;
pub use sinks::{LogAudio, LogDisplay, RecordingAudio, RecordingDisplay};
pub use traits::*;
pub use types::*;
