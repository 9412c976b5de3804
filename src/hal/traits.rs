// src/hal/traits.rs
//! Collaborator traits the detection core depends on

use thiserror::Error;

use crate::error::DeviceKind;
use crate::hal::types::{DisplayCommand, Frame};
use crate::processing::features::FeatureVector;

/// Failures reported by device collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    #[error("camera is not initialized")]
    NotInitialized,

    #[error("capture did not complete within {waited_ms}ms")]
    CaptureTimeout { waited_ms: u64 },

    #[error("camera bus error: {0}")]
    Bus(String),

    #[error("frame source has no more frames")]
    SourceExhausted,

    #[error("inference failed: {0}")]
    InferenceFailed(String),
}

impl HalError {
    /// Which collaborator produced the error
    pub fn device_kind(&self) -> DeviceKind {
        match self {
            HalError::InferenceFailed(_) => DeviceKind::InferenceService,
            _ => DeviceKind::Camera,
        }
    }

    /// Retrying on a later tick may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, HalError::CaptureTimeout { .. })
    }
}

/// Anything that can hand the core a frame
pub trait FrameSource: Send {
    /// Capture one frame. Failure yields no partial frame.
    fn capture(&mut self) -> Result<Frame, HalError>;

    /// Whether the source finished its own initialization
    fn is_ready(&self) -> bool {
        true
    }
}

/// Opaque classifier runtime: feature vector in, one score per label out
pub trait InferenceService: Send {
    /// Number of scores every successful call returns
    fn label_count(&self) -> usize;

    fn classify(&mut self, features: &FeatureVector) -> Result<Vec<f32>, HalError>;
}

/// Fire-and-forget display output
pub trait DisplaySink: Send {
    fn show(&mut self, command: DisplayCommand);
}

/// Buzzer output. Calls block for the duration of the tone.
pub trait AudioSink: Send {
    fn beep(&mut self, duration_ms: u32);

    fn beep_pattern(&mut self, count: u32, duration_ms: u32, interval_ms: u32);

    /// Three long beeps
    fn alarm_pattern(&mut self);
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn capture(&mut self) -> Result<Frame, HalError> {
        (**self).capture()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

impl<T: InferenceService + ?Sized> InferenceService for Box<T> {
    fn label_count(&self) -> usize {
        (**self).label_count()
    }

    fn classify(&mut self, features: &FeatureVector) -> Result<Vec<f32>, HalError> {
        (**self).classify(features)
    }
}
