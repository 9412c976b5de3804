// src/error.rs
//! Unified error handling for the finger timer core
//!
//! Every fallible operation that crosses a component boundary reports a
//! [`FingerTimerError`]. Errors carry an [`ErrorContext`] naming the component
//! and operation that failed so a single log line is enough to locate the
//! fault. Conditions the device recovers from locally (implausible frame
//! lengths, too few pixels, low-confidence predictions) are NOT errors and
//! never appear here.

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use crate::hal::HalError;

/// Unified error type for the entire device core
#[derive(Debug, Clone)]
pub enum FingerTimerError {
    /// The camera or the inference runtime failed
    Device {
        device: DeviceKind,
        error: Arc<dyn Error + Send + Sync>,
        context: ErrorContext,
    },

    /// Configuration and setup errors
    Configuration {
        component: String,
        reason: String,
        context: ErrorContext,
    },

    /// A detection stage could not produce its output
    Processing {
        stage: ProcessingStage,
        reason: String,
        context: ErrorContext,
    },

    /// Invalid input data errors
    InvalidData {
        data_type: String,
        reason: String,
        expected: Option<String>,
        actual: Option<String>,
        context: ErrorContext,
    },

    /// Bounded waits that ran out
    Timing {
        reason: String,
        timeout_ms: Option<u64>,
        context: ErrorContext,
    },
}

/// Collaborators the core talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Camera,
    InferenceService,
}

/// Detection stages for error tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    Inference,
    StateMachine,
}

/// Error context for debugging and analysis
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub timestamp: SystemTime,
    pub component: String,
    pub operation: String,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            timestamp: SystemTime::now(),
            component: component.to_string(),
            operation: operation.to_string(),
            file: None,
            line: None,
        }
    }

    /// Create error context with file and line information
    pub fn with_location(component: &str, operation: &str, file: &'static str, line: u32) -> Self {
        let mut context = Self::new(component, operation);
        context.file = Some(file);
        context.line = Some(line);
        context
    }
}

/// Macro for creating error context with file and line info
#[macro_export]
macro_rules! error_context {
    ($component:expr, $operation:expr) => {
        $crate::error::ErrorContext::with_location($component, $operation, file!(), line!())
    };
}

impl fmt::Display for FingerTimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FingerTimerError::Device { device, error, context } => {
                write!(f, "[{}] Device error in {}: {} (at {}:{})",
                       device, context.component, error,
                       context.file.unwrap_or("unknown"), context.line.unwrap_or(0))
            }
            FingerTimerError::Configuration { component, reason, context } => {
                write!(f, "[CONFIG] Configuration error in {}: {} ({})",
                       component, reason, context.operation)
            }
            FingerTimerError::Processing { stage, reason, context } => {
                write!(f, "[PROCESSING] {:?} stage error: {} ({})",
                       stage, reason, context.operation)
            }
            FingerTimerError::InvalidData { data_type, reason, expected, actual, context } => {
                match (expected, actual) {
                    (Some(exp), Some(act)) => write!(f, "[DATA] Invalid {}: {} (expected: {}, got: {}) ({})",
                                                     data_type, reason, exp, act, context.operation),
                    _ => write!(f, "[DATA] Invalid {}: {} ({})", data_type, reason, context.operation),
                }
            }
            FingerTimerError::Timing { reason, timeout_ms, context } => match timeout_ms {
                Some(ms) => write!(f, "[TIMING] {} after {}ms ({})", reason, ms, context.operation),
                None => write!(f, "[TIMING] {} ({})", reason, context.operation),
            },
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Camera => write!(f, "CAMERA"),
            DeviceKind::InferenceService => write!(f, "INFERENCE"),
        }
    }
}

impl Error for FingerTimerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FingerTimerError::Device { error, .. } => Some(error.as_ref()),
            _ => None,
        }
    }
}

impl FingerTimerError {
    /// Whether retrying the same operation on a later tick can succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FingerTimerError::Timing { .. } => true,
            FingerTimerError::Device { error, .. } => error
                .downcast_ref::<HalError>()
                .map(HalError::is_transient)
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Conversion from HAL errors
impl From<HalError> for FingerTimerError {
    fn from(err: HalError) -> Self {
        let device = err.device_kind();
        let context = error_context!("hal", "device_operation");
        FingerTimerError::Device {
            device,
            error: Arc::new(err),
            context,
        }
    }
}

/// Result type alias for core operations
pub type FingerTimerResult<T> = Result<T, FingerTimerError>;

/// Error builder for convenient error construction
pub struct ErrorBuilder {
    component: String,
    operation: String,
}

impl ErrorBuilder {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn configuration(self, reason: &str) -> FingerTimerError {
        let context = ErrorContext::new(&self.component, &self.operation);
        FingerTimerError::Configuration {
            component: self.component,
            reason: reason.to_string(),
            context,
        }
    }

    pub fn processing(self, stage: ProcessingStage, reason: &str) -> FingerTimerError {
        FingerTimerError::Processing {
            stage,
            reason: reason.to_string(),
            context: ErrorContext::new(&self.component, &self.operation),
        }
    }

    pub fn invalid_data(self, data_type: &str, reason: &str) -> FingerTimerError {
        FingerTimerError::InvalidData {
            data_type: data_type.to_string(),
            reason: reason.to_string(),
            expected: None,
            actual: None,
            context: ErrorContext::new(&self.component, &self.operation),
        }
    }

    pub fn mismatch(self, data_type: &str, expected: impl fmt::Display, actual: impl fmt::Display) -> FingerTimerError {
        FingerTimerError::InvalidData {
            data_type: data_type.to_string(),
            reason: "length mismatch".to_string(),
            expected: Some(expected.to_string()),
            actual: Some(actual.to_string()),
            context: ErrorContext::new(&self.component, &self.operation),
        }
    }

    pub fn timing(self, reason: &str, timeout_ms: Option<u64>) -> FingerTimerError {
        FingerTimerError::Timing {
            reason: reason.to_string(),
            timeout_ms,
            context: ErrorContext::new(&self.component, &self.operation),
        }
    }
}
