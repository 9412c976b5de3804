// src/hal/shared.rs
//! Frame source shared between the control loop and a network collaborator

use std::sync::Arc;

use parking_lot::Mutex;

use crate::hal::{Frame, FrameSource, HalError};

/// Clonable handle serializing access to one frame source
///
/// A capture holds the lock for its whole register transaction, so two
/// handles can never interleave bus traffic.
pub struct SharedCamera<S: FrameSource> {
    inner: Arc<Mutex<S>>,
}

impl<S: FrameSource> SharedCamera<S> {
    pub fn new(source: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(source)),
        }
    }

    /// Run `f` with exclusive access to the underlying source
    pub fn with_source<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Capture without waiting if another handle is mid-capture
    pub fn try_capture(&self) -> Option<Result<Frame, HalError>> {
        self.inner.try_lock().map(|mut source| source.capture())
    }

    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<S: FrameSource> Clone for SharedCamera<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: FrameSource> FrameSource for SharedCamera<S> {
    fn capture(&mut self) -> Result<Frame, HalError> {
        self.inner.lock().capture()
    }

    fn is_ready(&self) -> bool {
        self.inner.lock().is_ready()
    }
}
