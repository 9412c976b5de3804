// src/hal/camera.rs
//! Polled camera capture with bounded waits

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::acquisition::sanitize_frame_length;
use crate::config::CameraConfig;
use crate::hal::{Frame, FrameSource, HalError};
use crate::utils::TimeProvider;

/// Errors raised by the register-level capture bus
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("bus transfer failed: {0}")]
    Transfer(String),

    #[error("sensor did not answer the probe (read {read:#04x}, expected {expected:#04x})")]
    ProbeFailed { expected: u8, read: u8 },
}

impl From<CaptureError> for HalError {
    fn from(err: CaptureError) -> Self {
        HalError::Bus(err.to_string())
    }
}

/// Register-level operations of a FIFO-buffered capture chip
pub trait CaptureBus: Send {
    /// Check the chip responds before first use
    fn probe(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    /// Flush the FIFO, clear the done flag and trigger a capture
    fn begin_capture(&mut self) -> Result<(), CaptureError>;

    fn capture_done(&mut self) -> Result<bool, CaptureError>;

    /// Length the chip reports for the captured frame. Not trusted.
    fn fifo_length(&mut self) -> Result<u32, CaptureError>;

    /// Burst-read `buf.len()` bytes from the start of the FIFO
    fn read_fifo(&mut self, buf: &mut [u8]) -> Result<(), CaptureError>;
}

/// [`FrameSource`] over a [`CaptureBus`] with a capture timeout and retries
///
/// Every wait for the done flag is bounded both by elapsed time and by a
/// maximum number of polls, so a stalled clock cannot hang the loop.
pub struct PolledCamera<B: CaptureBus> {
    bus: B,
    config: CameraConfig,
    clock: Arc<dyn TimeProvider>,
    initialized: bool,
    captures: u64,
    timeouts: u64,
}

impl<B: CaptureBus> PolledCamera<B> {
    pub fn new(bus: B, config: CameraConfig, clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            bus,
            config,
            clock,
            initialized: false,
            captures: 0,
            timeouts: 0,
        }
    }

    /// Probe the bus. Captures fail with `NotInitialized` until this succeeds.
    pub fn initialize(&mut self) -> Result<(), HalError> {
        self.bus.probe()?;
        self.initialized = true;
        info!(
            timeout_ms = self.config.capture_timeout_ms,
            retries = self.config.capture_retries,
            "camera initialized"
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Successful captures and timed-out attempts so far
    pub fn stats(&self) -> (u64, u64) {
        (self.captures, self.timeouts)
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    fn wait_for_capture(&mut self) -> Result<(), HalError> {
        let timeout_ms = self.config.capture_timeout_ms;
        let poll_interval = self.config.poll_interval_ms.max(1);
        let max_polls = (timeout_ms / poll_interval).max(1);
        let started = self.clock.now_millis();

        for _ in 0..max_polls {
            if self.bus.capture_done()? {
                return Ok(());
            }
            if self.clock.elapsed_since(started) >= timeout_ms {
                break;
            }
            std::thread::sleep(Duration::from_millis(poll_interval));
        }

        if self.bus.capture_done()? {
            return Ok(());
        }

        Err(HalError::CaptureTimeout {
            waited_ms: self.clock.elapsed_since(started),
        })
    }

    fn capture_once(&mut self) -> Result<Frame, HalError> {
        self.bus.begin_capture()?;
        self.wait_for_capture()?;

        let declared = self.bus.fifo_length()?;
        let effective = sanitize_frame_length(declared);

        let mut bytes = vec![0u8; effective];
        self.bus.read_fifo(&mut bytes)?;

        debug!(declared, effective, "frame read from FIFO");
        Ok(Frame::new(bytes, declared))
    }
}

impl<B: CaptureBus> FrameSource for PolledCamera<B> {
    fn capture(&mut self) -> Result<Frame, HalError> {
        if !self.initialized {
            return Err(HalError::NotInitialized);
        }

        let mut attempt = 0;
        loop {
            match self.capture_once() {
                Ok(frame) => {
                    self.captures += 1;
                    return Ok(frame);
                }
                Err(err) if err.is_transient() && attempt < self.config.capture_retries => {
                    self.timeouts += 1;
                    attempt += 1;
                    warn!(attempt, error = %err, "capture attempt failed, retrying");
                }
                Err(err) => {
                    if err.is_transient() {
                        self.timeouts += 1;
                    }
                    return Err(err);
                }
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MockTimeProvider;

    /// Bus whose done flag rises after a fixed number of polls
    struct FakeBus {
        polls_until_done: Option<u32>,
        polls: u32,
        declared: u32,
        begin_calls: u32,
        fail_read: bool,
    }

    impl FakeBus {
        fn done_after(polls: u32, declared: u32) -> Self {
            Self {
                polls_until_done: Some(polls),
                polls: 0,
                declared,
                begin_calls: 0,
                fail_read: false,
            }
        }

        fn never_done() -> Self {
            Self {
                polls_until_done: None,
                ..Self::done_after(0, 1000)
            }
        }
    }

    impl CaptureBus for FakeBus {
        fn begin_capture(&mut self) -> Result<(), CaptureError> {
            self.begin_calls += 1;
            self.polls = 0;
            Ok(())
        }

        fn capture_done(&mut self) -> Result<bool, CaptureError> {
            self.polls += 1;
            Ok(matches!(self.polls_until_done, Some(n) if self.polls > n))
        }

        fn fifo_length(&mut self) -> Result<u32, CaptureError> {
            Ok(self.declared)
        }

        fn read_fifo(&mut self, buf: &mut [u8]) -> Result<(), CaptureError> {
            if self.fail_read {
                return Err(CaptureError::Transfer("spi".to_string()));
            }
            for (i, byte) in buf.iter_mut().enumerate() {
                *byte = (i % 251) as u8;
            }
            Ok(())
        }
    }

    fn fast_config(retries: u32) -> CameraConfig {
        CameraConfig {
            capture_timeout_ms: 3,
            poll_interval_ms: 1,
            capture_retries: retries,
        }
    }

    fn camera(bus: FakeBus, retries: u32) -> PolledCamera<FakeBus> {
        let clock = Arc::new(MockTimeProvider::new(0));
        let mut camera = PolledCamera::new(bus, fast_config(retries), clock);
        camera.initialize().unwrap();
        camera
    }

    #[test]
    fn test_uninitialized_camera_is_fatal() {
        let clock = Arc::new(MockTimeProvider::new(0));
        let mut camera = PolledCamera::new(FakeBus::done_after(0, 1000), fast_config(1), clock);
        assert_eq!(camera.capture(), Err(HalError::NotInitialized));
        assert!(!camera.is_ready());
    }

    #[test]
    fn test_capture_reads_declared_length() {
        let mut camera = camera(FakeBus::done_after(1, 1000), 0);
        let frame = camera.capture().unwrap();
        assert_eq!(frame.len(), 1000);
        assert_eq!(frame.declared_length(), 1000);
        assert_eq!(camera.stats(), (1, 0));
    }

    #[test]
    fn test_corrupted_length_uses_fallback() {
        let mut camera = camera(FakeBus::done_after(0, 0), 0);
        let frame = camera.capture().unwrap();
        assert_eq!(frame.len(), 8192);
        assert_eq!(frame.declared_length(), 0);
    }

    #[test]
    fn test_stalled_capture_times_out_even_with_frozen_clock() {
        let mut camera = camera(FakeBus::never_done(), 0);
        match camera.capture() {
            Err(HalError::CaptureTimeout { .. }) => {}
            other => panic!("Expected timeout, got {:?}", other),
        }
        assert_eq!(camera.stats(), (0, 1));
    }

    #[test]
    fn test_timeouts_are_retried() {
        let mut camera = camera(FakeBus::never_done(), 2);
        assert!(camera.capture().is_err());
        assert_eq!(camera.bus_mut().begin_calls, 3);
    }

    #[test]
    fn test_bus_errors_are_not_retried() {
        let mut bus = FakeBus::done_after(0, 500);
        bus.fail_read = true;
        let mut camera = camera(bus, 3);

        match camera.capture() {
            Err(HalError::Bus(msg)) => assert!(msg.contains("spi")),
            other => panic!("Expected bus error, got {:?}", other),
        }
        assert_eq!(camera.bus_mut().begin_calls, 1);
    }
}
