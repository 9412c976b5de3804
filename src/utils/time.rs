//! Monotonic time sources for dwell and timeout arithmetic

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Time provider trait for dependency injection and testing
pub trait TimeProvider: Send + Sync {
    /// Monotonic milliseconds since an arbitrary, fixed origin
    fn now_millis(&self) -> u64;

    /// Milliseconds elapsed since `since`, never negative
    fn elapsed_since(&self, since: u64) -> u64 {
        self.now_millis().saturating_sub(since)
    }
}

/// Monotonic clock anchored at construction
pub struct MonotonicTimeProvider {
    origin: Instant,
}

impl MonotonicTimeProvider {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for MonotonicTimeProvider {
    fn now_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Mock time provider for deterministic testing
pub struct MockTimeProvider {
    current_time: AtomicU64,
}

impl MockTimeProvider {
    pub fn new(initial_time_millis: u64) -> Self {
        Self {
            current_time: AtomicU64::new(initial_time_millis),
        }
    }

    pub fn advance_by(&self, millis: u64) {
        self.current_time.fetch_add(millis, Ordering::Relaxed);
    }

    pub fn set_time(&self, millis: u64) {
        self.current_time.store(millis, Ordering::Relaxed);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now_millis(&self) -> u64 {
        self.current_time.load(Ordering::Relaxed)
    }
}
