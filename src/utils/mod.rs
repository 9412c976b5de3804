//! Common utilities for the finger timer core

pub mod time;

pub use time::{MockTimeProvider, MonotonicTimeProvider, TimeProvider};
