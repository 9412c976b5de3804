// src/acquisition/mod.rs
//! Frame acquisition: length sanitizing and sample extraction

pub mod sampler;

pub use sampler::FrameSampler;

use tracing::warn;

use crate::config::constants::camera;

/// Length to read for a frame whose hardware-reported length is untrusted
///
/// A declared length of `0`, `>= MAX_FIFO_SIZE` or `> 100000` is replaced by
/// the fallback length. The result is always within `[1, MAX_FRAME_BYTES]`.
pub fn sanitize_frame_length(declared: u32) -> usize {
    let implausible = declared == 0
        || declared >= camera::MAX_FIFO_SIZE
        || declared > camera::MAX_PLAUSIBLE_FRAME_LENGTH;

    let length = if implausible {
        warn!(declared, fallback = camera::FALLBACK_FRAME_LENGTH, "implausible frame length");
        camera::FALLBACK_FRAME_LENGTH
    } else {
        declared as usize
    };

    length.clamp(1, camera::MAX_FRAME_BYTES)
}
