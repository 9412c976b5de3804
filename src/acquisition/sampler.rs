// src/acquisition/sampler.rs
//! Brightness samples and pixels drawn from a frame body

use crate::acquisition::sanitize_frame_length;
use crate::config::SamplingConfig;
use crate::hal::Frame;

/// Reads fixed-stride samples from the body of a frame
///
/// Positions are bounded by both the sanitized declared length and the bytes
/// actually present, so a frame that over-reports its length yields fewer
/// samples rather than reading past its end.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSampler {
    header_skip: usize,
    stride: usize,
    scan_window: usize,
    max_samples: usize,
}

impl FrameSampler {
    pub fn new(header_skip: usize, stride: usize, scan_window: usize, max_samples: usize) -> Self {
        Self {
            header_skip,
            stride: stride.max(1),
            scan_window,
            max_samples,
        }
    }

    pub fn from_config(config: &SamplingConfig) -> Self {
        Self::new(
            config.header_skip_bytes,
            config.sample_stride,
            config.scan_window,
            config.max_samples,
        )
    }

    pub fn header_skip(&self) -> usize {
        self.header_skip
    }

    /// Up to `budget` samples at body offsets `0, stride, 2*stride, ...`
    /// below `min(scan_window, effective_length)`
    pub fn sample(&self, frame: &Frame, budget: usize) -> Vec<u8> {
        let effective = sanitize_frame_length(frame.declared_length());
        let end = self.readable_end(frame, effective);
        let window = self.scan_window.min(effective);
        let limit = budget.min(self.max_samples);

        (0..window)
            .step_by(self.stride)
            .map(|offset| self.header_skip + offset)
            .take_while(|&pos| pos < end)
            .take(limit)
            .map(|pos| frame.bytes[pos])
            .collect()
    }

    /// Uniform sub-sampling of the body down to at most `pixel_budget` pixels
    pub fn pixels(&self, frame: &Frame, pixel_budget: usize) -> Vec<u8> {
        if pixel_budget == 0 {
            return Vec::new();
        }

        let effective = sanitize_frame_length(frame.declared_length());
        let end = self.readable_end(frame, effective);
        let body_len = effective.saturating_sub(self.header_skip);
        let step = body_len / pixel_budget + 1;

        (0..body_len)
            .step_by(step)
            .map(|offset| self.header_skip + offset)
            .take_while(|&pos| pos < end)
            .take(pixel_budget)
            .map(|pos| frame.bytes[pos])
            .collect()
    }

    fn readable_end(&self, frame: &Frame, effective: usize) -> usize {
        effective.min(frame.len())
    }
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::from_config(&SamplingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Frame {
        Frame::from_bytes((0..len).map(|i| (i % 256) as u8).collect())
    }

    #[test]
    fn test_sample_uses_stride_after_header() {
        let sampler = FrameSampler::default();
        let frame = ramp(6000);
        let samples = sampler.sample(&frame, 100);

        assert_eq!(samples.len(), 100);
        assert_eq!(samples[0], 200);
        assert_eq!(samples[1], ((200 + 30) % 256) as u8);
    }

    #[test]
    fn test_sample_respects_budget() {
        let sampler = FrameSampler::default();
        assert_eq!(sampler.sample(&ramp(6000), 12).len(), 12);
    }

    #[test]
    fn test_short_frame_yields_few_samples() {
        let sampler = FrameSampler::default();
        // 500 declared bytes: body offsets 0..300 fit before the end
        let samples = sampler.sample(&ramp(500), 100);
        assert_eq!(samples.len(), 10);
    }

    #[test]
    fn test_frame_shorter_than_header_is_empty() {
        let sampler = FrameSampler::default();
        assert!(sampler.sample(&ramp(150), 100).is_empty());
        assert!(sampler.pixels(&ramp(150), 400).is_empty());
    }

    #[test]
    fn test_corrupted_length_is_bounded_by_bytes() {
        let sampler = FrameSampler::default();
        let frame = Frame::new(vec![7; 1000], 0);
        let samples = sampler.sample(&frame, 100);
        // Fallback length is 8192 but only 800 body bytes exist
        assert_eq!(samples.len(), 27);
        assert!(samples.iter().all(|&b| b == 7));
    }

    #[test]
    fn test_pixels_step_and_budget() {
        let sampler = FrameSampler::default();
        let frame = ramp(6000);
        let pixels = sampler.pixels(&frame, 400);

        // body 5800 bytes, step 5800 / 400 + 1 = 15
        assert_eq!(pixels.len(), 387);
        assert_eq!(pixels[0], 200);
        assert_eq!(pixels[1], 215);
    }

    #[test]
    fn test_pixels_small_body() {
        let sampler = FrameSampler::default();
        let pixels = sampler.pixels(&ramp(300), 400);
        assert_eq!(pixels.len(), 100);
    }
}
