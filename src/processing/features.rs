// src/processing/features.rs
//! Region statistics feature vectors for the model decision path
//!
//! The pixel run is split into `feature_count` equal regions. Region `i`
//! contributes one value whose kind depends on which third of the vector `i`
//! falls in:
//!
//! | indices (20 features) | value                               |
//! |-----------------------|-------------------------------------|
//! | `0..7`                | integer mean brightness             |
//! | `7..14`               | contrast, `max - min`               |
//! | `14..20`              | edge density × 100                  |
//!
//! Boundaries sit at `ceil(n/3)` and `2·ceil(n/3)`. Integer means match the
//! data the shipped models were trained on.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::acquisition::FrameSampler;
use crate::config::constants::features::*;
use crate::config::SamplingConfig;
use crate::error::FingerTimerResult;
use crate::hal::Frame;
use crate::processing::components::{count_connected_components, threshold};

/// Fixed-length feature vector with every value in `[0, 255]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    /// Clamp `values` into range
    pub fn new(values: Vec<f32>) -> Self {
        Self(
            values
                .into_iter()
                .map(|v| if v.is_nan() { NEUTRAL_VALUE } else { v.clamp(FEATURE_MIN, FEATURE_MAX) })
                .collect(),
        )
    }

    /// All-neutral vector reported when a frame cannot be measured
    pub fn neutral(len: usize) -> Self {
        Self(vec![NEUTRAL_VALUE; len])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_neutral(&self) -> bool {
        self.0.iter().all(|&v| v == NEUTRAL_VALUE)
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl AsRef<[f32]> for FeatureVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// Meaning of a feature slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    Brightness,
    Contrast,
    EdgeDensity,
}

impl FeatureKind {
    /// Kind of slot `index` in a vector of `count` features
    pub fn for_index(index: usize, count: usize) -> Self {
        let third = count.div_ceil(3);
        if index < third {
            FeatureKind::Brightness
        } else if index < 2 * third {
            FeatureKind::Contrast
        } else {
            FeatureKind::EdgeDensity
        }
    }
}

/// Result of one extraction
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Complete(FeatureVector),
    /// Too few pixels. `neutral` is all `128.0` and must not be read as a
    /// measurement.
    Insufficient {
        neutral: FeatureVector,
        usable_pixels: usize,
    },
}

impl Extraction {
    pub fn is_complete(&self) -> bool {
        matches!(self, Extraction::Complete(_))
    }

    /// The vector either way; check `is_complete` before trusting it
    pub fn features(&self) -> &FeatureVector {
        match self {
            Extraction::Complete(features) => features,
            Extraction::Insufficient { neutral, .. } => neutral,
        }
    }

    pub fn complete(self) -> Option<FeatureVector> {
        match self {
            Extraction::Complete(features) => Some(features),
            Extraction::Insufficient { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    sampler: FrameSampler,
    feature_count: usize,
    pixel_budget: usize,
    min_usable_pixels: usize,
}

impl FeatureExtractor {
    pub fn new(sampler: FrameSampler, feature_count: usize, pixel_budget: usize, min_usable_pixels: usize) -> Self {
        Self {
            sampler,
            feature_count,
            pixel_budget,
            min_usable_pixels,
        }
    }

    pub fn from_config(config: &SamplingConfig) -> Self {
        Self::new(
            FrameSampler::from_config(config),
            config.feature_count,
            config.pixel_budget,
            config.min_usable_pixels,
        )
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn extract(&self, frame: &Frame) -> Extraction {
        let pixels = self.sampler.pixels(frame, self.pixel_budget);
        self.extract_pixels(&pixels)
    }

    /// Bright blobs in the pixel run laid out as the largest square grid
    // TODO: append the blob count to the feature vector once a model is trained with it
    #[allow(dead_code)]
    pub(crate) fn bright_regions(&self, frame: &Frame, level: u8) -> FingerTimerResult<usize> {
        let pixels = self.sampler.pixels(frame, self.pixel_budget);
        let side = (pixels.len() as f64).sqrt() as usize;
        let mut grid = pixels[..side * side].to_vec();
        threshold(&mut grid, side, side, level)?;
        count_connected_components(&grid, side, side)
    }

    /// Features from an already sub-sampled pixel run
    pub fn extract_pixels(&self, pixels: &[u8]) -> Extraction {
        if pixels.len() < self.min_usable_pixels {
            debug!(usable = pixels.len(), required = self.min_usable_pixels, "too few pixels for features");
            return Extraction::Insufficient {
                neutral: FeatureVector::neutral(self.feature_count),
                usable_pixels: pixels.len(),
            };
        }

        let n = self.feature_count;
        let region_size = if n == 0 { 0 } else { pixels.len() / n };

        let values = (0..n)
            .map(|i| {
                if region_size == 0 {
                    return NEUTRAL_VALUE;
                }
                let start = i * region_size;
                let region = &pixels[start..start + region_size];
                let stats = RegionStats::of(region);
                match FeatureKind::for_index(i, n) {
                    FeatureKind::Brightness => stats.mean as f32,
                    FeatureKind::Contrast => stats.contrast as f32,
                    FeatureKind::EdgeDensity => stats.edges as f32 / region_size as f32 * 100.0,
                }
            })
            .collect();

        Extraction::Complete(FeatureVector::new(values))
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::from_config(&SamplingConfig::default())
    }
}

struct RegionStats {
    mean: u32,
    contrast: u8,
    edges: usize,
}

impl RegionStats {
    fn of(region: &[u8]) -> Self {
        let sum: u32 = region.iter().map(|&p| p as u32).sum();
        let min = region.iter().copied().min().unwrap_or(0);
        let max = region.iter().copied().max().unwrap_or(0);
        let edges = region
            .windows(2)
            .filter(|pair| pair[0].abs_diff(pair[1]) > EDGE_DELTA)
            .count();

        Self {
            mean: sum / region.len().max(1) as u32,
            contrast: max - min,
            edges,
        }
    }
}

/// Offset/length reader over a feature slice
///
/// Inference runtimes that pull their input through a callback read through
/// this instead of a process-wide buffer. Reads past the end are zero-filled.
#[derive(Debug, Clone, Copy)]
pub struct FeatureSignal<'a> {
    features: &'a [f32],
}

impl<'a> FeatureSignal<'a> {
    pub fn new(features: &'a FeatureVector) -> Self {
        Self {
            features: features.as_slice(),
        }
    }

    pub fn from_slice(features: &'a [f32]) -> Self {
        Self { features }
    }

    pub fn total_length(&self) -> usize {
        self.features.len()
    }

    /// Copy `out.len()` values starting at `offset`; returns how many were real
    pub fn read(&self, offset: usize, out: &mut [f32]) -> usize {
        let available = self.features.get(offset..).unwrap_or(&[]);
        let copied = available.len().min(out.len());
        out[..copied].copy_from_slice(&available[..copied]);
        out[copied..].fill(0.0);
        copied
    }

    pub fn get(&self, index: usize) -> f32 {
        self.features.get(index).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::default()
    }

    #[test]
    fn test_kind_boundaries_for_twenty() {
        assert_eq!(FeatureKind::for_index(6, 20), FeatureKind::Brightness);
        assert_eq!(FeatureKind::for_index(7, 20), FeatureKind::Contrast);
        assert_eq!(FeatureKind::for_index(13, 20), FeatureKind::Contrast);
        assert_eq!(FeatureKind::for_index(14, 20), FeatureKind::EdgeDensity);
        assert_eq!(FeatureKind::for_index(19, 20), FeatureKind::EdgeDensity);
    }

    #[test]
    fn test_too_few_pixels_is_all_neutral() {
        match extractor().extract_pixels(&[200; 99]) {
            Extraction::Insufficient { neutral, usable_pixels } => {
                assert_eq!(usable_pixels, 99);
                assert_eq!(neutral.len(), 20);
                assert!(neutral.is_neutral());
            }
            other => panic!("Expected insufficient extraction, got {:?}", other),
        }
    }

    #[test]
    fn test_region_statistics() {
        // 200 pixels, 10 per region, alternating 0 / 100
        let pixels: Vec<u8> = (0..200).map(|i| if i % 2 == 0 { 0 } else { 100 }).collect();
        let features = extractor().extract_pixels(&pixels).complete().unwrap();

        assert_eq!(features.as_slice()[0], 50.0);
        assert_eq!(features.as_slice()[7], 100.0);
        // 9 edges over a region of 10
        assert!((features.as_slice()[14] - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_mean_is_truncated() {
        let pixels: Vec<u8> = (0..100).map(|i| if i % 5 == 0 { 1 } else { 0 }).collect();
        let features = extractor().extract_pixels(&pixels).complete().unwrap();
        // region of 5 sums to 1: integer mean is 0
        assert_eq!(features.as_slice()[0], 0.0);
    }

    #[test]
    fn test_values_are_clamped() {
        let vector = FeatureVector::new(vec![-3.0, 300.0, f32::NAN, 12.5]);
        assert_eq!(vector.as_slice(), &[0.0, 255.0, 128.0, 12.5]);
    }

    #[test]
    fn test_extract_from_frame() {
        let frame = Frame::from_bytes((0..6000).map(|i| (i % 256) as u8).collect());
        let extraction = extractor().extract(&frame);
        assert!(extraction.is_complete());
        assert_eq!(extraction.features().len(), 20);
    }

    #[test]
    fn test_bright_regions_of_striped_frame() {
        // 399 body bytes at step 1: the first 361 form a 19x19 grid with two bars
        let mut bytes = vec![0u8; 599];
        for (offset, byte) in bytes[200..].iter_mut().enumerate() {
            *byte = if matches!(offset % 19, 4..=7 | 12..=15) { 220 } else { 10 };
        }
        let regions = extractor().bright_regions(&Frame::from_bytes(bytes), 128).unwrap();
        assert_eq!(regions, 2);
    }

    #[test]
    fn test_signal_zero_fills_past_end() {
        let vector = FeatureVector::new(vec![1.0, 2.0, 3.0]);
        let signal = FeatureSignal::new(&vector);
        let mut out = [9.0; 4];

        assert_eq!(signal.read(1, &mut out), 2);
        assert_eq!(out, [2.0, 3.0, 0.0, 0.0]);
        assert_eq!(signal.read(10, &mut out), 0);
        assert_eq!(out, [0.0; 4]);
        assert_eq!(signal.total_length(), 3);
    }
}
