// src/processing/confirmation.rs
//! Temporal confirmation of raw per-cycle finger counts

use tracing::{debug, info};

use crate::config::constants::detection::{
    CONFIRMATION_REQUIRED, LABEL_COUNT, MAX_FINGERS, MIN_FINGERS, MIN_VOTING_SAMPLES, SMOOTHING_WINDOW,
};

fn is_finger_count(value: u8) -> bool {
    (MIN_FINGERS..=MAX_FINGERS).contains(&value)
}

/// Turns a stream of raw decisions into confirmed counts
pub trait ConfirmationFilter: Send {
    /// Feed one raw decision; returns a count once it is stable
    fn observe(&mut self, raw: u8) -> Option<u8>;

    /// Forget all history
    fn reset(&mut self);
}

/// Fixed-capacity ring of the most recent raw labels
#[derive(Debug, Clone)]
pub struct SmoothingBuffer {
    slots: Vec<u8>,
    next: usize,
    full: bool,
    label_count: usize,
}

impl SmoothingBuffer {
    pub fn new(capacity: usize, label_count: usize) -> Self {
        Self {
            slots: vec![0; capacity.max(1)],
            next: 0,
            full: false,
            label_count,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Whether the ring has wrapped at least once
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Samples that take part in a vote
    pub fn valid_len(&self) -> usize {
        if self.full { self.slots.len() } else { self.next }
    }

    pub fn push(&mut self, label: u8) {
        self.slots[self.next] = label;
        self.next = (self.next + 1) % self.slots.len();
        if self.next == 0 {
            self.full = true;
        }
    }

    pub fn latest(&self) -> Option<u8> {
        if self.valid_len() == 0 {
            return None;
        }
        let index = (self.next + self.slots.len() - 1) % self.slots.len();
        Some(self.slots[index])
    }

    /// Majority label over the valid window, lowest label on ties
    ///
    /// Before the ring wraps and while fewer than three samples exist, the
    /// most recent sample is returned unchanged.
    pub fn smoothed(&self) -> u8 {
        if !self.full && self.next < MIN_VOTING_SAMPLES {
            return self.latest().unwrap_or(0);
        }

        let mut counts = vec![0usize; self.label_count];
        for &label in &self.slots[..self.valid_len()] {
            if let Some(count) = counts.get_mut(label as usize) {
                *count += 1;
            }
        }

        let mut winner = 0;
        for (label, &count) in counts.iter().enumerate().skip(1) {
            if count > counts[winner] {
                winner = label;
            }
        }
        winner as u8
    }

    pub fn clear(&mut self) {
        self.slots.fill(0);
        self.next = 0;
        self.full = false;
    }
}

/// Majority vote over the last `window` accepted model decisions
#[derive(Debug, Clone)]
pub struct MajorityVoteFilter {
    buffer: SmoothingBuffer,
}

impl MajorityVoteFilter {
    pub fn new(window: usize, label_count: usize) -> Self {
        Self {
            buffer: SmoothingBuffer::new(window, label_count),
        }
    }

    pub fn push(&mut self, label: u8) {
        self.buffer.push(label);
    }

    pub fn smoothed(&self) -> u8 {
        self.buffer.smoothed()
    }

    pub fn buffer(&self) -> &SmoothingBuffer {
        &self.buffer
    }
}

impl Default for MajorityVoteFilter {
    fn default() -> Self {
        Self::new(SMOOTHING_WINDOW, LABEL_COUNT)
    }
}

impl ConfirmationFilter for MajorityVoteFilter {
    /// Confirms only a finger count that wins a real vote (three samples or more)
    fn observe(&mut self, raw: u8) -> Option<u8> {
        self.push(raw);
        let smoothed = self.smoothed();
        let votes = self.buffer.valid_len();
        debug!(raw, smoothed, votes, "majority vote");

        if votes >= MIN_VOTING_SAMPLES && is_finger_count(smoothed) {
            info!(fingers = smoothed, votes, "finger count confirmed by vote");
            Some(smoothed)
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
    }
}

/// Confirms a count seen on `required` consecutive cycles
#[derive(Debug, Clone)]
pub struct ConsecutiveMatchFilter {
    required: u32,
    last_count: u8,
    streak: u32,
}

impl ConsecutiveMatchFilter {
    pub fn new(required: u32) -> Self {
        Self {
            required: required.max(1),
            last_count: 0,
            streak: 0,
        }
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn last_count(&self) -> u8 {
        self.last_count
    }
}

impl Default for ConsecutiveMatchFilter {
    fn default() -> Self {
        Self::new(CONFIRMATION_REQUIRED)
    }
}

impl ConfirmationFilter for ConsecutiveMatchFilter {
    fn observe(&mut self, raw: u8) -> Option<u8> {
        if !is_finger_count(raw) {
            self.reset();
            return None;
        }

        if raw == self.last_count {
            self.streak += 1;
        } else {
            self.last_count = raw;
            self.streak = 1;
        }
        debug!(raw, streak = self.streak, "consecutive match");

        if self.streak >= self.required {
            info!(fingers = raw, streak = self.streak, "finger count confirmed");
            self.reset();
            return Some(raw);
        }
        None
    }

    fn reset(&mut self) {
        self.last_count = 0;
        self.streak = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_with(labels: &[u8]) -> SmoothingBuffer {
        let mut buffer = SmoothingBuffer::new(5, 6);
        for &label in labels {
            buffer.push(label);
        }
        buffer
    }

    #[test]
    fn test_majority_wins() {
        assert_eq!(buffer_with(&[1, 1, 1, 2, 2]).smoothed(), 1);
    }

    #[test]
    fn test_tie_goes_to_lowest_label() {
        assert_eq!(buffer_with(&[1, 1, 2, 2, 3]).smoothed(), 1);
        assert_eq!(buffer_with(&[3, 3, 2, 2, 0]).smoothed(), 2);
    }

    #[test]
    fn test_latest_returned_before_three_samples() {
        assert_eq!(buffer_with(&[]).smoothed(), 0);
        assert_eq!(buffer_with(&[4]).smoothed(), 4);
        assert_eq!(buffer_with(&[4, 2]).smoothed(), 2);
        assert_eq!(buffer_with(&[4, 2, 2]).smoothed(), 2);
    }

    #[test]
    fn test_partial_window_votes_over_written_samples() {
        // Unwritten slots hold 0 but must not count
        assert_eq!(buffer_with(&[3, 3, 1]).smoothed(), 3);
    }

    #[test]
    fn test_ring_overwrites_oldest() {
        let buffer = buffer_with(&[1, 1, 1, 1, 1, 4, 4, 4]);
        assert!(buffer.is_full());
        assert_eq!(buffer.valid_len(), 5);
        assert_eq!(buffer.smoothed(), 4);
        assert_eq!(buffer.latest(), Some(4));
    }

    #[test]
    fn test_out_of_range_labels_are_not_counted() {
        assert_eq!(buffer_with(&[9, 9, 9, 2]).smoothed(), 2);
    }

    #[test]
    fn test_vote_filter_needs_three_samples() {
        let mut filter = MajorityVoteFilter::default();
        assert_eq!(filter.observe(2), None);
        assert_eq!(filter.observe(2), None);
        assert_eq!(filter.observe(2), Some(2));
    }

    #[test]
    fn test_vote_filter_never_confirms_zero() {
        let mut filter = MajorityVoteFilter::default();
        for _ in 0..5 {
            assert_eq!(filter.observe(0), None);
        }
        filter.reset();
        assert_eq!(filter.buffer().valid_len(), 0);
    }

    #[test]
    fn test_consecutive_confirms_on_third() {
        let mut filter = ConsecutiveMatchFilter::default();
        assert_eq!(filter.observe(2), None);
        assert_eq!(filter.observe(2), None);
        assert_eq!(filter.observe(2), Some(2));
        assert_eq!(filter.streak(), 0);
        assert_eq!(filter.observe(2), None);
        assert_eq!(filter.streak(), 1);
    }

    #[test]
    fn test_zero_resets_streak() {
        let mut filter = ConsecutiveMatchFilter::default();
        assert_eq!(filter.observe(2), None);
        assert_eq!(filter.observe(2), None);
        assert_eq!(filter.observe(0), None);
        assert_eq!(filter.streak(), 0);
        assert_eq!(filter.observe(2), None);
        assert_eq!(filter.streak(), 1);
    }

    #[test]
    fn test_change_restarts_streak() {
        let mut filter = ConsecutiveMatchFilter::default();
        filter.observe(3);
        filter.observe(3);
        filter.observe(4);
        assert_eq!(filter.last_count(), 4);
        assert_eq!(filter.streak(), 1);
    }

    #[test]
    fn test_out_of_range_never_confirms() {
        let mut filter = ConsecutiveMatchFilter::default();
        for _ in 0..10 {
            assert_eq!(filter.observe(6), None);
        }
    }
}
