//! Engine configuration.
//!
//! Everything here is decided before the audio thread starts. Values that can
//! change later (sample rate, block size, tempo) have matching setters on
//! [`PolySynth`](crate::synth::poly::PolySynth).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{error::SynthError, Frequency, Number, MAX_BLOCK_SIZE};

/// Number of rendered samples between two idle-voice collections.
pub const DEFAULT_GC_INTERVAL_SAMPLES: usize = 8000;

/// Level below which a decaying envelope counts as silent.
pub const DEFAULT_GC_THRESHOLD: Number = 0.000_001;

pub const DEFAULT_MESSAGE_QUEUE_SIZE: usize = 8192;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    pub sample_rate: Frequency,
    pub block_size: usize,
    pub message_queue_size: usize,
    pub gc_interval_samples: usize,
    pub gc_threshold: Number,
    pub bpm: Number,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            block_size: MAX_BLOCK_SIZE,
            message_queue_size: DEFAULT_MESSAGE_QUEUE_SIZE,
            gc_interval_samples: DEFAULT_GC_INTERVAL_SAMPLES,
            gc_threshold: DEFAULT_GC_THRESHOLD,
            bpm: 120.0,
        }
    }
}

impl SynthConfig {
    pub fn with_sample_rate(mut self, sample_rate: Frequency) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_message_queue_size(mut self, size: usize) -> Self {
        self.message_queue_size = size;
        self
    }

    /// Tune idle-voice collection: how often it runs and how quiet a voice
    /// must be to get reclaimed.
    pub fn with_garbage_collection(mut self, interval_samples: usize, threshold: Number) -> Self {
        self.gc_interval_samples = interval_samples;
        self.gc_threshold = threshold;
        self
    }

    pub fn with_bpm(mut self, bpm: Number) -> Self {
        self.bpm = bpm;
        self
    }

    pub fn validate(&self) -> Result<(), SynthError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(invalid("sample_rate", format!("{} is not a positive rate", self.sample_rate)));
        }

        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(invalid(
                "block_size",
                format!("{} is outside 1..={}", self.block_size, MAX_BLOCK_SIZE),
            ));
        }

        if self.message_queue_size == 0 {
            return Err(invalid("message_queue_size", "must hold at least one message".into()));
        }

        if self.gc_interval_samples == 0 {
            return Err(invalid("gc_interval_samples", "must be positive".into()));
        }

        if !(self.gc_threshold >= 0.0) {
            return Err(invalid("gc_threshold", format!("{} is negative", self.gc_threshold)));
        }

        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(invalid("bpm", format!("{} is not a positive tempo", self.bpm)));
        }

        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> SynthError {
    SynthError::InvalidConfig { field, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SynthConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_oversized_block() {
        let config = SynthConfig::default().with_block_size(MAX_BLOCK_SIZE + 1);

        match config.validate() {
            Err(SynthError::InvalidConfig { field, .. }) => assert_eq!(field, "block_size"),
            other => panic!("expected block_size error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_non_positive_sample_rate() {
        assert!(SynthConfig::default().with_sample_rate(0.0).validate().is_err());
        assert!(SynthConfig::default().with_sample_rate(f64::NAN).validate().is_err());
    }

    #[test]
    fn garbage_collection_policy_is_configurable() {
        let config = SynthConfig::default().with_garbage_collection(512, 0.001);

        assert_eq!(config.gc_interval_samples, 512);
        assert!((config.gc_threshold - 0.001).abs() < 1e-12);
        assert_eq!(config.validate(), Ok(()));
    }
}
