use std::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Frequency, Number, Sample};

/*
| type              | passes          | rejects      |
| ----------------- | --------------- | ------------ |
| low-pass          | below cutoff    | above cutoff |
| high-pass         | above cutoff    | below cutoff |
| band-pass         | around cutoff   | both sides   |
| notch / band-stop | outside         | around cutoff|

TPT (topology-preserving transform) state-variable filter. All four responses
come out of the same two integrators, so switching type never needs new state:

    g = tan(π · fc / fs)      prewarped integrator gain
    k = 1 / Q                 damping

Coefficients are computed per sample because the cutoff and Q of a voice
filter are sample-evaluated parameters.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

impl FilterType {
    pub const COUNT: u8 = 4;

    pub fn from_byte(value: u8) -> Self {
        match value {
            0 => FilterType::LowPass,
            1 => FilterType::HighPass,
            2 => FilterType::BandPass,
            _ => FilterType::Notch,
        }
    }
}

pub const MIN_Q: Number = 0.1;

/// Highest cutoff, relative to the sample rate, the prewarp stays stable at.
const MAX_CUTOFF_RATIO: Number = 0.49;

pub struct FilterOutputs {
    pub lowpass: Sample,
    pub bandpass: Sample,
    pub highpass: Sample,
    pub notch: Sample,
}

impl FilterOutputs {
    #[inline]
    pub fn select(&self, filter_type: FilterType) -> Sample {
        match filter_type {
            FilterType::LowPass => self.lowpass,
            FilterType::HighPass => self.highpass,
            FilterType::BandPass => self.bandpass,
            FilterType::Notch => self.notch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    pub g: f32,
    pub k: f32,
}

impl Coefficients {
    pub fn new(cutoff: Frequency, q: Number, sample_rate: Frequency) -> Self {
        let cutoff = cutoff.clamp(1.0, sample_rate * MAX_CUTOFF_RATIO);
        let g = (PI * cutoff / sample_rate).tan();
        let k = 1.0 / q.max(MIN_Q);

        Self {
            g: g as f32,
            k: k as f32,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory
}

impl SVFilter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn next_sample(&mut self, sample: Sample, coefficients: Coefficients) -> FilterOutputs {
        let Coefficients { g, k } = coefficients;
        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        FilterOutputs {
            lowpass: v2,
            bandpass: v1,
            highpass: sample - k * v1 - v2,
            notch: sample - k * v1,
        }
    }

    /// Filter a whole buffer in place with fixed coefficients.
    pub fn process(&mut self, buffer: &mut [Sample], filter_type: FilterType, coefficients: Coefficients) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample, coefficients).select(filter_type);
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}
