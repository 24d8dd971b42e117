//! Envelope descriptors.
//!
//! The six synth-wide envelopes are plain groups of parameters in the bank.
//! When a voice triggers, the group is read once into an [`EnvelopeSnapshot`]
//! and the snapshot is what gets scheduled onto the voice's parameters, so a
//! knob turned mid-note only matters to dynamic envelopes.

use crate::{
    param::{
        bank::ParamBank,
        ids::{EnvelopeByteParam, EnvelopeParam, ParamId},
    },
    Number, Seconds,
};

/// Curvature of an envelope stage, applied as `x^exponent` over the ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeShape {
    Linear,
    Quadratic,
    Cubic,
    SquareRoot,
    CubeRoot,
}

impl EnvelopeShape {
    pub const COUNT: u8 = 5;

    pub fn from_byte(value: u8) -> Self {
        match value {
            0 => EnvelopeShape::Linear,
            1 => EnvelopeShape::Quadratic,
            2 => EnvelopeShape::Cubic,
            3 => EnvelopeShape::SquareRoot,
            _ => EnvelopeShape::CubeRoot,
        }
    }

    pub fn exponent(self) -> Number {
        match self {
            EnvelopeShape::Linear => 1.0,
            EnvelopeShape::Quadratic => 2.0,
            EnvelopeShape::Cubic => 3.0,
            EnvelopeShape::SquareRoot => 0.5,
            EnvelopeShape::CubeRoot => 1.0 / 3.0,
        }
    }
}

/// One envelope's settings, frozen at trigger time.
///
/// Values are ratios (`[0, 1]`, amount already applied); times are seconds
/// (tempo sync already resolved).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeSnapshot {
    pub dynamic: bool,
    pub initial_value: Number,
    pub peak_value: Number,
    pub sustain_value: Number,
    pub final_value: Number,
    pub delay_time: Seconds,
    pub attack_time: Seconds,
    pub hold_time: Seconds,
    pub decay_time: Seconds,
    pub release_time: Seconds,
    pub attack_shape: EnvelopeShape,
    pub decay_shape: EnvelopeShape,
    pub release_shape: EnvelopeShape,
}

impl EnvelopeSnapshot {
    /// Read envelope `index` out of the bank.
    ///
    /// `random` is the triggering voice's random number in `[0, 1]`; it
    /// drives the time and value inaccuracy of this trigger.
    pub fn new(bank: &ParamBank, index: usize, bpm: Number, random: Number) -> Self {
        let float = |param| bank.float(ParamId::envelope(index, param)).value();
        let byte = |param| bank.byte(ParamId::envelope_byte(index, param)).value();

        let amount = float(EnvelopeParam::Amount);
        let time_inaccuracy = float(EnvelopeParam::TimeInaccuracy);
        let value_inaccuracy = float(EnvelopeParam::ValueInaccuracy);
        let tempo_sync = byte(EnvelopeByteParam::TempoSync) != 0;

        let value = |param| randomize_value(amount * float(param), random, value_inaccuracy);
        let time = |param| {
            let id = ParamId::envelope(index, param);
            let to_seconds = |beats_or_seconds: Number| {
                if tempo_sync {
                    beats_or_seconds * 60.0 / bpm
                } else {
                    beats_or_seconds
                }
            };

            randomize_time(
                to_seconds(bank.float(id).value()),
                to_seconds(id.descriptor().max),
                random,
                time_inaccuracy,
            )
        };

        Self {
            dynamic: byte(EnvelopeByteParam::Dynamic) != 0,
            initial_value: value(EnvelopeParam::InitialValue),
            peak_value: value(EnvelopeParam::PeakValue),
            sustain_value: value(EnvelopeParam::SustainValue),
            final_value: value(EnvelopeParam::FinalValue),
            delay_time: time(EnvelopeParam::DelayTime),
            attack_time: time(EnvelopeParam::AttackTime),
            hold_time: time(EnvelopeParam::HoldTime),
            decay_time: time(EnvelopeParam::DecayTime),
            release_time: time(EnvelopeParam::ReleaseTime),
            attack_shape: EnvelopeShape::from_byte(byte(EnvelopeByteParam::AttackShape)),
            decay_shape: EnvelopeShape::from_byte(byte(EnvelopeByteParam::DecayShape)),
            release_shape: EnvelopeShape::from_byte(byte(EnvelopeByteParam::ReleaseShape)),
        }
    }
}

fn randomize_value(value: Number, random: Number, inaccuracy: Number) -> Number {
    (((random - 0.5) * inaccuracy + 1.0) * value).min(1.0)
}

fn randomize_time(time: Seconds, max: Seconds, random: Number, inaccuracy: Number) -> Seconds {
    (random * inaccuracy * 0.3 + time).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_inaccuracy() {
        let bank = ParamBank::new(64, 44_100.0);
        let snapshot = EnvelopeSnapshot::new(&bank, 0, 120.0, 0.9);

        assert!(!snapshot.dynamic);
        assert!((snapshot.initial_value - 0.0).abs() < 1e-12);
        assert!((snapshot.peak_value - 1.0).abs() < 1e-12);
        assert!((snapshot.sustain_value - 0.7).abs() < 1e-12);
        assert!((snapshot.attack_time - 0.02).abs() < 1e-12);
        assert!((snapshot.hold_time - 0.3).abs() < 1e-12);
        assert!((snapshot.decay_time - 0.6).abs() < 1e-12);
        assert!((snapshot.release_time - 0.1).abs() < 1e-12);
        assert_eq!(snapshot.attack_shape, EnvelopeShape::Linear);
    }

    #[test]
    fn tempo_sync_reads_times_as_beats() {
        let mut bank = ParamBank::new(64, 44_100.0);
        bank.byte_mut(ParamId::envelope_byte(1, EnvelopeByteParam::TempoSync)).set_value(1);
        bank.float_mut(ParamId::envelope(1, EnvelopeParam::ReleaseTime)).set_value(2.0);

        let snapshot = EnvelopeSnapshot::new(&bank, 1, 180.0, 0.5);

        assert!((snapshot.release_time - 2.0 * 60.0 / 180.0).abs() < 1e-9);
    }

    #[test]
    fn amount_scales_values() {
        let mut bank = ParamBank::new(64, 44_100.0);
        bank.float_mut(ParamId::envelope(2, EnvelopeParam::Amount)).set_value(0.5);

        let snapshot = EnvelopeSnapshot::new(&bank, 2, 120.0, 0.5);

        assert!((snapshot.peak_value - 0.5).abs() < 1e-12);
        assert!((snapshot.sustain_value - 0.35).abs() < 1e-12);
    }

    #[test]
    fn inaccuracy_is_bounded() {
        assert!(randomize_value(0.9, 1.0, 1.0) <= 1.0);
        assert!((randomize_value(0.4, 0.5, 1.0) - 0.4).abs() < 1e-12);
        assert!((randomize_time(5.9, 6.0, 1.0, 1.0) - 6.0).abs() < 1e-12);
        assert!((randomize_time(0.1, 6.0, 1.0, 1.0) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn shapes_map_to_exponents() {
        let exponents: Vec<Number> = (0..EnvelopeShape::COUNT)
            .map(|b| EnvelopeShape::from_byte(b).exponent())
            .collect();

        assert_eq!(exponents[..4], [1.0, 2.0, 3.0, 0.5]);
        assert!((exponents[4] - 1.0 / 3.0).abs() < 1e-12);
    }
}
