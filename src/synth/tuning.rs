use crate::{dsp::math::randomize, Frequency, Number};

/*
Tuning
======

Each voice role picks one of sixteen tuning schemes (the MTUN / CTUN
parameters):

  0       12-TET, A4 = 440 Hz
  1 - 6   12-TET at 440 Hz with analog-style inaccuracy, levels 1 to 6
  7       12-TET, A4 = 432 Hz
  8 - 13  12-TET at 432 Hz with inaccuracy, levels 1 to 6
  14      external table, read when the note starts
  15      external table, followed while the note plays

Inaccuracy is a number in [0.1, 1] per voice, re-rolled on every note. It is
mapped to a detune in cents that depends on the level:

  level   1          2        3          4        5        6
  cents   1.5i-0.3   3i-0.6   9i-3.5     3i-0.6   20i-8    30i-14

Levels 2 and 5 share one synth-wide inaccuracy (every voice is off by the
same amount, like a detuned instrument); the others use the voice's own.
Inaccurate voices are also unstable: whenever their pitch settles they drift
to a freshly rolled inaccuracy.
*/

pub const NOTES: usize = 128;
pub const CHANNELS: usize = 16;

/// Minimum time an externally retuned note takes to reach its new pitch.
pub const MTS_RAMP_MIN: Number = 0.003;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    A440,
    A432,
}

impl Reference {
    pub fn frequency(self) -> Frequency {
        match self {
            Reference::A440 => 440.0,
            Reference::A432 => 432.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tuning {
    EqualTemperament(Reference),
    /// Inaccuracy level 1 to 6.
    Inaccurate(Reference, u8),
    MtsNoteOn,
    MtsRealtime,
}

impl Tuning {
    pub const COUNT: u8 = 16;

    pub fn from_byte(value: u8) -> Self {
        match value {
            0 => Tuning::EqualTemperament(Reference::A440),
            1..=6 => Tuning::Inaccurate(Reference::A440, value),
            7 => Tuning::EqualTemperament(Reference::A432),
            8..=13 => Tuning::Inaccurate(Reference::A432, value - 7),
            14 => Tuning::MtsNoteOn,
            _ => Tuning::MtsRealtime,
        }
    }

    pub fn is_inaccurate(self) -> bool {
        matches!(self, Tuning::Inaccurate(..))
    }

    /// Whether the inaccuracy is shared by all voices.
    pub fn is_synced(self) -> bool {
        matches!(self, Tuning::Inaccurate(_, 2) | Tuning::Inaccurate(_, 5))
    }

    /// Detune in cents for the given inaccuracy; zero for accurate schemes.
    pub fn detune(self, inaccuracy: Number) -> Number {
        let Tuning::Inaccurate(_, level) = self else {
            return 0.0;
        };

        match level {
            1 => 1.5 * inaccuracy - 0.3,
            2 | 4 => 3.0 * inaccuracy - 0.6,
            3 => 9.0 * inaccuracy - 3.5,
            5 => 20.0 * inaccuracy - 8.0,
            _ => 30.0 * inaccuracy - 14.0,
        }
    }
}

/// Roll the next inaccuracy from the previous one.
pub fn next_inaccuracy(seed: Number) -> Number {
    0.1 + 0.9 * randomize(1.0, seed)
}

/// Time an unstable voice takes to drift to a new inaccuracy.
pub fn drift_time(inaccuracy: Number) -> Number {
    0.3 + 1.7 * inaccuracy
}

/// A note whose frequency an external tuning source reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteTuning {
    pub channel: u8,
    pub note: u8,
    pub frequency: Frequency,
}

impl Default for NoteTuning {
    fn default() -> Self {
        Self {
            channel: 0,
            note: 0,
            frequency: 0.0,
        }
    }
}

/// Note frequencies: the two fixed 12-TET tables plus a per-channel table
/// written by an external microtonal source.
#[derive(Debug, Clone)]
pub struct TuningTable {
    a440: [Frequency; NOTES],
    a432: [Frequency; NOTES],
    external: Vec<[Frequency; NOTES]>,
}

impl TuningTable {
    pub fn new() -> Self {
        let a440 = equal_temperament(Reference::A440);

        Self {
            a440,
            a432: equal_temperament(Reference::A432),
            external: vec![a440; CHANNELS],
        }
    }

    /// Base frequency of `note`, before any inaccuracy.
    pub fn frequency(&self, tuning: Tuning, channel: u8, note: u8) -> Frequency {
        let note = (note as usize).min(NOTES - 1);

        match tuning {
            Tuning::EqualTemperament(Reference::A440) | Tuning::Inaccurate(Reference::A440, _) => self.a440[note],
            Tuning::EqualTemperament(Reference::A432) | Tuning::Inaccurate(Reference::A432, _) => self.a432[note],
            Tuning::MtsNoteOn | Tuning::MtsRealtime => {
                let channel = (channel as usize).min(CHANNELS - 1);
                self.external[channel][note]
            }
        }
    }

    /// Returns `false` when the channel, note or frequency is unusable.
    pub fn update(&mut self, channel: u8, note: u8, frequency: Frequency) -> bool {
        if channel as usize >= CHANNELS || note as usize >= NOTES {
            return false;
        }

        if !(frequency.is_finite() && frequency > 0.0) {
            return false;
        }

        self.external[channel as usize][note as usize] = frequency;
        true
    }
}

impl Default for TuningTable {
    fn default() -> Self {
        Self::new()
    }
}

fn equal_temperament(reference: Reference) -> [Frequency; NOTES] {
    let mut table = [0.0; NOTES];

    for (note, frequency) in table.iter_mut().enumerate() {
        *frequency = reference.frequency() * ((note as Number - 69.0) / 12.0).exp2();
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_mapping() {
        assert_eq!(Tuning::from_byte(0), Tuning::EqualTemperament(Reference::A440));
        assert_eq!(Tuning::from_byte(6), Tuning::Inaccurate(Reference::A440, 6));
        assert_eq!(Tuning::from_byte(7), Tuning::EqualTemperament(Reference::A432));
        assert_eq!(Tuning::from_byte(9), Tuning::Inaccurate(Reference::A432, 2));
        assert_eq!(Tuning::from_byte(14), Tuning::MtsNoteOn);
        assert_eq!(Tuning::from_byte(15), Tuning::MtsRealtime);

        assert!(Tuning::from_byte(2).is_synced());
        assert!(Tuning::from_byte(12).is_synced());
        assert!(!Tuning::from_byte(3).is_synced());
        assert!(!Tuning::from_byte(0).is_inaccurate());
    }

    #[test]
    fn equal_temperament_tables() {
        let table = TuningTable::new();

        assert!((table.frequency(Tuning::from_byte(0), 0, 69) - 440.0).abs() < 1e-9);
        assert!((table.frequency(Tuning::from_byte(0), 0, 81) - 880.0).abs() < 1e-9);
        assert!((table.frequency(Tuning::from_byte(7), 0, 69) - 432.0).abs() < 1e-9);
        assert!((table.frequency(Tuning::from_byte(0), 0, 60) - 261.625_565).abs() < 1e-5);
    }

    #[test]
    fn external_table_per_channel() {
        let mut table = TuningTable::new();

        assert!(table.update(3, 60, 256.0));
        assert!(!table.update(16, 60, 256.0));
        assert!(!table.update(3, 60, -1.0));

        assert!((table.frequency(Tuning::MtsNoteOn, 3, 60) - 256.0).abs() < 1e-12);
        assert!((table.frequency(Tuning::MtsRealtime, 2, 69) - 440.0).abs() < 1e-9);
    }

    #[test]
    fn inaccurate_detune_per_level() {
        let detune = |byte, i| Tuning::from_byte(byte).detune(i);

        assert!((detune(1, 1.0) - 1.2).abs() < 1e-12);
        assert!((detune(3, 0.5) - 1.0).abs() < 1e-12);
        assert!((detune(5, 0.4) - 0.0).abs() < 1e-12);
        assert!((detune(13, 1.0) - 16.0).abs() < 1e-12);
        assert_eq!(detune(0, 1.0), 0.0);
    }

    #[test]
    fn inaccuracy_stays_in_range() {
        let mut inaccuracy = 0.5;

        for _ in 0..1000 {
            inaccuracy = next_inaccuracy(inaccuracy);
            assert!((0.1..=1.0).contains(&inaccuracy));
        }

        assert!((drift_time(1.0) - 2.0).abs() < 1e-12);
    }
}
