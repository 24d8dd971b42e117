use std::f64::consts::PI;
use std::sync::OnceLock;

use crate::{
    dsp::math::{lagrange_3, lerp},
    Frequency, Number, Sample,
};

/*
Band-limited Wavetables
=======================

A naive sawtooth contains harmonics all the way up, and every harmonic above
Nyquist folds back into the audible range as inharmonic noise (aliasing). A
wavetable avoids this by precomputing one single-cycle table per partial count:

  table[0]  = c1·sin(x)
  table[1]  = c1·sin(x) + c2·sin(2x)
  table[2]  = c1·sin(x) + c2·sin(2x) + c3·sin(3x)
  ...

While playing frequency f, at most floor(nyquist / f) partials fit below
Nyquist, so lookup picks that table. When pitch rises the number of partials
that fit drops; to avoid an audible step, output crossfades between the two
neighbouring tables by the fractional partial count:

  max = nyquist / f            e.g. 7.3
  out = 0.3 · table[7 partials] + 0.7 · table[6 partials]

As max approaches 8 from below, the 7th partial fades in completely, and at
exactly 8 the crossfade restarts one table higher, so the output is continuous.

All tables share one normalization factor, the highest peak across the whole
family, so adding harmonics never makes the waveform louder.

Interpolation between table entries:
  - below `interpolation_limit` each entry is visited many times per cycle,
    so 3-point Lagrange keeps the curve smooth
  - above it, linear interpolation is accurate enough and cheaper
*/

pub const SIZE: usize = 0x0800;
pub const MASK: usize = SIZE - 1;
pub const SIZE_FLOAT: Number = SIZE as Number;

/// Maximum partial count of the standard waveforms.
pub const PARTIALS: usize = 384;

/// Harmonic count of the user-editable spectrum.
pub const CUSTOM_PARTIALS: usize = 10;

const ALMOST_ZERO: Frequency = 0.000_000_1;

static SINE_TABLE: OnceLock<Box<[Number]>> = OnceLock::new();

fn sine_table() -> &'static [Number] {
    SINE_TABLE.get_or_init(|| {
        (0..SIZE)
            .map(|i| (2.0 * PI * i as Number / SIZE_FLOAT).sin())
            .collect()
    })
}

/// Per-oscillator lookup state: phase position plus the rate-derived
/// constants that only change when the sample rate does.
#[derive(Debug, Clone)]
pub struct WavetableState {
    sample_index: Number,
    scale: Number,
    nyquist: Frequency,
    interpolation_limit: Frequency,
}

impl WavetableState {
    pub fn new(sample_rate: Frequency) -> Self {
        let mut state = Self {
            sample_index: 0.0,
            scale: 0.0,
            nyquist: 0.0,
            interpolation_limit: 0.0,
        };
        state.set_sample_rate(sample_rate);
        state
    }

    pub fn set_sample_rate(&mut self, sample_rate: Frequency) {
        self.scale = SIZE_FLOAT / sample_rate;
        self.nyquist = sample_rate * 0.5;
        self.interpolation_limit = self.nyquist / (2.0 * SIZE_FLOAT);
    }

    /// Restart the cycle at `phase` (in cycles, `[0, 1)`).
    pub fn reset(&mut self, phase: Number) {
        self.sample_index = wrap(phase * SIZE_FLOAT);
    }

    pub fn nyquist(&self) -> Frequency {
        self.nyquist
    }
}

#[inline]
fn wrap(index: Number) -> Number {
    let wrapped = index % SIZE_FLOAT;

    if wrapped < 0.0 {
        wrapped + SIZE_FLOAT
    } else {
        wrapped
    }
}

/// A family of band-limited single-cycle tables built from one spectrum.
pub struct Wavetable {
    partials: usize,
    coefficients: Vec<Number>,
    tables: Vec<Vec<Sample>>,
}

impl Wavetable {
    /// Build one table per partial count from harmonic `coefficients`
    /// (`coefficients[0]` is the fundamental).
    pub fn new(coefficients: &[Number]) -> Self {
        let partials = coefficients.len().clamp(1, PARTIALS);
        let mut wavetable = Self {
            partials,
            coefficients: vec![0.0; partials],
            tables: vec![vec![0.0; SIZE]; partials],
        };
        wavetable.update_coefficients(coefficients);
        wavetable
    }

    pub fn is_sine_table_initialized() -> bool {
        SINE_TABLE.get().is_some()
    }

    pub fn partials(&self) -> usize {
        self.partials
    }

    /// Rebuild all tables in place from a new spectrum of the same size.
    ///
    /// Does not allocate; extra coefficients are ignored and missing ones are
    /// treated as zero.
    pub fn update_coefficients(&mut self, coefficients: &[Number]) {
        for (i, slot) in self.coefficients.iter_mut().enumerate() {
            *slot = coefficients.get(i).copied().unwrap_or(0.0);
        }

        let sine = sine_table();
        let mut peak: Number = 0.0;

        for p in 0..self.partials {
            let coefficient = self.coefficients[p];
            let harmonic = p + 1;

            for j in 0..SIZE {
                let below = if p == 0 { 0.0 } else { self.tables[p - 1][j] as Number };
                let value = below + coefficient * sine[(j * harmonic) & MASK];
                peak = peak.max(value.abs());
                self.tables[p][j] = value as Sample;
            }
        }

        if peak > ALMOST_ZERO {
            let normalization = (1.0 / peak) as Sample;

            for table in self.tables.iter_mut() {
                for sample in table.iter_mut() {
                    *sample *= normalization;
                }
            }
        }
    }

    /// Produce the next sample for `frequency`, then advance the phase.
    ///
    /// `phase_offset` shifts the read position by a fraction of a cycle
    /// without changing the stored phase (phase modulation).
    pub fn lookup(&self, state: &mut WavetableState, frequency: Frequency, phase_offset: Number) -> Number {
        let abs_frequency = frequency.abs();

        if abs_frequency < ALMOST_ZERO {
            return 1.0;
        }

        if abs_frequency > state.nyquist {
            return 0.0;
        }

        let position = if phase_offset == 0.0 {
            state.sample_index
        } else {
            wrap(state.sample_index + phase_offset * SIZE_FLOAT)
        };
        state.sample_index = wrap(state.sample_index + state.scale * frequency);

        let lagrange = abs_frequency < state.interpolation_limit;
        let max_partials = state.nyquist / abs_frequency;

        if max_partials >= self.partials as Number {
            return self.interpolate(self.partials - 1, position, lagrange);
        }

        let floor = max_partials.floor();
        let more_weight = max_partials - floor;
        let more_index = floor as usize - 1;
        let more = self.interpolate(more_index, position, lagrange);

        if more_index == 0 {
            return more;
        }

        let fewer = self.interpolate(more_index - 1, position, lagrange);

        more_weight * more + (1.0 - more_weight) * fewer
    }

    #[inline]
    fn interpolate(&self, table_index: usize, position: Number, lagrange: bool) -> Number {
        let table = &self.tables[table_index];
        let floor = position.floor();
        let fraction = position - floor;
        let index = floor as usize & MASK;

        if lagrange {
            let before = table[index.wrapping_sub(1) & MASK] as Number;
            let current = table[index] as Number;
            let after = table[(index + 1) & MASK] as Number;

            lagrange_3(before, current, after, fraction)
        } else {
            lerp(table[index] as Number, table[(index + 1) & MASK] as Number, fraction)
        }
    }
}

/// Standard waveform selection shared by oscillators and LFOs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Sawtooth,
    InverseSawtooth,
    Triangle,
    Square,
    Custom,
}

impl Waveform {
    pub const COUNT: u8 = 6;

    pub fn from_byte(value: u8) -> Self {
        match value {
            0 => Waveform::Sine,
            1 => Waveform::Sawtooth,
            2 => Waveform::InverseSawtooth,
            3 => Waveform::Triangle,
            4 => Waveform::Square,
            _ => Waveform::Custom,
        }
    }
}

/// The standard spectra, computed once and shared by every voice and LFO.
pub struct Waveforms {
    sine: Wavetable,
    sawtooth: Wavetable,
    triangle: Wavetable,
    square: Wavetable,
}

impl Waveforms {
    pub fn new() -> Self {
        let mut sawtooth = vec![0.0; PARTIALS];
        let mut triangle = vec![0.0; PARTIALS];
        let mut square = vec![0.0; PARTIALS];

        for (index, ((saw, tri), sq)) in sawtooth
            .iter_mut()
            .zip(triangle.iter_mut())
            .zip(square.iter_mut())
            .enumerate()
        {
            let i = (index + 1) as Number;
            let pi_i = PI * i;
            let sign = if index % 2 == 0 { 1.0 } else { -1.0 };

            *saw = sign * 2.0 / pi_i;
            *tri = 8.0 * (pi_i / 2.0).sin() / (pi_i * pi_i);
            *sq = (1.0 - (-1.0 as Number).powi(index as i32 + 1)) * 2.0 / pi_i;
        }

        Self {
            sine: Wavetable::new(&[1.0]),
            sawtooth: Wavetable::new(&sawtooth),
            triangle: Wavetable::new(&triangle),
            square: Wavetable::new(&square),
        }
    }

    pub fn sine(&self) -> &Wavetable {
        &self.sine
    }

    /// Resolve a waveform to its table and output sign. `custom` is used for
    /// [`Waveform::Custom`].
    pub fn select<'a>(&'a self, waveform: Waveform, custom: &'a Wavetable) -> WavetableRef<'a> {
        match waveform {
            Waveform::Sine => WavetableRef::new(&self.sine, 1.0),
            Waveform::Sawtooth => WavetableRef::new(&self.sawtooth, 1.0),
            Waveform::InverseSawtooth => WavetableRef::new(&self.sawtooth, -1.0),
            Waveform::Triangle => WavetableRef::new(&self.triangle, 1.0),
            Waveform::Square => WavetableRef::new(&self.square, 1.0),
            Waveform::Custom => WavetableRef::new(custom, 1.0),
        }
    }
}

impl Default for Waveforms {
    fn default() -> Self {
        Self::new()
    }
}

/// A wavetable plus the sign it is read with.
#[derive(Clone, Copy)]
pub struct WavetableRef<'a> {
    pub table: &'a Wavetable,
    pub sign: Number,
}

impl<'a> WavetableRef<'a> {
    pub fn new(table: &'a Wavetable, sign: Number) -> Self {
        Self { table, sign }
    }

    #[inline]
    pub fn lookup(&self, state: &mut WavetableState, frequency: Frequency, phase_offset: Number) -> Number {
        self.sign * self.table.lookup(state, frequency, phase_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Seconds;

    const SAMPLE_RATE: Frequency = 44_100.0;

    fn render(table: &Wavetable, frequency: Frequency, phase: Number, count: usize) -> Vec<Number> {
        let mut state = WavetableState::new(SAMPLE_RATE);
        state.reset(phase);
        (0..count).map(|_| table.lookup(&mut state, frequency, 0.0)).collect()
    }

    /// Additive reference normalized the same way the tables are.
    fn sum_of_sines(coefficients: &[Number], frequency: Frequency, phase: Number, count: usize) -> Vec<Number> {
        let sum = |x: Number| -> Number {
            coefficients
                .iter()
                .enumerate()
                .map(|(i, c)| c * ((i + 1) as Number * x).sin())
                .sum()
        };

        let mut peak: Number = 0.0;
        for p in 1..=coefficients.len() {
            for j in 0..SIZE {
                let x = 2.0 * PI * j as Number / SIZE_FLOAT;
                let partial: Number = coefficients[..p]
                    .iter()
                    .enumerate()
                    .map(|(i, c)| c * ((i + 1) as Number * x).sin())
                    .sum();
                peak = peak.max(partial.abs());
            }
        }

        (0..count)
            .map(|n| {
                let t = n as Seconds / SAMPLE_RATE;
                sum(2.0 * PI * (frequency * t + phase)) / peak
            })
            .collect()
    }

    #[test]
    fn sine_table_is_initialized_once() {
        let _ = Wavetable::new(&[1.0]);
        assert!(Wavetable::is_sine_table_initialized());

        let first = sine_table().as_ptr();
        let _ = Wavetable::new(&[0.5, 0.5]);
        assert_eq!(first, sine_table().as_ptr());
    }

    #[test]
    fn matches_sum_of_sines_below_nyquist() {
        let coefficients = [1.0, 0.5, 0.0, 0.25];
        let table = Wavetable::new(&coefficients);

        for &(frequency, phase) in &[(110.0, 0.0), (440.0, 0.25), (1234.5, 0.6), (3.0, 0.1)] {
            let actual = render(&table, frequency, phase, 4096);
            let expected = sum_of_sines(&coefficients, frequency, phase, 4096);

            for (n, (a, e)) in actual.iter().zip(&expected).enumerate() {
                assert!(
                    (a - e).abs() < 1e-3,
                    "f={frequency} phase={phase} n={n}: expected {e}, got {a}"
                );
            }
        }
    }

    #[test]
    fn near_zero_frequency_is_constant_one() {
        let table = Wavetable::new(&[1.0]);
        let output = render(&table, 0.0, 0.3, 16);
        assert!(output.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn above_nyquist_is_silent() {
        let table = Wavetable::new(&[1.0]);
        let output = render(&table, SAMPLE_RATE * 0.6, 0.0, 16);
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn fundamental_keeps_full_level_near_nyquist() {
        let coefficients = [1.0, 0.0];
        let table = Wavetable::new(&coefficients);

        // 15 kHz: less than two partials fit below 22.05 kHz
        let actual = render(&table, 15_000.0, 0.1, 512);
        let expected = sum_of_sines(&coefficients, 15_000.0, 0.1, 512);

        for (n, (a, e)) in actual.iter().zip(&expected).enumerate() {
            assert!((a - e).abs() < 1e-3, "n={n}: expected {e}, got {a}");
        }
    }

    #[test]
    fn crossfade_drops_partials_above_nyquist() {
        let waveforms = Waveforms::new();
        let custom = Wavetable::new(&[1.0]);
        let saw = waveforms.select(Waveform::Sawtooth, &custom);

        // 8 kHz at 44.1 kHz: 2.75 partials fit, so the output must stay bounded
        // and never pick up content from the 4th harmonic table.
        let mut state = WavetableState::new(SAMPLE_RATE);
        for _ in 0..4096 {
            let sample = saw.lookup(&mut state, 8_000.0, 0.0);
            assert!(sample.abs() <= 1.0 + 1e-6, "got {sample}");
        }
    }

    #[test]
    fn inverse_sawtooth_is_negated_sawtooth() {
        let waveforms = Waveforms::new();
        let custom = Wavetable::new(&[1.0]);
        let saw = waveforms.select(Waveform::Sawtooth, &custom);
        let inverse = waveforms.select(Waveform::InverseSawtooth, &custom);
        let mut a = WavetableState::new(SAMPLE_RATE);
        let mut b = WavetableState::new(SAMPLE_RATE);

        for _ in 0..256 {
            let x = saw.lookup(&mut a, 220.0, 0.0);
            let y = inverse.lookup(&mut b, 220.0, 0.0);
            assert!((x + y).abs() < 1e-12);
        }
    }

    #[test]
    fn update_coefficients_rebuilds_in_place() {
        let mut table = Wavetable::new(&[1.0, 0.0]);
        table.update_coefficients(&[0.0, 1.0]);

        let actual = render(&table, 100.0, 0.0, 512);
        let expected = sum_of_sines(&[0.0, 1.0], 100.0, 0.0, 512);

        for (a, e) in actual.iter().zip(&expected) {
            assert!((a - e).abs() < 1e-3, "expected {e}, got {a}");
        }
    }
}
