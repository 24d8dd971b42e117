//! Scalar helpers shared by parameters, oscillators and voices.
//!
//! Everything here is pure and allocation-free once the random table has been
//! built, so it is safe to call from the audio thread.

use std::sync::OnceLock;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{dsp::distortion::soft_clip, Frequency, Number};

const RANDOMS: usize = 0x0200;
const RANDOMS_MAX_INDEX: Number = (RANDOMS - 1) as Number;
const RANDOM_SEED: u64 = 0x5ab5_1e55;

static RANDOM_TABLE: OnceLock<[Number; RANDOMS]> = OnceLock::new();

/// Shift a frequency by the given amount of cents (100 cents = 1 semitone).
#[inline]
pub fn detune(frequency: Frequency, cents: Number) -> Frequency {
    frequency * (cents / 1200.0).exp2()
}

/// Deterministic pseudo-random mapping of `number` in `[0, 1]`, blended with
/// the input by `level`.
///
/// The same input always yields the same output, so randomized values are
/// reproducible across runs and can be chained as a slowly drifting sequence
/// by feeding each result back in as the next seed.
pub fn randomize(level: Number, number: Number) -> Number {
    if level < 0.000_001 {
        return number;
    }

    let table = random_table();
    let index = (number.clamp(0.0, 1.0) * RANDOMS_MAX_INDEX) as usize;
    let random = table[index.min(RANDOMS - 1)];

    (number + level * (random - number)).clamp(0.0, 1.0)
}

fn random_table() -> &'static [Number; RANDOMS] {
    RANDOM_TABLE.get_or_init(|| {
        let mut rng = SmallRng::seed_from_u64(RANDOM_SEED);
        let mut table = [0.0; RANDOMS];

        for value in table.iter_mut() {
            *value = rng.random::<Number>();
        }

        table
    })
}

/// Steepness of the S-curve used by [`distort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistortionShape {
    Gentle,
    Moderate,
    Steep,
    Harsh,
}

impl DistortionShape {
    pub const COUNT: u8 = 4;

    pub fn from_byte(value: u8) -> Self {
        match value {
            0 => DistortionShape::Gentle,
            1 => DistortionShape::Moderate,
            2 => DistortionShape::Steep,
            _ => DistortionShape::Harsh,
        }
    }

    fn drive(self) -> f32 {
        match self {
            DistortionShape::Gentle => 1.5,
            DistortionShape::Moderate => 3.0,
            DistortionShape::Steep => 6.0,
            DistortionShape::Harsh => 12.0,
        }
    }
}

/// Push a `[0, 1]` ratio towards the ends of the range along a soft-clip
/// S-curve. `level` blends between the identity (0) and the full curve (1).
pub fn distort(level: Number, number: Number, shape: DistortionShape) -> Number {
    if level < 0.000_001 {
        return number;
    }

    let drive = shape.drive();
    let centered = (2.0 * number - 1.0) as f32;
    let curved = soft_clip(centered, drive) / soft_clip(1.0, drive);
    let shaped = 0.5 + 0.5 * curved as Number;

    (number + level * (shaped - number)).clamp(0.0, 1.0)
}

#[inline]
pub fn is_close(a: Number, b: Number) -> bool {
    (a - b).abs() < 0.000_001
}

/// 3-point Lagrange interpolation around `y1` at fractional offset `t` in
/// `[-1, 1]`.
#[inline]
pub fn lagrange_3(y0: Number, y1: Number, y2: Number, t: Number) -> Number {
    let t2 = t * t;
    let a0 = 0.5 * (t2 - t);
    let a1 = 1.0 - t2;
    let a2 = 0.5 * (t2 + t);

    a0 * y0 + a1 * y1 + a2 * y2
}

#[inline]
pub fn lerp(a: Number, b: Number, t: Number) -> Number {
    a + (b - a) * t
}
