//! Controller sources a parameter can follow.
//!
//! ```text
//!   0 ..= 127   MIDI control change numbers
//!   128         pitch wheel
//!   129 / 130   note and velocity of the last triggered note
//!   131 ..= 140 macros 1-10
//!   141 ..= 148 LFOs 1-8
//!   149 ..= 154 envelopes 1-6
//!   155         channel pressure
//!   156         velocity of the last released note
//!   157         polyphonic aftertouch
//!   255         none
//! ```

use crate::{
    dsp::math::{distort, randomize, DistortionShape},
    param::{
        bank::ParamBank,
        ids::{MacroParam, ParamId, ENVELOPES, LFOS, MACROS},
    },
    Number,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerId(pub u8);

impl ControllerId {
    pub const PITCH_WHEEL: ControllerId = ControllerId(128);
    pub const TRIGGERED_NOTE: ControllerId = ControllerId(129);
    pub const TRIGGERED_VELOCITY: ControllerId = ControllerId(130);
    pub const MACRO_1: ControllerId = ControllerId(131);
    pub const LFO_1: ControllerId = ControllerId(141);
    pub const ENVELOPE_1: ControllerId = ControllerId(149);
    pub const CHANNEL_PRESSURE: ControllerId = ControllerId(155);
    pub const RELEASED_VELOCITY: ControllerId = ControllerId(156);
    pub const AFTERTOUCH: ControllerId = ControllerId(157);
    pub const NONE: ControllerId = ControllerId(255);

    /// Number of ids that carry a MIDI-driven shadow register.
    pub const MIDI_REGISTERS: usize = 158;

    pub fn macro_(index: usize) -> ControllerId {
        debug_assert!(index < MACROS);
        ControllerId(Self::MACRO_1.0 + index as u8)
    }

    pub fn lfo(index: usize) -> ControllerId {
        debug_assert!(index < LFOS);
        ControllerId(Self::LFO_1.0 + index as u8)
    }

    pub fn envelope(index: usize) -> ControllerId {
        debug_assert!(index < ENVELOPES);
        ControllerId(Self::ENVELOPE_1.0 + index as u8)
    }

    pub fn control_change(number: u8) -> Option<ControllerId> {
        (number < 128).then_some(ControllerId(number))
    }

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn macro_index(self) -> Option<usize> {
        index_in(self.0, Self::MACRO_1.0, MACROS)
    }

    pub fn lfo_index(self) -> Option<usize> {
        index_in(self.0, Self::LFO_1.0, LFOS)
    }

    pub fn envelope_index(self) -> Option<usize> {
        index_in(self.0, Self::ENVELOPE_1.0, ENVELOPES)
    }

    /// MIDI-driven sources: control changes, pitch wheel, note and velocity
    /// registers, pressure and aftertouch.
    pub fn is_midi(self) -> bool {
        (self.0 as usize) < Self::MIDI_REGISTERS
            && self.macro_index().is_none()
            && self.lfo_index().is_none()
            && self.envelope_index().is_none()
    }

    /// Anything that is neither MIDI-driven nor a macro must be rendered per
    /// sample and is only accepted by some parameters.
    pub fn is_signal_source(self) -> bool {
        self.lfo_index().is_some() || self.envelope_index().is_some()
    }

    pub fn is_valid(self) -> bool {
        self.is_none() || (self.0 as usize) < Self::MIDI_REGISTERS
    }
}

impl Default for ControllerId {
    fn default() -> Self {
        Self::NONE
    }
}

fn index_in(id: u8, first: u8, count: usize) -> Option<usize> {
    let offset = id.checked_sub(first)? as usize;
    (offset < count).then_some(offset)
}

/// How a bound parameter maps its source onto its own ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binding {
    pub controller: ControllerId,
    pub base: Number,
    pub depth: Number,
}

impl Binding {
    pub const NONE: Binding = Binding {
        controller: ControllerId::NONE,
        base: 0.0,
        depth: 1.0,
    };

    pub fn new(controller: ControllerId) -> Self {
        Self {
            controller,
            ..Self::NONE
        }
    }

    #[inline]
    pub fn apply(&self, source: Number) -> Number {
        (self.base + source * self.depth).clamp(0.0, 1.0)
    }
}

impl Default for Binding {
    fn default() -> Self {
        Self::NONE
    }
}

/// Latest value of every MIDI-driven controller, as ratios.
#[derive(Debug, Clone)]
pub struct MidiControllers {
    values: Vec<Number>,
}

impl MidiControllers {
    pub fn new() -> Self {
        let mut controllers = Self {
            values: vec![0.0; ControllerId::MIDI_REGISTERS],
        };
        controllers.reset();
        controllers
    }

    pub fn get(&self, id: ControllerId) -> Number {
        self.values.get(id.0 as usize).copied().unwrap_or(0.0)
    }

    /// Returns `false` for ids without a register.
    pub fn set(&mut self, id: ControllerId, ratio: Number) -> bool {
        if !id.is_midi() {
            return false;
        }

        match self.values.get_mut(id.0 as usize) {
            Some(value) => {
                *value = ratio.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    /// Every register to zero, the pitch wheel to its center.
    pub fn reset(&mut self) {
        self.values.fill(0.0);
        self.values[ControllerId::PITCH_WHEEL.0 as usize] = 0.5;
    }
}

impl Default for MidiControllers {
    fn default() -> Self {
        Self::new()
    }
}

/// A macro: a user-shaped transfer curve from one input knob to a ratio that
/// other parameters can follow.
#[derive(Debug, Clone)]
pub struct Macro {
    index: usize,
    value: Number,
}

impl Macro {
    pub fn new(index: usize) -> Self {
        Self { index, value: 0.5 }
    }

    pub fn value(&self) -> Number {
        self.value
    }

    /// Recompute from the macro's parameters. Returns whether the output
    /// changed.
    pub fn update(&mut self, bank: &ParamBank) -> bool {
        let param = |p| bank.float(ParamId::macro_param(self.index, p)).value();
        let shape = DistortionShape::from_byte(bank.byte(ParamId::macro_shape(self.index)).value());

        let value = Self::evaluate(
            param(MacroParam::Input),
            param(MacroParam::Midpoint),
            param(MacroParam::Min),
            param(MacroParam::Max),
            param(MacroParam::Amount),
            param(MacroParam::Distortion),
            param(MacroParam::Randomness),
            shape,
        );

        let changed = (value - self.value).abs() > 0.000_001;
        self.value = value;
        changed
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate(
        input: Number,
        midpoint: Number,
        min: Number,
        max: Number,
        amount: Number,
        distortion: Number,
        randomness: Number,
        shape: DistortionShape,
    ) -> Number {
        let shifted = if input < 0.5 {
            2.0 * input * midpoint
        } else {
            midpoint + (2.0 * input - 1.0) * (1.0 - midpoint)
        };
        let shaped = randomize(randomness, distort(distortion, shifted, shape));

        (min + shaped * amount * (max - min)).clamp(0.0, 1.0)
    }
}
