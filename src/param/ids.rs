//! The parameter namespace.
//!
//! Every control of the engine has a dense integer id. Continuous parameters
//! come first, discrete ones after them, so both kinds index straight into
//! their own array in [`ParamBank`](crate::param::bank::ParamBank).
//!
//! ```text
//!   0 ┬ MIX PM FM AM
//!   4 ┼ modulator voice params, modulator custom harmonics
//!  28 ┼ carrier voice params, carrier custom harmonics, carrier distortion
//!  53 ┼ macros   (10 × 7)
//! 123 ┼ envelopes (6 × 12)
//! 195 ┼ LFOs      (8 × 7)
//! 251 ┼ discrete: voice waveform/filter/tuning, envelope toggles and shapes,
//!     │           LFO waveform and sync, macro distortion shapes
//! 315 ┴
//! ```

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::Number;

/// How a parameter is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Continuous, may change every sample.
    SampleFloat,
    /// Continuous, held for a whole block.
    BlockFloat,
    /// Discrete.
    Byte,
}

/// The two voice roles of the synth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Modulator,
    Carrier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceParam {
    Amplitude,
    VelocitySensitivity,
    Folding,
    PortamentoLength,
    PortamentoDepth,
    Detune,
    FineDetune,
    Width,
    Panning,
    Volume,
    Filter1Frequency,
    Filter1Q,
    Filter2Frequency,
    Filter2Q,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceByteParam {
    Waveform,
    Filter1Type,
    Filter2Type,
    Tuning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroParam {
    Input,
    Midpoint,
    Min,
    Max,
    Amount,
    Distortion,
    Randomness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeParam {
    Amount,
    InitialValue,
    DelayTime,
    AttackTime,
    PeakValue,
    HoldTime,
    DecayTime,
    SustainValue,
    ReleaseTime,
    FinalValue,
    TimeInaccuracy,
    ValueInaccuracy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeByteParam {
    Dynamic,
    TempoSync,
    AttackShape,
    DecayShape,
    ReleaseShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LfoParam {
    Frequency,
    Phase,
    Min,
    Max,
    Amount,
    Distortion,
    Randomness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LfoByteParam {
    Waveform,
    TempoSync,
}

pub const MACROS: usize = 10;
pub const ENVELOPES: usize = 6;
pub const LFOS: usize = 8;
pub const CUSTOM_HARMONICS: usize = 10;

const SYNTH_PARAMS: u16 = 4;
const VOICE_PARAMS: u16 = 14;
const VOICE_BLOCK: u16 = VOICE_PARAMS + CUSTOM_HARMONICS as u16;
const MACRO_PARAMS: u16 = 7;
const ENVELOPE_PARAMS: u16 = 12;
const LFO_PARAMS: u16 = 7;

const MODULATOR_BASE: u16 = SYNTH_PARAMS;
const CARRIER_BASE: u16 = MODULATOR_BASE + VOICE_BLOCK;
const CARRIER_DISTORTION: u16 = CARRIER_BASE + VOICE_BLOCK;
const MACRO_BASE: u16 = CARRIER_DISTORTION + 1;
const ENVELOPE_BASE: u16 = MACRO_BASE + MACROS as u16 * MACRO_PARAMS;
const LFO_BASE: u16 = ENVELOPE_BASE + ENVELOPES as u16 * ENVELOPE_PARAMS;

/// Number of continuous parameters.
pub const FLOAT_PARAMS: usize = (LFO_BASE + LFOS as u16 * LFO_PARAMS) as usize;

const VOICE_BYTE_PARAMS: u16 = 4;
const ENVELOPE_BYTE_PARAMS: u16 = 5;
const LFO_BYTE_PARAMS: u16 = 2;

const MODULATOR_BYTE_BASE: u16 = FLOAT_PARAMS as u16;
const CARRIER_BYTE_BASE: u16 = MODULATOR_BYTE_BASE + VOICE_BYTE_PARAMS;
const ENVELOPE_BYTE_BASE: u16 = CARRIER_BYTE_BASE + VOICE_BYTE_PARAMS;
const LFO_BYTE_BASE: u16 = ENVELOPE_BYTE_BASE + ENVELOPES as u16 * ENVELOPE_BYTE_PARAMS;
const MACRO_BYTE_BASE: u16 = LFO_BYTE_BASE + LFOS as u16 * LFO_BYTE_PARAMS;

/// Size of the whole namespace.
pub const PARAM_COUNT: usize = (MACRO_BYTE_BASE + MACROS as u16) as usize;

/// Number of discrete parameters.
pub const BYTE_PARAMS: usize = PARAM_COUNT - FLOAT_PARAMS;

/// Which part of the engine a parameter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamGroup {
    Synth,
    Voice(Role),
    CustomHarmonic(Role),
    CarrierDistortion,
    Macro(usize),
    Envelope(usize),
    Lfo(usize),
    VoiceByte(Role),
    EnvelopeByte(usize),
    LfoByte(usize),
    MacroByte(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(u16);

impl ParamId {
    pub const MIX: ParamId = ParamId(0);
    pub const PM: ParamId = ParamId(1);
    pub const FM: ParamId = ParamId(2);
    pub const AM: ParamId = ParamId(3);
    pub const CARRIER_DISTORTION: ParamId = ParamId(CARRIER_DISTORTION);

    pub fn from_index(index: usize) -> Option<ParamId> {
        (index < PARAM_COUNT).then_some(ParamId(index as u16))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn voice(role: Role, param: VoiceParam) -> ParamId {
        ParamId(role_base(role) + param as u16)
    }

    /// `harmonic` is zero-based.
    pub fn custom_harmonic(role: Role, harmonic: usize) -> ParamId {
        debug_assert!(harmonic < CUSTOM_HARMONICS);
        ParamId(role_base(role) + VOICE_PARAMS + harmonic as u16)
    }

    pub fn macro_param(index: usize, param: MacroParam) -> ParamId {
        debug_assert!(index < MACROS);
        ParamId(MACRO_BASE + index as u16 * MACRO_PARAMS + param as u16)
    }

    pub fn envelope(index: usize, param: EnvelopeParam) -> ParamId {
        debug_assert!(index < ENVELOPES);
        ParamId(ENVELOPE_BASE + index as u16 * ENVELOPE_PARAMS + param as u16)
    }

    pub fn lfo(index: usize, param: LfoParam) -> ParamId {
        debug_assert!(index < LFOS);
        ParamId(LFO_BASE + index as u16 * LFO_PARAMS + param as u16)
    }

    pub fn voice_byte(role: Role, param: VoiceByteParam) -> ParamId {
        let base = match role {
            Role::Modulator => MODULATOR_BYTE_BASE,
            Role::Carrier => CARRIER_BYTE_BASE,
        };
        ParamId(base + param as u16)
    }

    pub fn envelope_byte(index: usize, param: EnvelopeByteParam) -> ParamId {
        debug_assert!(index < ENVELOPES);
        ParamId(ENVELOPE_BYTE_BASE + index as u16 * ENVELOPE_BYTE_PARAMS + param as u16)
    }

    pub fn lfo_byte(index: usize, param: LfoByteParam) -> ParamId {
        debug_assert!(index < LFOS);
        ParamId(LFO_BYTE_BASE + index as u16 * LFO_BYTE_PARAMS + param as u16)
    }

    pub fn macro_shape(index: usize) -> ParamId {
        debug_assert!(index < MACROS);
        ParamId(MACRO_BYTE_BASE + index as u16)
    }

    pub fn is_float(self) -> bool {
        (self.0 as usize) < FLOAT_PARAMS
    }

    /// Position in the continuous parameter array.
    pub fn float_index(self) -> Option<usize> {
        self.is_float().then_some(self.0 as usize)
    }

    /// Position in the discrete parameter array.
    pub fn byte_index(self) -> Option<usize> {
        let index = self.0 as usize;
        (FLOAT_PARAMS..PARAM_COUNT)
            .contains(&index)
            .then(|| index - FLOAT_PARAMS)
    }

    pub fn group(self) -> ParamGroup {
        let id = self.0;

        match id {
            _ if id < MODULATOR_BASE => ParamGroup::Synth,
            _ if id < CARRIER_BASE => voice_group(id - MODULATOR_BASE, Role::Modulator),
            _ if id < CARRIER_DISTORTION => voice_group(id - CARRIER_BASE, Role::Carrier),
            _ if id == CARRIER_DISTORTION => ParamGroup::CarrierDistortion,
            _ if id < ENVELOPE_BASE => ParamGroup::Macro(((id - MACRO_BASE) / MACRO_PARAMS) as usize),
            _ if id < LFO_BASE => ParamGroup::Envelope(((id - ENVELOPE_BASE) / ENVELOPE_PARAMS) as usize),
            _ if id < MODULATOR_BYTE_BASE => ParamGroup::Lfo(((id - LFO_BASE) / LFO_PARAMS) as usize),
            _ if id < CARRIER_BYTE_BASE => ParamGroup::VoiceByte(Role::Modulator),
            _ if id < ENVELOPE_BYTE_BASE => ParamGroup::VoiceByte(Role::Carrier),
            _ if id < LFO_BYTE_BASE => {
                ParamGroup::EnvelopeByte(((id - ENVELOPE_BYTE_BASE) / ENVELOPE_BYTE_PARAMS) as usize)
            }
            _ if id < MACRO_BYTE_BASE => ParamGroup::LfoByte(((id - LFO_BYTE_BASE) / LFO_BYTE_PARAMS) as usize),
            _ => ParamGroup::MacroByte((id - MACRO_BYTE_BASE) as usize),
        }
    }

    /// Whether per-sample sources (LFOs) and envelopes may drive this
    /// parameter. Only parameters rendered after the LFOs qualify.
    pub fn accepts_signal_sources(self) -> bool {
        matches!(
            self.group(),
            ParamGroup::Synth | ParamGroup::Voice(_) | ParamGroup::CarrierDistortion
        )
    }

    pub fn descriptor(self) -> &'static ParamDescriptor {
        &table().descriptors[self.0 as usize]
    }

    pub fn kind(self) -> ParamKind {
        self.descriptor().kind
    }

    pub fn name(self) -> &'static str {
        &self.descriptor().name
    }

    pub fn from_name(name: &str) -> Option<ParamId> {
        table().by_name.get(name).copied()
    }

    pub fn all() -> impl Iterator<Item = ParamId> {
        (0..PARAM_COUNT as u16).map(ParamId)
    }
}

fn role_base(role: Role) -> u16 {
    match role {
        Role::Modulator => MODULATOR_BASE,
        Role::Carrier => CARRIER_BASE,
    }
}

fn voice_group(offset: u16, role: Role) -> ParamGroup {
    if offset < VOICE_PARAMS {
        ParamGroup::Voice(role)
    } else {
        ParamGroup::CustomHarmonic(role)
    }
}

/// Static description of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    pub name: String,
    pub kind: ParamKind,
    pub min: Number,
    pub max: Number,
    pub default: Number,
}

struct ParamTable {
    descriptors: Vec<ParamDescriptor>,
    by_name: HashMap<String, ParamId>,
}

static TABLE: OnceLock<ParamTable> = OnceLock::new();

fn table() -> &'static ParamTable {
    TABLE.get_or_init(ParamTable::build)
}

type Spec = (&'static str, ParamKind, Number, Number, Number);

use ParamKind::{BlockFloat as B, Byte as D, SampleFloat as S};

const SYNTH_SPECS: [Spec; SYNTH_PARAMS as usize] = [
    ("MIX", S, 0.0, 1.0, 1.0),
    ("PM", S, 0.0, 1.0, 0.0),
    ("FM", S, 0.0, 1.0, 0.0),
    ("AM", S, 0.0, 1.0, 0.0),
];

const VOICE_SPECS: [Spec; VOICE_PARAMS as usize] = [
    ("AMP", S, 0.0, 1.0, 0.75),
    ("VS", B, 0.0, 2.0, 1.0),
    ("FLD", S, 0.0, 1.0, 0.0),
    ("PRT", B, 0.0, 3.0, 0.0),
    ("PRD", B, -2400.0, 2400.0, 0.0),
    ("DTN", S, -4800.0, 4800.0, 0.0),
    ("FIN", S, -300.0, 300.0, 0.0),
    ("WID", B, -1.0, 1.0, 0.2),
    ("PAN", S, -1.0, 1.0, 0.0),
    ("VOL", S, 0.0, 1.0, 0.33),
    ("F1FRQ", S, 1.0, 24_000.0, 24_000.0),
    ("F1Q", S, 0.1, 20.0, 0.707),
    ("F2FRQ", S, 1.0, 24_000.0, 24_000.0),
    ("F2Q", S, 0.1, 20.0, 0.707),
];

const MACRO_SPECS: [Spec; MACRO_PARAMS as usize] = [
    ("IN", B, 0.0, 1.0, 0.5),
    ("MID", B, 0.0, 1.0, 0.5),
    ("MIN", B, 0.0, 1.0, 0.0),
    ("MAX", B, 0.0, 1.0, 1.0),
    ("AMT", B, 0.0, 1.0, 1.0),
    ("DST", B, 0.0, 1.0, 0.0),
    ("RND", B, 0.0, 1.0, 0.0),
];

const ENVELOPE_SPECS: [Spec; ENVELOPE_PARAMS as usize] = [
    ("AMT", B, 0.0, 1.0, 1.0),
    ("INI", B, 0.0, 1.0, 0.0),
    ("DEL", B, 0.0, 6.0, 0.0),
    ("ATK", B, 0.0, 6.0, 0.02),
    ("PK", B, 0.0, 1.0, 1.0),
    ("HLD", B, 0.0, 12.0, 0.3),
    ("DEC", B, 0.001, 15.0, 0.6),
    ("SUS", B, 0.0, 1.0, 0.7),
    ("REL", B, 0.0, 6.0, 0.1),
    ("FIN", B, 0.0, 1.0, 0.0),
    ("TIN", B, 0.0, 1.0, 0.0),
    ("VIN", B, 0.0, 1.0, 0.0),
];

const LFO_SPECS: [Spec; LFO_PARAMS as usize] = [
    ("FRQ", B, 0.01, 30.0, 1.0),
    ("PHS", B, 0.0, 1.0, 0.0),
    ("MIN", B, 0.0, 1.0, 0.0),
    ("MAX", B, 0.0, 1.0, 1.0),
    ("AMT", B, 0.0, 0.5, 0.5),
    ("DST", B, 0.0, 1.0, 0.0),
    ("RND", B, 0.0, 1.0, 0.0),
];

const VOICE_BYTE_SPECS: [Spec; VOICE_BYTE_PARAMS as usize] = [
    ("WAV", D, 0.0, 5.0, 0.0),
    ("F1TYP", D, 0.0, 3.0, 0.0),
    ("F2TYP", D, 0.0, 3.0, 0.0),
    ("TUN", D, 0.0, 15.0, 0.0),
];

const ENVELOPE_BYTE_SPECS: [Spec; ENVELOPE_BYTE_PARAMS as usize] = [
    ("DYN", D, 0.0, 1.0, 0.0),
    ("SYN", D, 0.0, 1.0, 0.0),
    ("ASH", D, 0.0, 4.0, 0.0),
    ("DSH", D, 0.0, 4.0, 0.0),
    ("RSH", D, 0.0, 4.0, 0.0),
];

const LFO_BYTE_SPECS: [Spec; LFO_BYTE_PARAMS as usize] = [
    ("WAV", D, 0.0, 4.0, 0.0),
    ("SYN", D, 0.0, 1.0, 0.0),
];

impl ParamTable {
    fn build() -> Self {
        let mut descriptors = Vec::with_capacity(PARAM_COUNT);
        let mut push = |name: String, (_, kind, min, max, default): Spec| {
            descriptors.push(ParamDescriptor {
                name,
                kind,
                min,
                max,
                default,
            });
        };

        for spec in SYNTH_SPECS {
            push(spec.0.to_string(), spec);
        }

        for prefix in ["M", "C"] {
            for spec in VOICE_SPECS {
                push(format!("{}{}", prefix, spec.0), spec);
            }

            for harmonic in 0..CUSTOM_HARMONICS {
                let default = if harmonic == 0 { 1.0 } else { 0.0 };
                push(format!("{}C{}", prefix, harmonic + 1), ("", B, -1.0, 1.0, default));
            }
        }

        push("CDG".to_string(), ("", S, 0.0, 1.0, 0.0));

        for (group, count, specs) in [
            ("M", MACROS, &MACRO_SPECS[..]),
            ("N", ENVELOPES, &ENVELOPE_SPECS[..]),
            ("L", LFOS, &LFO_SPECS[..]),
        ] {
            for index in 0..count {
                for &spec in specs {
                    push(format!("{}{}{}", group, index + 1, spec.0), spec);
                }
            }
        }

        for prefix in ["M", "C"] {
            for spec in VOICE_BYTE_SPECS {
                push(format!("{}{}", prefix, spec.0), spec);
            }
        }

        for (group, count, specs) in [
            ("N", ENVELOPES, &ENVELOPE_BYTE_SPECS[..]),
            ("L", LFOS, &LFO_BYTE_SPECS[..]),
        ] {
            for index in 0..count {
                for &spec in specs {
                    push(format!("{}{}{}", group, index + 1, spec.0), spec);
                }
            }
        }

        for index in 0..MACROS {
            push(format!("M{}DSH", index + 1), ("", D, 0.0, 3.0, 0.0));
        }

        let by_name = descriptors
            .iter()
            .enumerate()
            .map(|(index, descriptor)| (descriptor.name.clone(), ParamId(index as u16)))
            .collect();

        Self { descriptors, by_name }
    }
}
