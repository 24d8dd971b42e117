use std::{f32::consts::FRAC_PI_4, marker::PhantomData};

use crate::{
    dsp::{
        filter::FilterType,
        math::{detune, is_close, randomize},
        wavetable::{Waveform, Waveforms, Wavetable},
    },
    graph::{
        filter::{Filter, FilterCtx, FilterSlot},
        oscillator::{Modulation, Oscillator, OscillatorCtx},
        producer::{Prerender, Producer, SignalProducer},
        shaper::{Shaper, ShaperCtx},
    },
    param::{
        bank::ParamBank,
        controller::ControllerId,
        envelope::EnvelopeSnapshot,
        float::{Evaluation, FloatParam, ParamCtx},
        ids::{ParamId, Role, VoiceByteParam, VoiceParam, ENVELOPES},
    },
    synth::tuning::{drift_time, next_inaccuracy, Tuning, TuningTable, MTS_RAMP_MIN},
    Frequency, Number, Round, Sample, Seconds,
};

/*
Voice
=====

A voice plays one note. Its signal chain:

  oscillator → filter 1 → wavefolder → [distortion] → filter 2 → gain → pan
                                          carriers

  gain = velocity · volume
  pan  = clamp(panning + note panning), constant power

Every stage parameter is a follower of the matching synth-level parameter of
the voice's role. Followers whose leader is driven by an envelope run that
envelope themselves, triggered by this voice's note.

Lifecycle:

  Off ──note_on──▶ On ──note_off──▶ Off (release tail still sounding)
                   │
                   └─ cancel_note_smoothly: 10 ms fade, then Off

A voice stays active (and keeps being rendered) after it turned Off until
its oscillator stops at the end of the release.
*/

/// Fade-out length used when a sounding voice has to make room for a new
/// note.
pub const SMOOTH_CANCEL_TIME: Seconds = 0.01;

/// Portamento depths closer to zero than this (in cents) glide from the
/// previous note instead.
const PORTAMENTO_DEPTH_MIN: Number = 0.01;

/// Portamento shorter than this counts as off.
const GLIDE_MIN: Seconds = 0.000_001;

const FOLLOWERS: usize = 11;

pub type NoteId = u32;

/// Compile-time description of a voice role.
pub trait VoiceRole {
    const ROLE: Role;
    /// Carriers get the distortion stage.
    const HAS_DISTORTION: bool;
    /// Carriers are modulated by their paired modulator.
    const ACCEPTS_MODULATION: bool;
}

#[derive(Debug, Clone, Copy)]
pub struct Modulator;

#[derive(Debug, Clone, Copy)]
pub struct Carrier;

impl VoiceRole for Modulator {
    const ROLE: Role = Role::Modulator;
    const HAS_DISTORTION: bool = false;
    const ACCEPTS_MODULATION: bool = false;
}

impl VoiceRole for Carrier {
    const ROLE: Role = Role::Carrier;
    const HAS_DISTORTION: bool = true;
    const ACCEPTS_MODULATION: bool = true;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Off,
    On,
}

/// A note as a voice sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub channel: u8,
    pub note: u8,
    /// `[0, 1]`
    pub velocity: Number,
}

impl Default for Note {
    fn default() -> Self {
        Self {
            id: 0,
            channel: 0,
            note: 0,
            velocity: 0.0,
        }
    }
}

/// The modulator's mono output plus the synth-wide modulation levels.
#[derive(Clone, Copy)]
pub struct VoiceModulation<'a> {
    pub signal: &'a [Sample],
    pub frequency_level: &'a [Sample],
    pub phase_level: &'a [Sample],
    pub amplitude_level: &'a [Sample],
}

/// Borrowed collaborators of a voice.
#[derive(Clone, Copy)]
pub struct VoiceCtx<'a> {
    pub bank: &'a ParamBank,
    pub waveforms: &'a Waveforms,
    /// The role's custom waveform.
    pub custom: &'a Wavetable,
    pub tuning: &'a TuningTable,
    pub bpm: Number,
    /// Inaccuracy shared by voices in a synced tuning.
    pub synced_inaccuracy: Number,
    pub modulation: Option<VoiceModulation<'a>>,
}

/// Map a note velocity through the velocity sensitivity `s` in `[0, 2]`.
///
/// Up to 1 the response blends from flat to linear; above 1 it bends towards
/// `v⁴`, so soft notes get much softer.
pub fn velocity_gain(velocity: Number, sensitivity: Number) -> Number {
    if sensitivity <= 1.0 {
        1.0 - sensitivity + sensitivity * velocity
    } else {
        velocity + (sensitivity - 1.0) * (velocity.powi(4) - velocity)
    }
}

#[derive(Debug, Clone)]
struct Chain {
    oscillator: Oscillator,
    filter_1: Filter,
    folder: Shaper,
    distortion: Option<Shaper>,
    filter_2: Filter,
    velocity: FloatParam,
    volume: FloatParam,
    panning: FloatParam,
    note_panning: FloatParam,
}

impl Chain {
    fn new(role: Role, has_distortion: bool, block_size: usize, sample_rate: Frequency) -> Self {
        let param = |p| FloatParam::from_descriptor(ParamId::voice(role, p).descriptor(), block_size, sample_rate);

        Self {
            oscillator: Oscillator::new(role, block_size, sample_rate),
            filter_1: Filter::new(role, FilterSlot::First, block_size, sample_rate),
            folder: Shaper::wavefolder(role, block_size, sample_rate),
            distortion: has_distortion.then(|| Shaper::distortion(block_size, sample_rate)),
            filter_2: Filter::new(role, FilterSlot::Second, block_size, sample_rate),
            velocity: FloatParam::new(0.0, 1.0, 1.0, Evaluation::Sample, block_size, sample_rate),
            volume: param(VoiceParam::Volume),
            panning: param(VoiceParam::Panning),
            note_panning: FloatParam::new(-1.0, 1.0, 0.0, Evaluation::Sample, block_size, sample_rate),
        }
    }

    /// Parameters that copy a synth-level leader, paired with the leader's id.
    fn followers(&mut self, role: Role) -> [(ParamId, Option<&mut FloatParam>); FOLLOWERS] {
        let voice = |p| ParamId::voice(role, p);

        [
            (voice(VoiceParam::Amplitude), Some(&mut self.oscillator.amplitude)),
            (voice(VoiceParam::Detune), Some(&mut self.oscillator.detune)),
            (voice(VoiceParam::FineDetune), Some(&mut self.oscillator.fine_detune)),
            (voice(VoiceParam::Filter1Frequency), Some(&mut self.filter_1.frequency)),
            (voice(VoiceParam::Filter1Q), Some(&mut self.filter_1.q)),
            (voice(VoiceParam::Folding), Some(&mut self.folder.level)),
            (voice(VoiceParam::Filter2Frequency), Some(&mut self.filter_2.frequency)),
            (voice(VoiceParam::Filter2Q), Some(&mut self.filter_2.q)),
            (voice(VoiceParam::Volume), Some(&mut self.volume)),
            (voice(VoiceParam::Panning), Some(&mut self.panning)),
            (
                ParamId::CARRIER_DISTORTION,
                self.distortion.as_mut().map(|distortion| &mut distortion.level),
            ),
        ]
    }

    /// Silence immediately and drop everything scheduled.
    fn cancel(&mut self, role: Role) {
        self.oscillator.cancel();
        self.filter_1.reset();
        self.filter_2.reset();
        self.velocity.cancel_events();
        self.note_panning.cancel_events();

        for (_, follower) in self.followers(role) {
            if let Some(follower) = follower {
                follower.reset();
            }
        }
    }

    fn set_sample_rate(&mut self, sample_rate: Frequency) {
        self.oscillator.set_sample_rate(sample_rate);
        self.filter_1.set_sample_rate(sample_rate);
        self.folder.set_sample_rate(sample_rate);
        if let Some(distortion) = self.distortion.as_mut() {
            distortion.set_sample_rate(sample_rate);
        }
        self.filter_2.set_sample_rate(sample_rate);
        self.velocity.set_sample_rate(sample_rate);
        self.volume.set_sample_rate(sample_rate);
        self.panning.set_sample_rate(sample_rate);
        self.note_panning.set_sample_rate(sample_rate);
    }

    fn set_block_size(&mut self, block_size: usize) {
        self.oscillator.set_block_size(block_size);
        self.filter_1.set_block_size(block_size);
        self.folder.set_block_size(block_size);
        if let Some(distortion) = self.distortion.as_mut() {
            distortion.set_block_size(block_size);
        }
        self.filter_2.set_block_size(block_size);
        self.velocity.set_block_size(block_size);
        self.volume.set_block_size(block_size);
        self.panning.set_block_size(block_size);
        self.note_panning.set_block_size(block_size);
    }
}

#[derive(Debug, Clone)]
pub struct Voice<R: VoiceRole> {
    producer: Producer<()>,
    state: VoiceState,
    note: Note,
    tuning: Tuning,
    inaccuracy: Number,
    random: Number,
    chain: Chain,
    envelopes: [Option<EnvelopeSnapshot>; ENVELOPES],
    mono: Vec<Sample>,
    _role: PhantomData<R>,
}

impl<R: VoiceRole> Voice<R> {
    /// `seed` in `[0, 1]` makes the voice's random sequences differ from its
    /// siblings'.
    pub fn new(seed: Number, block_size: usize, sample_rate: Frequency) -> Self {
        Self {
            producer: Producer::new(2, block_size, sample_rate, 0),
            state: VoiceState::Off,
            note: Note::default(),
            tuning: Tuning::from_byte(0),
            inaccuracy: next_inaccuracy(seed),
            random: seed.clamp(0.0, 1.0),
            chain: Chain::new(R::ROLE, R::HAS_DISTORTION, block_size, sample_rate),
            envelopes: [None; ENVELOPES],
            mono: vec![0.0; block_size],
            _role: PhantomData,
        }
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_on(&self) -> bool {
        self.state == VoiceState::On
    }

    /// Whether the voice is playing or still fading out.
    pub fn is_active(&self) -> bool {
        self.is_on() || self.chain.oscillator.is_active()
    }

    pub fn note(&self) -> Note {
        self.note
    }

    pub fn frequency(&self) -> Frequency {
        self.chain.oscillator.frequency.value()
    }

    /// Output after gain, before panning, for the last rendered round.
    pub fn mono(&self) -> &[Sample] {
        &self.mono
    }

    /// Start playing `note` at `time_offset`. Ignored while the voice is on.
    ///
    /// `previous_note` is where a zero-depth portamento glides from.
    pub fn note_on(&mut self, time_offset: Seconds, note: Note, previous_note: Option<u8>, ctx: &VoiceCtx<'_>) {
        if self.is_on() {
            return;
        }

        if !self.is_active() {
            self.chain.cancel(R::ROLE);
        }

        self.state = VoiceState::On;
        self.note = note;
        self.tuning = Tuning::from_byte(ctx.bank.byte(ParamId::voice_byte(R::ROLE, VoiceByteParam::Tuning)).value());
        self.inaccuracy = next_inaccuracy(self.inaccuracy);
        self.random = randomize(1.0, self.random);

        let leader = |p| ctx.bank.float(ParamId::voice(R::ROLE, p)).value();
        let gain = velocity_gain(note.velocity, leader(VoiceParam::VelocitySensitivity));
        let panning = self.note_panning(note.note, ctx);

        self.chain.velocity.schedule_value(time_offset, gain);
        self.chain.note_panning.schedule_value(time_offset, panning);

        let target = self.note_frequency(note.note, note.channel, ctx);
        let length = leader(VoiceParam::PortamentoLength);
        let depth = leader(VoiceParam::PortamentoDepth);
        let start = if length <= GLIDE_MIN {
            target
        } else if depth.abs() < PORTAMENTO_DEPTH_MIN {
            previous_note.map_or(target, |previous| self.note_frequency(previous, note.channel, ctx))
        } else {
            detune(target, depth)
        };

        let frequency = &mut self.chain.oscillator.frequency;
        frequency.schedule_value(time_offset, start);
        if length > GLIDE_MIN && !is_close(start, target) {
            frequency.schedule_linear_ramp(length, target);
        }

        self.start_envelopes(time_offset, ctx);
        self.chain.oscillator.start(time_offset);
    }

    /// Fade out whatever is playing, then start `note` once the fade is over.
    pub fn retrigger(&mut self, time_offset: Seconds, note: Note, previous_note: Option<u8>, ctx: &VoiceCtx<'_>) {
        self.cancel_note_smoothly(time_offset);
        self.note_on(time_offset + SMOOTH_CANCEL_TIME, note, previous_note, ctx);
    }

    /// Move a playing voice to a new note without restarting it (legato).
    ///
    /// Without portamento this falls back to [`retrigger`](Self::retrigger).
    pub fn glide_to(&mut self, time_offset: Seconds, note: Note, ctx: &VoiceCtx<'_>) {
        if !self.is_on() {
            return;
        }

        let leader = |p| ctx.bank.float(ParamId::voice(R::ROLE, p)).value();
        let length = leader(VoiceParam::PortamentoLength);

        if length <= GLIDE_MIN {
            let previous = Some(self.note.note);
            self.retrigger(time_offset, note, previous, ctx);
            return;
        }

        self.note = note;
        self.update_envelopes(ctx);

        let gain = velocity_gain(note.velocity, leader(VoiceParam::VelocitySensitivity));
        let panning = self.note_panning(note.note, ctx);
        let target = self.note_frequency(note.note, note.channel, ctx);

        let chain = &mut self.chain;
        for (param, target) in [
            (&mut chain.velocity, gain),
            (&mut chain.note_panning, panning),
            (&mut chain.oscillator.frequency, target),
        ] {
            param.cancel_events_at(time_offset);
            param.schedule_linear_ramp(length, target);
        }
    }

    /// Release the note if it is the one this voice plays.
    ///
    /// Returns the time offset at which the release tail ends, or `None` when
    /// the note was not ours.
    pub fn note_off(&mut self, time_offset: Seconds, note_id: NoteId, note: u8) -> Option<Seconds> {
        if !self.is_on() || self.note.id != note_id || self.note.note != note {
            return None;
        }

        self.state = VoiceState::Off;

        let envelopes = &self.envelopes;
        let mut release = 0.0;

        for (_, follower) in self.chain.followers(R::ROLE) {
            let Some(follower) = follower else { continue };
            let Some(envelope) = follower.envelope_index().and_then(|index| envelopes[index].as_ref()) else {
                continue;
            };

            release = follower.end_envelope(time_offset, envelope).max(release);
        }

        let off_after = time_offset + release;
        self.chain.oscillator.stop(off_after);

        Some(off_after)
    }

    /// Silence now, no fade.
    pub fn cancel_note(&mut self) {
        self.state = VoiceState::Off;
        self.chain.cancel(R::ROLE);
        self.mono.fill(0.0);
    }

    /// Fade out over [`SMOOTH_CANCEL_TIME`] starting at `time_offset`.
    pub fn cancel_note_smoothly(&mut self, time_offset: Seconds) {
        if !self.is_active() {
            return;
        }

        self.state = VoiceState::Off;

        let velocity = &mut self.chain.velocity;
        velocity.cancel_events_at(time_offset);
        velocity.schedule_linear_ramp(SMOOTH_CANCEL_TIME, 0.0);

        for (_, follower) in self.chain.followers(R::ROLE) {
            if let Some(follower) = follower.filter(|follower| follower.envelope_index().is_some()) {
                follower.cancel_envelope(time_offset, SMOOTH_CANCEL_TIME);
            }
        }

        self.chain.oscillator.stop(time_offset + SMOOTH_CANCEL_TIME);
    }

    /// Whether an envelope-driven amplitude or volume has faded below
    /// `threshold` for good.
    pub fn has_decayed(&self, threshold: Number) -> bool {
        self.chain.oscillator.amplitude.has_decayed(threshold) || self.chain.volume.has_decayed(threshold)
    }

    /// Whether this voice plays a synced inaccurate tuning and its pitch has
    /// settled, so the shared inaccuracy may move on.
    pub fn awaits_synced_drift(&self) -> bool {
        self.is_on() && self.tuning.is_synced() && self.chain.oscillator.frequency.is_constant()
    }

    /// Follow a changed external tuning table, if this voice plays in the
    /// real-time scheme.
    pub fn retune(&mut self, ctx: &VoiceCtx<'_>) {
        if !self.is_on() || self.tuning != Tuning::MtsRealtime {
            return;
        }

        let target = self.note_frequency(self.note.note, self.note.channel, ctx);
        let frequency = &mut self.chain.oscillator.frequency;
        let duration = frequency.remaining_ramp_time().max(MTS_RAMP_MIN);

        frequency.cancel_events_at(0.0);
        frequency.schedule_linear_ramp(duration, target);
    }

    fn inaccuracy(&self, ctx: &VoiceCtx<'_>) -> Number {
        if self.tuning.is_synced() {
            ctx.synced_inaccuracy
        } else {
            self.inaccuracy
        }
    }

    fn note_frequency(&self, note: u8, channel: u8, ctx: &VoiceCtx<'_>) -> Frequency {
        let base = ctx.tuning.frequency(self.tuning, channel, note);
        detune(base, self.tuning.detune(self.inaccuracy(ctx)))
    }

    /// Stereo position derived from the note number (and detune), scaled by
    /// the width.
    fn note_panning(&self, note: u8, ctx: &VoiceCtx<'_>) -> Number {
        let leader = |p| ctx.bank.float(ParamId::voice(R::ROLE, p)).value();
        let position = 2.0 / 127.0 * (note as Number + leader(VoiceParam::Detune) / 100.0) - 1.0;

        position.clamp(-1.0, 1.0) * leader(VoiceParam::Width)
    }

    fn start_envelopes(&mut self, time_offset: Seconds, ctx: &VoiceCtx<'_>) {
        self.envelopes = [None; ENVELOPES];

        let envelopes = &mut self.envelopes;
        let random = self.random;

        for (id, follower) in self.chain.followers(R::ROLE) {
            let Some(follower) = follower else { continue };

            match ctx.bank.float(id).envelope_index() {
                Some(index) => {
                    let envelope = *envelopes[index]
                        .get_or_insert_with(|| EnvelopeSnapshot::new(ctx.bank, index, ctx.bpm, random));

                    follower.set_controller(ControllerId::envelope(index));
                    follower.start_envelope(time_offset, &envelope);
                }
                None => follower.reset(),
            }
        }
    }

    /// Re-plan running dynamic envelopes whose settings moved.
    fn update_envelopes(&mut self, ctx: &VoiceCtx<'_>) {
        for index in 0..ENVELOPES {
            let Some(current) = self.envelopes[index] else { continue };

            if !current.dynamic {
                continue;
            }

            let fresh = EnvelopeSnapshot::new(ctx.bank, index, ctx.bpm, self.random);
            if fresh == current {
                continue;
            }

            self.envelopes[index] = Some(fresh);

            for (_, follower) in self.chain.followers(R::ROLE) {
                if let Some(follower) = follower.filter(|follower| follower.envelope_index() == Some(index)) {
                    follower.update_envelope(0.0, &fresh);
                }
            }
        }
    }

    /// Inaccurate tunings are unstable: once the pitch settles, drift to a
    /// freshly rolled inaccuracy.
    fn drift(&mut self, ctx: &VoiceCtx<'_>) {
        if !self.tuning.is_inaccurate() || !self.chain.oscillator.frequency.is_constant() {
            return;
        }

        if !self.tuning.is_synced() {
            self.inaccuracy = next_inaccuracy(self.inaccuracy);
        }

        let target = self.note_frequency(self.note.note, self.note.channel, ctx);
        let duration = drift_time(self.inaccuracy(ctx));
        let frequency = &mut self.chain.oscillator.frequency;

        if !is_close(frequency.value(), target) {
            frequency.schedule_linear_ramp(duration, target);
        }
    }
}

impl<R: VoiceRole> SignalProducer for Voice<R> {
    type Event = ();
    type Context<'c> = VoiceCtx<'c>;

    fn producer(&self) -> &Producer<()> {
        &self.producer
    }

    fn producer_mut(&mut self) -> &mut Producer<()> {
        &mut self.producer
    }

    fn initialize_rendering(&mut self, ctx: VoiceCtx<'_>, round: Round, sample_count: usize) -> Prerender {
        if self.is_on() {
            self.update_envelopes(&ctx);
            self.drift(&ctx);
        }

        let bank = ctx.bank;
        let leader = |p| Some(bank.float(ParamId::voice(R::ROLE, p)));
        let byte = |p| bank.byte(ParamId::voice_byte(R::ROLE, p)).value();
        let follow = |leader| ParamCtx { leader, lfos: &[] };
        let chain = &mut self.chain;

        chain.velocity.produce(ParamCtx::default(), round, sample_count);
        chain.note_panning.produce(ParamCtx::default(), round, sample_count);
        chain.volume.produce(follow(leader(VoiceParam::Volume)), round, sample_count);
        chain.panning.produce(follow(leader(VoiceParam::Panning)), round, sample_count);

        let modulation = ctx.modulation.filter(|_| R::ACCEPTS_MODULATION).map(|m| Modulation {
            signal: m.signal,
            frequency_level: m.frequency_level,
            phase_level: m.phase_level,
        });
        let oscillator = OscillatorCtx {
            table: ctx
                .waveforms
                .select(Waveform::from_byte(byte(VoiceByteParam::Waveform)), ctx.custom),
            amplitude: leader(VoiceParam::Amplitude),
            detune: leader(VoiceParam::Detune),
            fine_detune: leader(VoiceParam::FineDetune),
            modulation,
        };
        chain.oscillator.produce(oscillator, round, sample_count);

        let filter_1 = FilterCtx {
            input: chain.oscillator.producer().buffer(0),
            filter_type: FilterType::from_byte(byte(VoiceByteParam::Filter1Type)),
            frequency: leader(VoiceParam::Filter1Frequency),
            q: leader(VoiceParam::Filter1Q),
        };
        chain.filter_1.produce(filter_1, round, sample_count);

        let folder = ShaperCtx {
            input: chain.filter_1.producer().buffer(0),
            level: leader(VoiceParam::Folding),
        };
        chain.folder.produce(folder, round, sample_count);

        if let Some(distortion) = chain.distortion.as_mut() {
            let ctx = ShaperCtx {
                input: chain.folder.producer().buffer(0),
                level: Some(bank.float(ParamId::CARRIER_DISTORTION)),
            };
            distortion.produce(ctx, round, sample_count);
        }

        let filter_2 = FilterCtx {
            input: match chain.distortion.as_ref() {
                Some(distortion) => distortion.producer().buffer(0),
                None => chain.folder.producer().buffer(0),
            },
            filter_type: FilterType::from_byte(byte(VoiceByteParam::Filter2Type)),
            frequency: leader(VoiceParam::Filter2Frequency),
            q: leader(VoiceParam::Filter2Q),
        };
        chain.filter_2.produce(filter_2, round, sample_count);

        Prerender::Render
    }

    fn render(&mut self, ctx: VoiceCtx<'_>, _round: Round, first: usize, last: usize, buffers: &mut [Vec<Sample>]) {
        let chain = &self.chain;
        let input = chain.filter_2.producer().buffer(0);
        let velocity = chain.velocity.producer().buffer(0);
        let volume = chain.volume.producer().buffer(0);
        let panning = chain.panning.producer().buffer(0);
        let note_panning = chain.note_panning.producer().buffer(0);
        let modulation = ctx.modulation.filter(|_| R::ACCEPTS_MODULATION);

        for i in first..last {
            let mut sample = input[i];

            if let Some(modulation) = modulation {
                let level = modulation.amplitude_level[i];
                sample *= 1.0 - level + level * modulation.signal[i];
            }

            sample *= velocity[i] * volume[i];
            self.mono[i] = sample;

            let pan = (panning[i] + note_panning[i]).clamp(-1.0, 1.0);
            let angle = (pan + 1.0) * FRAC_PI_4;

            buffers[0][i] = sample * angle.cos();
            buffers[1][i] = sample * angle.sin();
        }
    }

    fn set_sample_rate(&mut self, sample_rate: Frequency) {
        self.chain.set_sample_rate(sample_rate);
        self.producer.set_sample_rate(sample_rate);
    }

    fn set_block_size(&mut self, block_size: usize) {
        self.chain.set_block_size(block_size);
        self.mono.resize(block_size, 0.0);
        self.producer.set_block_size(block_size);
    }
}
