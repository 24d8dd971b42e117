use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use rtrb::Consumer;

use crate::{
    config::SynthConfig,
    dsp::wavetable::{Waveforms, Wavetable},
    error::SynthError,
    graph::{
        lfo::{Lfo, LfoCtx},
        producer::{Prerender, Producer, SignalProducer},
    },
    param::{
        bank::ParamBank,
        controller::{ControllerId, Macro, MidiControllers},
        ids::{ParamId, Role, CUSTOM_HARMONICS, LFOS, MACROS},
        mirror::ParamMirror,
    },
    synth::{
        message::{self, Message, MessageKind, SynthHandle},
        note_stack::NoteStack,
        tuning::{next_inaccuracy, NoteTuning, TuningTable, CHANNELS, NOTES},
        voice::{Carrier, Modulator, Note, NoteId, Voice, VoiceCtx, VoiceModulation, VoiceRole},
    },
    Frequency, Number, Round, Sample, Seconds, MAX_BLOCK_SIZE,
};

/*
Polyphonic Synth
================

64 slots, each a modulator voice paired with a carrier voice. The
modulator's output drives the carrier's frequency, phase and amplitude:

  slot n:  modulator ──mono──▶ carrier
               │                  │
               ▼ · MIX            ▼
               └──────▶ out ◀─────┘

A round, once per block:

  1. macro, envelope and LFO settings
  2. macros, pushing changed outputs to the parameters that follow them
  3. LFOs
  4. synth-level parameters (modulation levels, voice leaders)
  5. every active voice, modulator before carrier
  6. mix
  7. every few thousand samples, cancel voices that decayed to silence
  8. publish parameter ratios to the mirror

Notes go to slots round robin. When every slot is playing, the next one in
line is stolen; a slot that is still sounding is faded out over 10 ms
before the new note starts.

In mono mode each channel plays one slot. New notes glide (or retrigger,
without portamento) the playing slot; releasing the top note goes back to
the most recent note still held.
*/

/// Number of voice slots.
pub const POLYPHONY: usize = 64;

const NOTE_ID_MASK: NoteId = 0x7fff_ffff;

const SUSTAIN_PEDAL: u8 = 64;
const ALL_SOUND_OFF: u8 = 120;
const RESET_ALL_CONTROLLERS: u8 = 121;
const ALL_NOTES_OFF: u8 = 123;
const OMNI_MODE_OFF: u8 = 124;
const OMNI_MODE_ON: u8 = 125;
const MONO_MODE_ON: u8 = 126;
const POLY_MODE_ON: u8 = 127;

/// What to do with both voices of a slot.
#[derive(Debug, Clone, Copy)]
enum SlotAction {
    NoteOn {
        time_offset: Seconds,
        note: Note,
        previous_note: Option<u8>,
    },
    Retrigger {
        time_offset: Seconds,
        note: Note,
        previous_note: Option<u8>,
    },
    GlideTo {
        time_offset: Seconds,
        note: Note,
    },
    NoteOff {
        time_offset: Seconds,
        note_id: NoteId,
        note: u8,
    },
    Cancel,
    Retune,
}

impl SlotAction {
    fn apply<R: VoiceRole>(self, voice: &mut Voice<R>, ctx: &VoiceCtx<'_>) {
        match self {
            SlotAction::NoteOn {
                time_offset,
                note,
                previous_note,
            } => voice.note_on(time_offset, note, previous_note, ctx),
            SlotAction::Retrigger {
                time_offset,
                note,
                previous_note,
            } => voice.retrigger(time_offset, note, previous_note, ctx),
            SlotAction::GlideTo { time_offset, note } => voice.glide_to(time_offset, note, ctx),
            SlotAction::NoteOff {
                time_offset,
                note_id,
                note,
            } => {
                voice.note_off(time_offset, note_id, note);
            }
            SlotAction::Cancel => voice.cancel_note(),
            SlotAction::Retune => voice.retune(ctx),
        }
    }
}

pub struct PolySynth {
    producer: Producer<()>,
    rx: Consumer<Message>,
    mirror: Arc<ParamMirror>,
    dirty: Arc<AtomicBool>,
    gc_interval_samples: usize,
    gc_threshold: Number,
    samples_since_gc: usize,
    bpm: Number,

    bank: ParamBank,
    controllers: MidiControllers,
    macros: Vec<Macro>,
    lfos: Vec<Lfo>,
    waveforms: Arc<Waveforms>,
    custom_waveforms: [Wavetable; 2],
    custom_change_indices: [[Option<u64>; CUSTOM_HARMONICS]; 2],
    tuning: TuningTable,
    synced_inaccuracy: Number,

    modulators: Vec<Voice<Modulator>>,
    carriers: Vec<Voice<Carrier>>,
    silence: Vec<Sample>,
    next_slot: usize,
    next_note_id: NoteId,
    previous_note: Option<u8>,

    assignments: Vec<[Option<usize>; NOTES]>,
    is_mono: bool,
    mono_slots: [Option<usize>; CHANNELS],
    note_stacks: Vec<NoteStack>,
    sustain: [bool; CHANNELS],
    deferred: Vec<[bool; NOTES]>,
}

impl PolySynth {
    /// Build a synth and the handle a control thread uses to talk to it.
    pub fn new(config: SynthConfig) -> Result<(Self, SynthHandle), SynthError> {
        Self::with_waveforms(config, Arc::new(Waveforms::new()))
    }

    /// Like [`new`](Self::new), sharing already computed standard wavetables
    /// with other instances.
    pub fn with_waveforms(config: SynthConfig, waveforms: Arc<Waveforms>) -> Result<(Self, SynthHandle), SynthError> {
        config.validate()?;

        let SynthConfig {
            sample_rate,
            block_size,
            ..
        } = config;

        let bank = ParamBank::new(block_size, sample_rate);
        let mirror = Arc::new(ParamMirror::new(&bank));
        let dirty = Arc::new(AtomicBool::new(false));
        let (tx, rx) = message::channel(config.message_queue_size);
        let custom = custom_coefficients(&bank, Role::Modulator);
        let seed = |n: usize| n as Number / (2 * POLYPHONY + 1) as Number;

        let synth = Self {
            producer: Producer::new(2, block_size, sample_rate, 0),
            rx,
            mirror: Arc::clone(&mirror),
            dirty: Arc::clone(&dirty),
            gc_interval_samples: config.gc_interval_samples,
            gc_threshold: config.gc_threshold,
            samples_since_gc: 0,
            bpm: config.bpm,

            controllers: MidiControllers::new(),
            macros: (0..MACROS).map(Macro::new).collect(),
            lfos: (0..LFOS).map(|index| Lfo::new(index, block_size, sample_rate)).collect(),
            waveforms,
            custom_waveforms: [Wavetable::new(&custom), Wavetable::new(&custom)],
            custom_change_indices: [[None; CUSTOM_HARMONICS]; 2],
            tuning: TuningTable::new(),
            synced_inaccuracy: next_inaccuracy(0.5),
            bank,

            modulators: (0..POLYPHONY)
                .map(|slot| Voice::new(seed(slot + 1), block_size, sample_rate))
                .collect(),
            carriers: (0..POLYPHONY)
                .map(|slot| Voice::new(seed(POLYPHONY + slot + 1), block_size, sample_rate))
                .collect(),
            silence: vec![0.0; block_size],
            next_slot: POLYPHONY - 1,
            next_note_id: 0,
            previous_note: None,

            assignments: vec![[None; NOTES]; CHANNELS],
            is_mono: false,
            mono_slots: [None; CHANNELS],
            note_stacks: vec![NoteStack::new(); CHANNELS],
            sustain: [false; CHANNELS],
            deferred: vec![[false; NOTES]; CHANNELS],
        };

        tracing::info!(sample_rate, block_size, polyphony = POLYPHONY, "synth ready");

        Ok((synth, SynthHandle::new(tx, mirror, dirty)))
    }

    pub fn bank(&self) -> &ParamBank {
        &self.bank
    }

    pub fn bpm(&self) -> Number {
        self.bpm
    }

    pub fn is_mono(&self) -> bool {
        self.is_mono
    }

    /// Slots with at least one voice still sounding.
    pub fn active_voices(&self) -> usize {
        self.modulators
            .iter()
            .zip(&self.carriers)
            .filter(|(modulator, carrier)| modulator.is_active() || carrier.is_active())
            .count()
    }

    pub fn set_bpm(&mut self, bpm: Number) {
        if !(bpm.is_finite() && bpm > 0.0) {
            tracing::warn!(bpm, "ignoring invalid tempo");
            return;
        }

        self.bpm = bpm;
    }

    /// Drain the message queue. Called at the start of every
    /// [`generate_samples`](Self::generate_samples).
    pub fn process_messages(&mut self) {
        while let Ok(message) = self.rx.pop() {
            self.apply_message(message);
        }
    }

    /// Render `sample_count` frames of round `round`; returns the left and
    /// right channel.
    ///
    /// # Panics
    ///
    /// If `sample_count` exceeds the configured block size.
    pub fn generate_samples(&mut self, round: Round, sample_count: usize) -> &[Vec<Sample>] {
        self.process_messages();

        let is_new_round = self.producer.cached_round() != Some(round);
        self.produce((), round, sample_count);

        if is_new_round {
            self.samples_since_gc += sample_count;

            if self.samples_since_gc >= self.gc_interval_samples {
                self.samples_since_gc = 0;
                self.collect_garbage();
            }

            self.mirror.store_all(&self.bank);
        }

        self.producer.buffers()
    }

    pub fn note_on(&mut self, time_offset: Seconds, channel: u8, note: u8, velocity: u8) {
        if channel as usize >= CHANNELS || note as usize >= NOTES {
            return;
        }

        let velocity = ratio_of(velocity);
        self.push_controller(time_offset, ControllerId::TRIGGERED_NOTE, ratio_of(note));
        self.push_controller(time_offset, ControllerId::TRIGGERED_VELOCITY, velocity);

        self.deferred[channel as usize][note as usize] = false;
        self.synced_inaccuracy = next_inaccuracy(self.synced_inaccuracy);

        let note = Note {
            id: self.next_note_id(),
            channel,
            note,
            velocity,
        };

        if self.is_mono {
            self.note_stacks[channel as usize].push(note.note, velocity);
            self.mono_play(time_offset, note);
        } else {
            self.poly_note_on(time_offset, note);
        }

        self.previous_note = Some(note.note);
    }

    pub fn note_off(&mut self, time_offset: Seconds, channel: u8, note: u8, velocity: u8) {
        if channel as usize >= CHANNELS || note as usize >= NOTES {
            return;
        }

        self.push_controller(time_offset, ControllerId::RELEASED_VELOCITY, ratio_of(velocity));

        if self.sustain[channel as usize] {
            self.deferred[channel as usize][note as usize] = true;
            return;
        }

        self.release_note(time_offset, channel, note);
    }

    pub fn control_change(&mut self, time_offset: Seconds, channel: u8, controller: u8, value: u8) {
        if channel as usize >= CHANNELS {
            return;
        }

        match controller {
            ALL_SOUND_OFF => self.all_sound_off(channel),
            RESET_ALL_CONTROLLERS => self.reset_all_controllers(time_offset, channel),
            ALL_NOTES_OFF | OMNI_MODE_OFF | OMNI_MODE_ON => self.all_notes_off(time_offset, channel),
            MONO_MODE_ON => self.mono_mode_on(time_offset, channel),
            POLY_MODE_ON => self.mono_mode_off(time_offset, channel),
            _ => {
                let Some(id) = ControllerId::control_change(controller) else {
                    return;
                };

                self.push_controller(time_offset, id, ratio_of(value));

                if controller == SUSTAIN_PEDAL {
                    self.sustain_pedal(time_offset, channel, value >= 64);
                }
            }
        }
    }

    /// `value` is the 14-bit wheel position, 8192 at the center.
    pub fn pitch_wheel_change(&mut self, time_offset: Seconds, channel: u8, value: u16) {
        if channel as usize >= CHANNELS {
            return;
        }

        let ratio = value.min(16383) as Number / 16383.0;
        self.push_controller(time_offset, ControllerId::PITCH_WHEEL, ratio);
    }

    pub fn channel_pressure(&mut self, time_offset: Seconds, channel: u8, pressure: u8) {
        if channel as usize >= CHANNELS {
            return;
        }

        self.push_controller(time_offset, ControllerId::CHANNEL_PRESSURE, ratio_of(pressure));
    }

    pub fn aftertouch(&mut self, time_offset: Seconds, channel: u8, note: u8, pressure: u8) {
        if channel as usize >= CHANNELS || note as usize >= NOTES {
            return;
        }

        self.push_controller(time_offset, ControllerId::AFTERTOUCH, ratio_of(pressure));
    }

    /// Silence every voice of `channel` now, without release.
    pub fn all_sound_off(&mut self, channel: u8) {
        if channel as usize >= CHANNELS {
            return;
        }

        for slot in 0..POLYPHONY {
            if self.slot_channel(slot) == Some(channel) {
                self.dispatch(slot, SlotAction::Cancel);
            }
        }

        self.forget_channel(channel);
    }

    /// Release every note playing on `channel`.
    pub fn all_notes_off(&mut self, time_offset: Seconds, channel: u8) {
        if channel as usize >= CHANNELS {
            return;
        }

        for slot in 0..POLYPHONY {
            if self.carriers[slot].is_on() && self.slot_channel(slot) == Some(channel) {
                self.release_slot(time_offset, slot);
            }
        }

        self.forget_channel(channel);
    }

    pub fn reset_all_controllers(&mut self, time_offset: Seconds, channel: u8) {
        if channel as usize >= CHANNELS {
            return;
        }

        self.controllers.reset();

        let midi = (0..ControllerId::MIDI_REGISTERS)
            .map(|id| ControllerId(id as u8))
            .filter(|id| id.is_midi());

        for id in midi {
            self.bank
                .schedule_controller_value(time_offset, id, self.controllers.get(id));
        }

        self.sustain_pedal(time_offset, channel, false);
    }

    /// One voice per channel from now on. Every playing note is released;
    /// the mode is synth-wide whichever channel asked.
    pub fn mono_mode_on(&mut self, time_offset: Seconds, channel: u8) {
        if (channel as usize) < CHANNELS {
            self.set_mono(time_offset, true);
        }
    }

    pub fn mono_mode_off(&mut self, time_offset: Seconds, channel: u8) {
        if (channel as usize) < CHANNELS {
            self.set_mono(time_offset, false);
        }
    }

    fn set_mono(&mut self, time_offset: Seconds, is_mono: bool) {
        if self.is_mono == is_mono {
            return;
        }

        for channel in 0..CHANNELS as u8 {
            self.all_notes_off(time_offset, channel);
        }

        self.is_mono = is_mono;
        tracing::trace!(is_mono, "voice mode changed");
    }

    /// A new frequency for one note of the external tuning table.
    pub fn update_note_tuning(&mut self, channel: u8, note: u8, frequency: Frequency) {
        if !self.tuning.update(channel, note, frequency) {
            return;
        }

        for slot in 0..POLYPHONY {
            let playing = self.carriers[slot].note();

            if self.carriers[slot].is_on() && playing.channel == channel && playing.note == note {
                self.dispatch(slot, SlotAction::Retune);
            }
        }
    }

    pub fn update_note_tunings(&mut self, tunings: &[NoteTuning]) {
        for tuning in tunings {
            self.update_note_tuning(tuning.channel, tuning.note, tuning.frequency);
        }
    }

    /// Fill `notes` with the notes currently held down (so an external tuning
    /// source knows what to retune); returns how many were written.
    pub fn collect_active_notes(&self, notes: &mut [NoteTuning]) -> usize {
        let playing = self.carriers.iter().filter(|carrier| carrier.is_on());
        let mut count = 0;

        for (slot, carrier) in notes.iter_mut().zip(playing) {
            let note = carrier.note();

            *slot = NoteTuning {
                channel: note.channel,
                note: note.note,
                frequency: carrier.frequency(),
            };
            count += 1;
        }

        count
    }

    fn apply_message(&mut self, message: Message) {
        let id = message.param_id;

        match message.kind {
            MessageKind::SetParam => {
                self.bank.set_ratio(id, message.number_param);
                self.mirror.store(id, &self.bank);
                self.dirty.store(true, Ordering::Release);
            }
            MessageKind::AssignController => {
                let controller = ControllerId(message.byte_param);

                if self.bank.assign_controller(id, controller) {
                    self.sync_controller(id, controller);
                    self.mirror.store(id, &self.bank);
                    self.dirty.store(true, Ordering::Release);
                } else {
                    tracing::debug!(param = id.name(), controller = controller.0, "controller rejected");
                }
            }
            MessageKind::RefreshParam => self.mirror.store(id, &self.bank),
            MessageKind::Clear => self.clear(),
            MessageKind::ClearDirtyFlag => self.dirty.store(false, Ordering::Release),
        }
    }

    /// Move a freshly bound parameter to its controller's current value.
    fn sync_controller(&mut self, id: ParamId, controller: ControllerId) {
        let source = if controller.is_midi() {
            self.controllers.get(controller)
        } else if let Some(index) = controller.macro_index() {
            self.macros[index].value()
        } else {
            return;
        };

        if id.is_float() {
            let param = self.bank.float_mut(id);
            let value = param.ratio_to_value(param.binding().apply(source));
            param.set_value(value);
        } else {
            let param = self.bank.byte_mut(id);
            param.set_ratio(param.binding().apply(source));
        }
    }

    fn clear(&mut self) {
        for slot in 0..POLYPHONY {
            self.dispatch(slot, SlotAction::Cancel);
        }

        self.bank.reset();
        self.controllers.reset();
        self.macros = (0..MACROS).map(Macro::new).collect();
        self.lfos.iter_mut().for_each(Lfo::reset);
        self.custom_change_indices = [[None; CUSTOM_HARMONICS]; 2];

        for channel in 0..CHANNELS as u8 {
            self.forget_channel(channel);
        }

        self.is_mono = false;
        self.previous_note = None;
        self.mirror.store_all(&self.bank);
        self.dirty.store(true, Ordering::Release);

        tracing::debug!("synth cleared");
    }

    fn push_controller(&mut self, time_offset: Seconds, id: ControllerId, ratio: Number) {
        if self.controllers.set(id, ratio) {
            self.bank.schedule_controller_value(time_offset, id, ratio);
        }
    }

    fn next_note_id(&mut self) -> NoteId {
        self.next_note_id = (self.next_note_id + 1) & NOTE_ID_MASK;
        self.next_note_id
    }

    fn poly_note_on(&mut self, time_offset: Seconds, note: Note) {
        let playing = self.assignments[note.channel as usize][note.note as usize]
            .filter(|&slot| self.carriers[slot].is_on());
        let slot = match playing {
            Some(slot) => slot,
            None => self.allocate_slot(),
        };

        self.start_slot(time_offset, slot, note);
        self.assignments[note.channel as usize][note.note as usize] = Some(slot);
    }

    fn mono_play(&mut self, time_offset: Seconds, note: Note) {
        let channel = note.channel as usize;

        match self.mono_slots[channel] {
            Some(slot) if self.carriers[slot].is_on() => {
                self.dispatch(slot, SlotAction::GlideTo { time_offset, note });
            }
            _ => {
                let slot = self.allocate_slot();
                self.start_slot(time_offset, slot, note);
                self.mono_slots[channel] = Some(slot);
            }
        }
    }

    fn release_note(&mut self, time_offset: Seconds, channel: u8, note: u8) {
        if self.is_mono {
            self.mono_release(time_offset, channel, note);
        } else if let Some(slot) = self.assignments[channel as usize][note as usize].take() {
            self.release_slot(time_offset, slot);
        }
    }

    fn mono_release(&mut self, time_offset: Seconds, channel: u8, note: u8) {
        let stack = &mut self.note_stacks[channel as usize];
        let was_top = stack.top().map(|(top, _)| top) == Some(note);
        stack.remove(note);

        if !was_top {
            return;
        }

        match stack.top() {
            Some((previous, velocity)) => {
                let note = Note {
                    id: self.next_note_id(),
                    channel,
                    note: previous,
                    velocity,
                };
                self.mono_play(time_offset, note);
            }
            None => {
                if let Some(slot) = self.mono_slots[channel as usize].take() {
                    self.release_slot(time_offset, slot);
                }
            }
        }
    }

    fn release_slot(&mut self, time_offset: Seconds, slot: usize) {
        let note = self.carriers[slot].note();

        self.dispatch(
            slot,
            SlotAction::NoteOff {
                time_offset,
                note_id: note.id,
                note: note.note,
            },
        );
    }

    fn sustain_pedal(&mut self, time_offset: Seconds, channel: u8, is_down: bool) {
        let index = channel as usize;
        self.sustain[index] = is_down;

        if is_down {
            return;
        }

        for note in 0..NOTES {
            if std::mem::take(&mut self.deferred[index][note]) {
                self.release_note(time_offset, channel, note as u8);
            }
        }
    }

    /// Next slot in round robin order whose voices are both off; when every
    /// slot is playing, the next one is stolen.
    fn allocate_slot(&mut self) -> usize {
        for _ in 0..POLYPHONY {
            self.next_slot = (self.next_slot + 1) % POLYPHONY;

            if !self.modulators[self.next_slot].is_on() && !self.carriers[self.next_slot].is_on() {
                self.unlink_slot(self.next_slot);
                return self.next_slot;
            }
        }

        self.next_slot = (self.next_slot + 1) % POLYPHONY;
        tracing::trace!(slot = self.next_slot, "stealing voice");
        self.unlink_slot(self.next_slot);

        self.next_slot
    }

    /// Drop every note-to-slot link that points at `slot`.
    fn unlink_slot(&mut self, slot: usize) {
        let note = self.carriers[slot].note();
        let assignment = &mut self.assignments[note.channel as usize % CHANNELS][note.note as usize % NOTES];

        if *assignment == Some(slot) {
            *assignment = None;
        }

        for mono_slot in self.mono_slots.iter_mut() {
            if *mono_slot == Some(slot) {
                *mono_slot = None;
            }
        }
    }

    fn start_slot(&mut self, time_offset: Seconds, slot: usize, note: Note) {
        let previous_note = self.previous_note;
        let is_sounding = self.modulators[slot].is_active() || self.carriers[slot].is_active();
        let action = if is_sounding {
            SlotAction::Retrigger {
                time_offset,
                note,
                previous_note,
            }
        } else {
            SlotAction::NoteOn {
                time_offset,
                note,
                previous_note,
            }
        };

        self.dispatch(slot, action);
    }

    fn slot_channel(&self, slot: usize) -> Option<u8> {
        let carrier = &self.carriers[slot];
        let modulator = &self.modulators[slot];

        (carrier.is_active() || modulator.is_active()).then(|| carrier.note().channel)
    }

    fn forget_channel(&mut self, channel: u8) {
        let index = channel as usize;

        self.assignments[index] = [None; NOTES];
        self.deferred[index] = [false; NOTES];
        self.note_stacks[index].clear();
        self.mono_slots[index] = None;
    }

    fn dispatch(&mut self, slot: usize, action: SlotAction) {
        let modulator = VoiceCtx {
            bank: &self.bank,
            waveforms: &self.waveforms,
            custom: &self.custom_waveforms[0],
            tuning: &self.tuning,
            bpm: self.bpm,
            synced_inaccuracy: self.synced_inaccuracy,
            modulation: None,
        };
        let carrier = VoiceCtx {
            custom: &self.custom_waveforms[1],
            ..modulator
        };

        action.apply(&mut self.modulators[slot], &modulator);
        action.apply(&mut self.carriers[slot], &carrier);
    }

    fn update_custom_waveforms(&mut self) {
        for (index, role) in [Role::Modulator, Role::Carrier].into_iter().enumerate() {
            let mut changed = false;

            for (harmonic, seen) in self.custom_change_indices[index].iter_mut().enumerate() {
                let change_index = self.bank.float(ParamId::custom_harmonic(role, harmonic)).change_index();

                if *seen != Some(change_index) {
                    *seen = Some(change_index);
                    changed = true;
                }
            }

            if changed {
                let coefficients = custom_coefficients(&self.bank, role);
                self.custom_waveforms[index].update_coefficients(&coefficients);
            }
        }
    }

    /// Cancel voices whose envelopes faded out for good.
    fn collect_garbage(&mut self) {
        let threshold = self.gc_threshold;
        let mut collected = 0;

        for slot in 0..POLYPHONY {
            let modulator = &mut self.modulators[slot];
            if modulator.is_active() && modulator.has_decayed(threshold) {
                modulator.cancel_note();
                collected += 1;
            }

            let carrier = &mut self.carriers[slot];
            if carrier.is_active() && carrier.has_decayed(threshold) {
                carrier.cancel_note();
                collected += 1;
            }

            if !self.modulators[slot].is_on() && !self.carriers[slot].is_on() {
                self.unlink_slot(slot);
            }
        }

        if collected > 0 {
            tracing::trace!(collected, "collected decayed voices");
        }
    }
}

impl SignalProducer for PolySynth {
    type Event = ();
    type Context<'c> = ();

    fn producer(&self) -> &Producer<()> {
        &self.producer
    }

    fn producer_mut(&mut self) -> &mut Producer<()> {
        &mut self.producer
    }

    fn initialize_rendering(&mut self, _ctx: (), round: Round, sample_count: usize) -> Prerender {
        self.bank.render_control_params(round, sample_count);

        for (index, macro_) in self.macros.iter_mut().enumerate() {
            if macro_.update(&self.bank) {
                self.bank
                    .schedule_controller_value(0.0, ControllerId::macro_(index), macro_.value());
            }
        }

        let ctx = LfoCtx {
            bank: &self.bank,
            waveforms: &self.waveforms,
            bpm: self.bpm,
        };
        for lfo in self.lfos.iter_mut() {
            lfo.produce(ctx, round, sample_count);
        }

        self.bank.render_leaders(round, sample_count, &self.lfos);
        self.update_custom_waveforms();

        let settled = self.modulators.iter().any(|voice| voice.awaits_synced_drift())
            || self.carriers.iter().any(|voice| voice.awaits_synced_drift());
        if settled {
            self.synced_inaccuracy = next_inaccuracy(self.synced_inaccuracy);
        }

        let frequency_level = self.bank.float(ParamId::FM).producer().buffer(0);
        let phase_level = self.bank.float(ParamId::PM).producer().buffer(0);
        let amplitude_level = self.bank.float(ParamId::AM).producer().buffer(0);
        let modulator_ctx = VoiceCtx {
            bank: &self.bank,
            waveforms: &self.waveforms,
            custom: &self.custom_waveforms[0],
            tuning: &self.tuning,
            bpm: self.bpm,
            synced_inaccuracy: self.synced_inaccuracy,
            modulation: None,
        };

        for slot in 0..POLYPHONY {
            let modulator = &mut self.modulators[slot];
            let signal = if modulator.is_active() {
                modulator.produce(modulator_ctx, round, sample_count);
                modulator.mono()
            } else {
                &self.silence
            };

            let carrier = &mut self.carriers[slot];
            if carrier.is_active() {
                let ctx = VoiceCtx {
                    custom: &self.custom_waveforms[1],
                    modulation: Some(VoiceModulation {
                        signal,
                        frequency_level,
                        phase_level,
                        amplitude_level,
                    }),
                    ..modulator_ctx
                };
                carrier.produce(ctx, round, sample_count);
            }
        }

        Prerender::Render
    }

    fn render(&mut self, _ctx: (), round: Round, first: usize, last: usize, buffers: &mut [Vec<Sample>]) {
        let mix = self.bank.float(ParamId::MIX).producer().buffer(0);

        for buffer in buffers.iter_mut() {
            buffer[first..last].fill(0.0);
        }

        for modulator in self.modulators.iter() {
            if modulator.producer().cached_round() != Some(round) {
                continue;
            }

            for (channel, source) in modulator.producer().buffers().iter().enumerate() {
                for i in first..last {
                    buffers[channel][i] += mix[i] * source[i];
                }
            }
        }

        for carrier in self.carriers.iter() {
            if carrier.producer().cached_round() != Some(round) {
                continue;
            }

            for (channel, source) in carrier.producer().buffers().iter().enumerate() {
                for i in first..last {
                    buffers[channel][i] += source[i];
                }
            }
        }
    }

    fn set_sample_rate(&mut self, sample_rate: Frequency) {
        self.bank.set_sample_rate(sample_rate);
        self.lfos.iter_mut().for_each(|lfo| lfo.set_sample_rate(sample_rate));
        self.modulators.iter_mut().for_each(|voice| voice.set_sample_rate(sample_rate));
        self.carriers.iter_mut().for_each(|voice| voice.set_sample_rate(sample_rate));
        self.producer.set_sample_rate(sample_rate);

        tracing::debug!(sample_rate, "sample rate changed");
    }

    /// # Panics
    ///
    /// If `block_size` is zero or above [`MAX_BLOCK_SIZE`].
    fn set_block_size(&mut self, block_size: usize) {
        assert!(
            block_size > 0 && block_size <= MAX_BLOCK_SIZE,
            "block size {} is outside 1..={}",
            block_size,
            MAX_BLOCK_SIZE
        );

        self.bank.set_block_size(block_size);
        self.lfos.iter_mut().for_each(|lfo| lfo.set_block_size(block_size));
        self.modulators.iter_mut().for_each(|voice| voice.set_block_size(block_size));
        self.carriers.iter_mut().for_each(|voice| voice.set_block_size(block_size));
        self.silence.resize(block_size, 0.0);
        self.producer.set_block_size(block_size);

        tracing::debug!(block_size, "block size changed");
    }
}

fn ratio_of(value: u8) -> Number {
    value.min(127) as Number / 127.0
}

fn custom_coefficients(bank: &ParamBank, role: Role) -> [Number; CUSTOM_HARMONICS] {
    let mut coefficients = [0.0; CUSTOM_HARMONICS];

    for (harmonic, coefficient) in coefficients.iter_mut().enumerate() {
        *coefficient = bank.float(ParamId::custom_harmonic(role, harmonic)).value();
    }

    coefficients
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ids::{EnvelopeParam, VoiceByteParam, VoiceParam};

    const BLOCK: usize = 256;
    const SAMPLE_RATE: Frequency = 22_050.0;

    fn synth() -> (PolySynth, SynthHandle) {
        let config = SynthConfig::default()
            .with_sample_rate(SAMPLE_RATE)
            .with_block_size(BLOCK)
            .with_message_queue_size(16);

        PolySynth::new(config).unwrap()
    }

    fn peak(synth: &mut PolySynth, rounds: std::ops::Range<Round>) -> Sample {
        let mut peak: Sample = 0.0;

        for round in rounds {
            for channel in synth.generate_samples(round, BLOCK) {
                peak = channel.iter().fold(peak, |acc, &s| acc.max(s.abs()));
            }
        }

        peak
    }

    #[test]
    fn silent_without_notes() {
        let (mut synth, _handle) = synth();

        assert_eq!(peak(&mut synth, 0..4), 0.0);
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn note_on_sounds_and_note_off_stops() {
        let (mut synth, _handle) = synth();

        synth.note_on(0.0, 0, 69, 127);
        assert!(peak(&mut synth, 0..4) > 0.05);
        assert_eq!(synth.active_voices(), 1);

        synth.note_off(0.0, 0, 69, 64);
        peak(&mut synth, 4..5);
        assert_eq!(peak(&mut synth, 5..8), 0.0);
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn notes_get_their_own_slots() {
        let (mut synth, _handle) = synth();

        for note in 60..70 {
            synth.note_on(0.0, 0, note, 100);
        }
        peak(&mut synth, 0..1);

        assert_eq!(synth.active_voices(), 10);
    }

    #[test]
    fn stealing_keeps_the_newest_note() {
        let (mut synth, _handle) = synth();

        for i in 0..POLYPHONY as u8 + 1 {
            synth.note_on(0.0, i / 64, 30 + i % 64, 100);
        }
        peak(&mut synth, 0..2);

        let mut notes = [NoteTuning::default(); POLYPHONY];
        let count = synth.collect_active_notes(&mut notes);

        assert_eq!(count, POLYPHONY);
        assert!(notes.iter().any(|n| n.channel == 1 && n.note == 30));
        assert!(!notes.iter().any(|n| n.channel == 0 && n.note == 30));
    }

    #[test]
    fn sustain_pedal_defers_releases() {
        let (mut synth, _handle) = synth();

        synth.control_change(0.0, 0, SUSTAIN_PEDAL, 127);
        synth.note_on(0.0, 0, 60, 100);
        synth.note_off(0.0, 0, 60, 0);
        peak(&mut synth, 0..2);
        assert_eq!(synth.active_voices(), 1);

        synth.control_change(0.0, 0, SUSTAIN_PEDAL, 0);
        peak(&mut synth, 2..4);
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn mono_mode_returns_to_the_held_note() {
        let (mut synth, _handle) = synth();

        synth.control_change(0.0, 0, MONO_MODE_ON, 0);
        assert!(synth.is_mono());

        synth.note_on(0.0, 0, 60, 100);
        synth.note_on(0.0, 0, 64, 100);
        peak(&mut synth, 0..2);
        assert_eq!(synth.active_voices(), 1);

        synth.note_off(0.0, 0, 64, 0);
        peak(&mut synth, 2..6);

        let mut notes = [NoteTuning::default(); 4];
        assert_eq!(synth.collect_active_notes(&mut notes), 1);
        assert_eq!(notes[0].note, 60);

        synth.note_off(0.0, 0, 60, 0);
        peak(&mut synth, 6..8);
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn all_sound_off_is_immediate() {
        let (mut synth, _handle) = synth();

        synth.note_on(0.0, 3, 60, 100);
        synth.note_on(0.0, 4, 60, 100);
        peak(&mut synth, 0..1);

        synth.control_change(0.0, 3, ALL_SOUND_OFF, 0);
        assert_eq!(synth.active_voices(), 1);
    }

    #[test]
    fn set_param_messages_apply_at_the_next_block() {
        let (mut synth, mut handle) = synth();
        let volume = ParamId::voice(Role::Carrier, VoiceParam::Volume);

        handle.set_param_ratio(volume, 0.5).unwrap();
        assert!(!handle.is_dirty());

        synth.generate_samples(0, BLOCK);

        assert!((synth.bank().float(volume).ratio() - 0.5).abs() < 1e-12);
        assert!((handle.get_param_ratio_atomic(volume) - 0.5).abs() < 1e-12);
        assert!(handle.is_dirty());

        handle.clear_dirty_flag().unwrap();
        synth.generate_samples(1, BLOCK);
        assert!(!handle.is_dirty());
    }

    #[test]
    fn assigned_controllers_follow_midi() {
        let (mut synth, mut handle) = synth();
        let fm = ParamId::FM;

        handle.assign_controller(fm, ControllerId::PITCH_WHEEL).unwrap();
        synth.generate_samples(0, BLOCK);

        assert_eq!(handle.get_param_controller_id_atomic(fm), ControllerId::PITCH_WHEEL);
        assert!((synth.bank().float(fm).ratio() - 0.5).abs() < 1e-12);

        synth.pitch_wheel_change(0.0, 0, 16383);
        synth.generate_samples(1, BLOCK);
        assert!((synth.bank().float(fm).ratio() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn clear_restores_defaults_and_silences() {
        let (mut synth, mut handle) = synth();
        let volume = ParamId::voice(Role::Modulator, VoiceParam::Volume);

        synth.note_on(0.0, 0, 60, 100);
        handle.set_param_ratio(volume, 1.0).unwrap();
        synth.generate_samples(0, BLOCK);

        handle.clear().unwrap();
        synth.generate_samples(1, BLOCK);

        assert_eq!(synth.active_voices(), 0);
        assert!((synth.bank().float(volume).value() - 0.33).abs() < 1e-9);
    }

    #[test]
    fn realtime_tuning_follows_table_updates() {
        let (mut synth, mut handle) = synth();

        handle
            .set_param_ratio(ParamId::voice_byte(Role::Carrier, VoiceByteParam::Tuning), 1.0)
            .unwrap();
        synth.generate_samples(0, BLOCK);

        synth.note_on(0.0, 2, 69, 100);
        peak(&mut synth, 1..2);

        let mut notes = [NoteTuning::default(); 1];
        synth.collect_active_notes(&mut notes);
        assert!((notes[0].frequency - 440.0).abs() < 1e-6, "got {}", notes[0].frequency);

        synth.update_note_tuning(2, 69, 220.0);
        synth.update_note_tuning(2, 70, -1.0);
        peak(&mut synth, 2..4);

        synth.collect_active_notes(&mut notes);
        assert_eq!(notes[0].channel, 2);
        assert!((notes[0].frequency - 220.0).abs() < 1e-6, "got {}", notes[0].frequency);
    }

    #[test]
    fn release_at_the_onset_starts_from_silence() {
        let (mut synth, mut handle) = synth();

        for role in [Role::Modulator, Role::Carrier] {
            handle
                .assign_controller(ParamId::voice(role, VoiceParam::Amplitude), ControllerId::envelope(0))
                .unwrap();
        }
        synth.generate_samples(0, BLOCK);

        synth.note_on(0.0, 0, 69, 127);
        synth.note_off(0.0, 0, 69, 127);

        let onset = peak(&mut synth, 1..2);
        assert!(onset < 0.01, "onset peak {}", onset);
    }

    #[test]
    fn synced_inaccuracy_keeps_drifting_while_notes_sustain() {
        let (mut synth, mut handle) = synth();

        // scheme 2: 440 Hz with a synth-wide inaccuracy
        for role in [Role::Modulator, Role::Carrier] {
            handle
                .set_param_ratio(ParamId::voice_byte(role, VoiceByteParam::Tuning), 2.0 / 15.0)
                .unwrap();
        }
        synth.generate_samples(0, BLOCK);

        synth.note_on(0.0, 0, 69, 100);
        let rolled = synth.synced_inaccuracy;

        peak(&mut synth, 1..4);
        assert_ne!(synth.synced_inaccuracy, rolled);
        assert!((0.1..=1.0).contains(&synth.synced_inaccuracy));
    }

    #[test]
    fn decayed_voices_are_collected() {
        let config = SynthConfig::default()
            .with_sample_rate(SAMPLE_RATE)
            .with_block_size(BLOCK)
            .with_garbage_collection(BLOCK, 0.001);
        let (mut synth, mut handle) = PolySynth::new(config).unwrap();
        let amplitude = ParamId::voice(Role::Carrier, VoiceParam::Amplitude);

        handle.assign_controller(amplitude, ControllerId::envelope(0)).unwrap();
        handle
            .set_param_ratio(ParamId::envelope(0, EnvelopeParam::SustainValue), 0.0)
            .unwrap();
        for param in [EnvelopeParam::HoldTime, EnvelopeParam::DecayTime] {
            handle.set_param_ratio(ParamId::envelope(0, param), 0.0).unwrap();
        }
        synth.generate_samples(0, BLOCK);

        synth.note_on(0.0, 0, 60, 100);
        peak(&mut synth, 1..8);

        let mut notes = [NoteTuning::default(); 1];
        assert_eq!(synth.collect_active_notes(&mut notes), 0);
    }
}
