use crate::{
    dsp::{
        math::detune,
        wavetable::{WavetableRef, WavetableState},
    },
    graph::{
        events::Event,
        producer::{Prerender, Producer, SignalProducer},
    },
    param::{
        float::{Evaluation, FloatParam, ParamCtx},
        ids::{ParamId, Role, VoiceParam},
    },
    Frequency, Number, Round, Sample,
};

/*
Wavetable Oscillator
====================

The sound source of every voice. It reads a band-limited wavetable at the
frequency given by its frequency parameter, shifted by the detune and fine
detune parameters (in cents), and scales it by its amplitude parameter:

  f   = frequency · 2^((detune + fine) / 1200)
  out = amplitude · table(f)

Band-limiting happens in the wavetable lookup: high notes read tables with
fewer partials so nothing folds back above Nyquist.

The oscillator is silent until a Start event fires and again after a Stop
event. Start restarts the cycle at phase 0, so every note begins the same
way.

Carrier voices can be modulated by the paired modulator's output `m`:

  FM  f     → f · (1 + FM_DEPTH · fm · m)
  PM  phase → phase + pm · m           (in cycles)

where `fm` and `pm` are the synth-wide modulation levels.
*/

/// Frequency deviation of full-scale frequency modulation, as a multiple of
/// the carrier frequency.
pub const FM_DEPTH: Number = 4.0;

pub const FREQUENCY_MIN: Frequency = 0.001;
pub const FREQUENCY_MAX: Frequency = 24_000.0;
pub const FREQUENCY_DEFAULT: Frequency = 440.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscillatorEvent {
    Start,
    Stop,
}

/// Modulator signal plus the rendered FM and PM levels of the round.
#[derive(Clone, Copy)]
pub struct Modulation<'a> {
    pub signal: &'a [Sample],
    pub frequency_level: &'a [Sample],
    pub phase_level: &'a [Sample],
}

/// Borrowed collaborators of an oscillator.
#[derive(Clone, Copy)]
pub struct OscillatorCtx<'a> {
    pub table: WavetableRef<'a>,
    pub amplitude: Option<&'a FloatParam>,
    pub detune: Option<&'a FloatParam>,
    pub fine_detune: Option<&'a FloatParam>,
    pub modulation: Option<Modulation<'a>>,
}

impl<'a> OscillatorCtx<'a> {
    pub fn new(table: WavetableRef<'a>) -> Self {
        Self {
            table,
            amplitude: None,
            detune: None,
            fine_detune: None,
            modulation: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Oscillator {
    producer: Producer<OscillatorEvent>,
    state: WavetableState,
    is_on: bool,
    pub amplitude: FloatParam,
    pub frequency: FloatParam,
    pub detune: FloatParam,
    pub fine_detune: FloatParam,
}

impl Oscillator {
    /// An oscillator whose amplitude and detune parameters have the ranges
    /// of `role`'s voice parameters.
    pub fn new(role: Role, block_size: usize, sample_rate: Frequency) -> Self {
        let param = |p| FloatParam::from_descriptor(ParamId::voice(role, p).descriptor(), block_size, sample_rate);

        Self {
            producer: Producer::new(1, block_size, sample_rate, 8),
            state: WavetableState::new(sample_rate),
            is_on: false,
            amplitude: param(VoiceParam::Amplitude),
            frequency: FloatParam::new(
                FREQUENCY_MIN,
                FREQUENCY_MAX,
                FREQUENCY_DEFAULT,
                Evaluation::Sample,
                block_size,
                sample_rate,
            ),
            detune: param(VoiceParam::Detune),
            fine_detune: param(VoiceParam::FineDetune),
        }
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn start(&mut self, time_offset: Number) {
        self.producer.schedule(time_offset, OscillatorEvent::Start);
    }

    pub fn stop(&mut self, time_offset: Number) {
        self.producer.schedule(time_offset, OscillatorEvent::Stop);
    }

    /// Stop immediately and forget everything scheduled.
    pub fn cancel(&mut self) {
        self.producer.clear_events();
        self.is_on = false;
        self.amplitude.cancel_events();
        self.frequency.cancel_events();
        self.detune.cancel_events();
        self.fine_detune.cancel_events();
    }

    /// Whether the oscillator makes or is about to make sound.
    pub fn is_active(&self) -> bool {
        self.is_on || self.producer.has_events()
    }
}

impl SignalProducer for Oscillator {
    type Event = OscillatorEvent;
    type Context<'c> = OscillatorCtx<'c>;

    fn producer(&self) -> &Producer<OscillatorEvent> {
        &self.producer
    }

    fn producer_mut(&mut self) -> &mut Producer<OscillatorEvent> {
        &mut self.producer
    }

    fn initialize_rendering(&mut self, ctx: OscillatorCtx<'_>, round: Round, sample_count: usize) -> Prerender {
        let follow = |leader| ParamCtx { leader, lfos: &[] };

        self.amplitude.produce(follow(ctx.amplitude), round, sample_count);
        self.frequency.produce(ParamCtx::default(), round, sample_count);
        self.detune.produce(follow(ctx.detune), round, sample_count);
        self.fine_detune.produce(follow(ctx.fine_detune), round, sample_count);

        Prerender::Render
    }

    fn handle_event(&mut self, _ctx: OscillatorCtx<'_>, event: Event<OscillatorEvent>) {
        match event.kind {
            OscillatorEvent::Start => {
                self.is_on = true;
                self.state.reset(0.0);
            }
            OscillatorEvent::Stop => {
                self.is_on = false;
            }
        }
    }

    fn render(&mut self, ctx: OscillatorCtx<'_>, _round: Round, first: usize, last: usize, buffers: &mut [Vec<Sample>]) {
        let out = &mut buffers[0][first..last];

        if !self.is_on {
            out.fill(0.0);
            return;
        }

        let amplitude = &self.amplitude.producer().buffer(0)[first..last];
        let frequency = &self.frequency.producer().buffer(0)[first..last];
        let detune_cents = &self.detune.producer().buffer(0)[first..last];
        let fine_cents = &self.fine_detune.producer().buffer(0)[first..last];

        for (i, sample) in out.iter_mut().enumerate() {
            let cents = detune_cents[i] as Number + fine_cents[i] as Number;
            let mut f = detune(frequency[i] as Number, cents);
            let mut phase_offset = 0.0;

            if let Some(modulation) = ctx.modulation {
                let m = modulation.signal[first + i] as Number;
                f *= 1.0 + FM_DEPTH * modulation.frequency_level[first + i] as Number * m;
                phase_offset = modulation.phase_level[first + i] as Number * m;
            }

            *sample = (amplitude[i] as Number * ctx.table.lookup(&mut self.state, f, phase_offset)) as Sample;
        }
    }

    fn set_sample_rate(&mut self, sample_rate: Frequency) {
        self.amplitude.set_sample_rate(sample_rate);
        self.frequency.set_sample_rate(sample_rate);
        self.detune.set_sample_rate(sample_rate);
        self.fine_detune.set_sample_rate(sample_rate);
        self.state.set_sample_rate(sample_rate);
        self.producer.set_sample_rate(sample_rate);
    }

    fn set_block_size(&mut self, block_size: usize) {
        self.amplitude.set_block_size(block_size);
        self.frequency.set_block_size(block_size);
        self.detune.set_block_size(block_size);
        self.fine_detune.set_block_size(block_size);
        self.producer.set_block_size(block_size);
    }
}
