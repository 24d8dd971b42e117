use crate::{
    dsp::{
        math::{distort, randomize, DistortionShape},
        wavetable::{Waveform, Waveforms, WavetableState},
    },
    graph::producer::{Prerender, Producer, SignalProducer},
    param::{
        bank::ParamBank,
        ids::{LfoByteParam, LfoParam, ParamId},
    },
    Frequency, Number, Round, Sample,
};

/*
LFO (Low Frequency Oscillator)
==============================

The synth has eight LFOs. They are not part of any voice: each renders once
per round, before the voice leaders, and parameters bound to it read its
buffer sample by sample.

The output is a ratio in [0, 1], not an audio signal:

  range  = max - min
  output = min + range · amount · (1 + osc)

  amount ≤ 0.5, so the output never leaves [min, max]:

  max ─ ─ ─ ─ ╭──╮─ ─ ─ ─ ─ ─ ╭──╮─ ─
             ╱    ╲          ╱    ╲
  min + a·r ╱──────╲────────╱──────╲──
                    ╲      ╱
  min ─ ─ ─ ─ ─ ─ ─ ─╰────╯─ ─ ─ ─ ─ ─

Tempo sync reads the frequency as cycles per beat: f · bpm / 60.

The phase parameter restarts the cycle whenever it changes, so phase offsets
between LFOs stay put.
*/

/// Distortion curve applied to LFO outputs.
const DISTORTION_SHAPE: DistortionShape = DistortionShape::Moderate;

/// Borrowed collaborators of an LFO.
#[derive(Clone, Copy)]
pub struct LfoCtx<'a> {
    pub bank: &'a ParamBank,
    pub waveforms: &'a Waveforms,
    pub bpm: Number,
}

#[derive(Debug, Clone)]
pub struct Lfo {
    producer: Producer<()>,
    index: usize,
    state: WavetableState,
    phase_change_index: Option<u64>,
}

impl Lfo {
    pub fn new(index: usize, block_size: usize, sample_rate: Frequency) -> Self {
        Self {
            producer: Producer::new(1, block_size, sample_rate, 0),
            index,
            state: WavetableState::new(sample_rate),
            phase_change_index: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Restart from the phase parameter on the next round.
    pub fn reset(&mut self) {
        self.phase_change_index = None;
    }
}

impl SignalProducer for Lfo {
    type Event = ();
    type Context<'c> = LfoCtx<'c>;

    fn producer(&self) -> &Producer<()> {
        &self.producer
    }

    fn producer_mut(&mut self) -> &mut Producer<()> {
        &mut self.producer
    }

    fn initialize_rendering(&mut self, ctx: LfoCtx<'_>, _round: Round, _sample_count: usize) -> Prerender {
        let phase = ctx.bank.float(ParamId::lfo(self.index, LfoParam::Phase));

        if self.phase_change_index != Some(phase.change_index()) {
            self.phase_change_index = Some(phase.change_index());
            self.state.reset(phase.value());
        }

        Prerender::Render
    }

    fn render(&mut self, ctx: LfoCtx<'_>, _round: Round, first: usize, last: usize, buffers: &mut [Vec<Sample>]) {
        let param = |p| ctx.bank.float(ParamId::lfo(self.index, p)).value();
        let byte = |p| ctx.bank.byte(ParamId::lfo_byte(self.index, p)).value();

        let mut frequency = param(LfoParam::Frequency);
        if byte(LfoByteParam::TempoSync) != 0 {
            frequency *= ctx.bpm / 60.0;
        }

        let min = param(LfoParam::Min);
        let scale = (param(LfoParam::Max) - min) * param(LfoParam::Amount);
        let distortion = param(LfoParam::Distortion);
        let randomness = param(LfoParam::Randomness);
        let waveforms = ctx.waveforms;
        let table = waveforms.select(Waveform::from_byte(byte(LfoByteParam::Waveform)), waveforms.sine());

        for sample in buffers[0][first..last].iter_mut() {
            let oscillation = table.lookup(&mut self.state, frequency, 0.0);
            let ratio = (min + scale * (1.0 + oscillation)).clamp(0.0, 1.0);
            let shaped = randomize(randomness, distort(distortion, ratio, DISTORTION_SHAPE));

            *sample = shaped as Sample;
        }
    }

    fn set_sample_rate(&mut self, sample_rate: Frequency) {
        self.state.set_sample_rate(sample_rate);
        self.producer.set_sample_rate(sample_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: Frequency = 8_000.0;
    const BLOCK: usize = 256;

    #[test]
    fn defaults_sweep_the_whole_range() {
        let bank = ParamBank::new(BLOCK, SAMPLE_RATE);
        let waveforms = Waveforms::new();
        let mut lfo = Lfo::new(0, BLOCK, SAMPLE_RATE);
        let ctx = LfoCtx {
            bank: &bank,
            waveforms: &waveforms,
            bpm: 120.0,
        };

        let mut low: f32 = 1.0;
        let mut high: f32 = 0.0;
        for round in 0..32 {
            for &sample in &lfo.produce(ctx, round, BLOCK)[0] {
                low = low.min(sample);
                high = high.max(sample);
            }
        }

        assert!(low < 0.01, "low {}", low);
        assert!(high > 0.99, "high {}", high);
    }

    #[test]
    fn phase_change_restarts_the_cycle() {
        let mut bank = ParamBank::new(BLOCK, SAMPLE_RATE);
        let waveforms = Waveforms::new();
        let mut lfo = Lfo::new(1, BLOCK, SAMPLE_RATE);

        bank.float_mut(ParamId::lfo(1, LfoParam::Phase)).set_value(0.25);
        let ctx = LfoCtx {
            bank: &bank,
            waveforms: &waveforms,
            bpm: 120.0,
        };
        let first = lfo.produce(ctx, 1, BLOCK)[0][0];

        // sin(π/2) = 1, so the output starts at the maximum
        assert!((first - 1.0).abs() < 1e-3, "got {}", first);
    }

    #[test]
    fn amount_narrows_the_swing() {
        let mut bank = ParamBank::new(BLOCK, SAMPLE_RATE);
        let waveforms = Waveforms::new();
        let mut lfo = Lfo::new(2, BLOCK, SAMPLE_RATE);

        bank.float_mut(ParamId::lfo(2, LfoParam::Amount)).set_value(0.25);
        bank.float_mut(ParamId::lfo(2, LfoParam::Frequency)).set_value(10.0);
        let ctx = LfoCtx {
            bank: &bank,
            waveforms: &waveforms,
            bpm: 120.0,
        };

        for round in 0..8 {
            for &sample in &lfo.produce(ctx, round, BLOCK)[0] {
                assert!((-1e-6..=0.5 + 1e-6).contains(&sample), "{} out of range", sample);
            }
        }
    }
}
