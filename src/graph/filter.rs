use crate::{
    dsp::filter::{Coefficients, FilterType, SVFilter},
    graph::producer::{Prerender, Producer, SignalProducer},
    param::{
        float::{FloatParam, ParamCtx},
        ids::{ParamId, Role, VoiceParam},
    },
    Frequency, Number, Round, Sample,
};

/*
Voice Filter Stage
==================

Each voice runs its signal through two state-variable filters, one right
after the oscillator and one at the end of the chain:

  osc → [filter 1] → folder → distortion → [filter 2] → volume → pan

Cutoff and Q are sample-evaluated parameters that follow the synth-level
leaders (or run their own envelopes). The filter type is a discrete setting
read once per block.

A low-pass with its cutoff at the top of the range for the whole block is
skipped: the input is copied through untouched.
*/

/// Cutoff at or above which a low-pass counts as fully open.
const OPEN_CUTOFF: Sample = 24_000.0;

/// Which of the two filters of a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSlot {
    First,
    Second,
}

impl FilterSlot {
    fn params(self) -> (VoiceParam, VoiceParam) {
        match self {
            FilterSlot::First => (VoiceParam::Filter1Frequency, VoiceParam::Filter1Q),
            FilterSlot::Second => (VoiceParam::Filter2Frequency, VoiceParam::Filter2Q),
        }
    }
}

/// Borrowed collaborators of a filter stage.
#[derive(Clone, Copy)]
pub struct FilterCtx<'a> {
    pub input: &'a [Sample],
    pub filter_type: FilterType,
    pub frequency: Option<&'a FloatParam>,
    pub q: Option<&'a FloatParam>,
}

#[derive(Debug, Clone)]
pub struct Filter {
    producer: Producer<()>,
    filter: SVFilter,
    coefficients: Option<(Sample, Sample, Coefficients)>,
    pub frequency: FloatParam,
    pub q: FloatParam,
}

impl Filter {
    pub fn new(role: Role, slot: FilterSlot, block_size: usize, sample_rate: Frequency) -> Self {
        let (frequency, q) = slot.params();
        let param = |p| FloatParam::from_descriptor(ParamId::voice(role, p).descriptor(), block_size, sample_rate);

        Self {
            producer: Producer::new(1, block_size, sample_rate, 0),
            filter: SVFilter::new(),
            coefficients: None,
            frequency: param(frequency),
            q: param(q),
        }
    }

    pub fn reset(&mut self) {
        self.filter.reset();
    }

    /// Coefficients for a cutoff and Q pair, recomputed only when either
    /// moves.
    fn coefficients(&mut self, frequency: Sample, q: Sample) -> Coefficients {
        match self.coefficients {
            Some((f, r, coefficients)) if f == frequency && r == q => coefficients,
            _ => {
                let coefficients = Coefficients::new(
                    frequency as Number,
                    q as Number,
                    self.producer.sample_rate(),
                );
                self.coefficients = Some((frequency, q, coefficients));
                coefficients
            }
        }
    }
}

impl SignalProducer for Filter {
    type Event = ();
    type Context<'c> = FilterCtx<'c>;

    fn producer(&self) -> &Producer<()> {
        &self.producer
    }

    fn producer_mut(&mut self) -> &mut Producer<()> {
        &mut self.producer
    }

    fn initialize_rendering(&mut self, ctx: FilterCtx<'_>, round: Round, sample_count: usize) -> Prerender {
        let frequency = self.frequency.produce(ParamCtx { leader: ctx.frequency, lfos: &[] }, round, sample_count);
        let is_open = frequency[0][..sample_count].iter().all(|&f| f >= OPEN_CUTOFF);
        self.q.produce(ParamCtx { leader: ctx.q, lfos: &[] }, round, sample_count);

        if ctx.filter_type == FilterType::LowPass && is_open {
            self.producer.buffers_mut()[0][..sample_count].copy_from_slice(&ctx.input[..sample_count]);
            self.filter.reset();
            return Prerender::Done;
        }

        Prerender::Render
    }

    fn render(&mut self, ctx: FilterCtx<'_>, _round: Round, first: usize, last: usize, buffers: &mut [Vec<Sample>]) {
        for i in first..last {
            let frequency = self.frequency.producer().buffer(0)[i];
            let q = self.q.producer().buffer(0)[i];
            let coefficients = self.coefficients(frequency, q);

            buffers[0][i] = self
                .filter
                .next_sample(ctx.input[i], coefficients)
                .select(ctx.filter_type);
        }
    }

    fn set_sample_rate(&mut self, sample_rate: Frequency) {
        self.frequency.set_sample_rate(sample_rate);
        self.q.set_sample_rate(sample_rate);
        self.producer.set_sample_rate(sample_rate);
        self.coefficients = None;
    }

    fn set_block_size(&mut self, block_size: usize) {
        self.frequency.set_block_size(block_size);
        self.q.set_block_size(block_size);
        self.producer.set_block_size(block_size);
    }
}
