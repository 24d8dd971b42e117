use crate::{
    dsp::distortion::{foldback, soft_clip},
    graph::producer::{Prerender, Producer, SignalProducer},
    param::{
        float::{FloatParam, ParamCtx},
        ids::{ParamId, Role, VoiceParam},
    },
    Frequency, Round, Sample,
};

/*
Voice Waveshapers
=================

Two waveshaping stages sit between the voice filters:

  Wavefolder (every voice)
    drive = 1 + 9 · folding
    out   = foldback(in · drive)
    At folding 0 a full-scale signal passes unchanged; turning it up folds
    the peaks back down and adds bright, metallic partials.

  Distortion (carriers only)
    out = in + level · (soft_clip(in) - in)
    A blend between the clean signal and a hard-driven soft clipper.

A stage whose level is zero for the whole block copies its input through.
*/

const FOLD_THRESHOLD: Sample = 1.0;
const DISTORTION_DRIVE: Sample = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaperKind {
    Wavefolder,
    Distortion,
}

/// Borrowed collaborators of a shaper stage.
#[derive(Clone, Copy)]
pub struct ShaperCtx<'a> {
    pub input: &'a [Sample],
    pub level: Option<&'a FloatParam>,
}

#[derive(Debug, Clone)]
pub struct Shaper {
    producer: Producer<()>,
    kind: ShaperKind,
    pub level: FloatParam,
}

impl Shaper {
    pub fn wavefolder(role: Role, block_size: usize, sample_rate: Frequency) -> Self {
        let descriptor = ParamId::voice(role, VoiceParam::Folding).descriptor();
        Self::new(ShaperKind::Wavefolder, FloatParam::from_descriptor(descriptor, block_size, sample_rate))
    }

    pub fn distortion(block_size: usize, sample_rate: Frequency) -> Self {
        let descriptor = ParamId::CARRIER_DISTORTION.descriptor();
        Self::new(ShaperKind::Distortion, FloatParam::from_descriptor(descriptor, block_size, sample_rate))
    }

    fn new(kind: ShaperKind, level: FloatParam) -> Self {
        Self {
            producer: Producer::new(1, level.producer().block_size(), level.producer().sample_rate(), 0),
            kind,
            level,
        }
    }

    pub fn kind(&self) -> ShaperKind {
        self.kind
    }

    #[inline]
    fn shape(&self, sample: Sample, level: Sample) -> Sample {
        match self.kind {
            ShaperKind::Wavefolder => foldback(sample, 1.0 + 9.0 * level, FOLD_THRESHOLD),
            ShaperKind::Distortion => {
                let clipped = soft_clip(sample, DISTORTION_DRIVE) / soft_clip(1.0, DISTORTION_DRIVE);
                sample + level * (clipped - sample)
            }
        }
    }
}

impl SignalProducer for Shaper {
    type Event = ();
    type Context<'c> = ShaperCtx<'c>;

    fn producer(&self) -> &Producer<()> {
        &self.producer
    }

    fn producer_mut(&mut self) -> &mut Producer<()> {
        &mut self.producer
    }

    fn initialize_rendering(&mut self, ctx: ShaperCtx<'_>, round: Round, sample_count: usize) -> Prerender {
        let level = self.level.produce(ParamCtx { leader: ctx.level, lfos: &[] }, round, sample_count);

        if level[0][..sample_count].iter().all(|&l| l <= 0.0) {
            self.producer.buffers_mut()[0][..sample_count].copy_from_slice(&ctx.input[..sample_count]);
            return Prerender::Done;
        }

        Prerender::Render
    }

    fn render(&mut self, ctx: ShaperCtx<'_>, _round: Round, first: usize, last: usize, buffers: &mut [Vec<Sample>]) {
        let level = self.level.producer().buffer(0);

        for i in first..last {
            buffers[0][i] = self.shape(ctx.input[i], level[i]);
        }
    }

    fn set_sample_rate(&mut self, sample_rate: Frequency) {
        self.level.set_sample_rate(sample_rate);
        self.producer.set_sample_rate(sample_rate);
    }

    fn set_block_size(&mut self, block_size: usize) {
        self.level.set_block_size(block_size);
        self.producer.set_block_size(block_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: usize = 64;
    const SAMPLE_RATE: Frequency = 48_000.0;

    fn ramp() -> Vec<Sample> {
        (0..BLOCK).map(|n| n as Sample / BLOCK as Sample * 2.0 - 1.0).collect()
    }

    #[test]
    fn zero_level_is_a_pass_through() {
        let input = ramp();
        let mut folder = Shaper::wavefolder(Role::Modulator, BLOCK, SAMPLE_RATE);
        let ctx = ShaperCtx {
            input: &input,
            level: None,
        };

        assert_eq!(folder.produce(ctx, 1, BLOCK)[0], input);
    }

    #[test]
    fn folding_keeps_the_signal_in_range() {
        let input = ramp();
        let mut folder = Shaper::wavefolder(Role::Carrier, BLOCK, SAMPLE_RATE);
        folder.level.set_value(1.0);
        let ctx = ShaperCtx {
            input: &input,
            level: None,
        };

        let out = folder.produce(ctx, 1, BLOCK)[0].clone();

        assert!(out.iter().all(|s| s.abs() <= 1.0 + 1e-6));
        assert_ne!(out, input);
    }

    #[test]
    fn full_distortion_saturates() {
        let input = vec![0.5; BLOCK];
        let mut distortion = Shaper::distortion(BLOCK, SAMPLE_RATE);
        distortion.level.set_value(1.0);
        let ctx = ShaperCtx {
            input: &input,
            level: None,
        };

        let out = distortion.produce(ctx, 1, BLOCK)[0].clone();

        assert!(out.iter().all(|&s| s > 0.9 && s <= 1.0), "got {}", out[0]);
        assert_eq!(distortion.kind(), ShaperKind::Distortion);
    }
}
