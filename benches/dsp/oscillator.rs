//! Benchmarks for the wavetable oscillator node.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_poly::{
    dsp::wavetable::{Waveform, Waveforms},
    graph::{
        oscillator::{Modulation, Oscillator, OscillatorCtx},
        producer::SignalProducer,
    },
    param::ids::Role,
};

use crate::BLOCK_SIZES;

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");
    let waveforms = Waveforms::new();

    for &size in BLOCK_SIZES {
        // Plain sawtooth, constant frequency
        let mut osc = Oscillator::new(Role::Modulator, size, 48_000.0);
        osc.frequency.set_value(220.0);
        osc.start(0.0);
        let ctx = OscillatorCtx::new(waveforms.select(Waveform::Sawtooth, waveforms.sine()));
        let mut round = 0;
        group.bench_with_input(BenchmarkId::new("sawtooth", size), &size, |b, _| {
            b.iter(|| {
                round += 1;
                black_box(osc.produce(ctx, round, size));
            })
        });

        // Sine carrier with per-sample FM and PM from a modulator signal
        let signal: Vec<f32> = (0..size).map(|i| (i as f32 * 0.05).sin()).collect();
        let levels = vec![0.5f32; size];
        let mut osc = Oscillator::new(Role::Carrier, size, 48_000.0);
        osc.frequency.set_value(220.0);
        osc.start(0.0);
        let ctx = OscillatorCtx {
            modulation: Some(Modulation {
                signal: &signal,
                frequency_level: &levels,
                phase_level: &levels,
            }),
            ..OscillatorCtx::new(waveforms.select(Waveform::Sine, waveforms.sine()))
        };
        let mut round = 0;
        group.bench_with_input(BenchmarkId::new("fm_pm", size), &size, |b, _| {
            b.iter(|| {
                round += 1;
                black_box(osc.produce(ctx, round, size));
            })
        });
    }

    group.finish();
}
