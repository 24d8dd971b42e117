//! Benchmarks for band-limited wavetable lookup.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_poly::dsp::wavetable::{Waveform, Waveforms, Wavetable, WavetableState};

use crate::BLOCK_SIZES;

pub fn bench_wavetable(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/wavetable");
    let waveforms = Waveforms::new();
    let custom = Wavetable::new(&[1.0, 0.5, 0.0, 0.25, 0.0, 0.0, 0.1, 0.0, 0.0, 0.05]);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for (name, waveform) in [
            ("sine", Waveform::Sine),
            ("sawtooth", Waveform::Sawtooth),
            ("square", Waveform::Square),
            ("custom", Waveform::Custom),
        ] {
            let table = waveforms.select(waveform, &custom);
            let mut state = WavetableState::new(48_000.0);

            // 110 Hz keeps most partials below Nyquist, the expensive case
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    for sample in buffer.iter_mut() {
                        *sample = table.lookup(&mut state, black_box(110.0), 0.0) as f32;
                    }
                })
            });
        }
    }

    let mut custom = custom;
    let coefficients = [0.3, 0.2, 0.1, 0.4, 0.0, 0.7, 0.0, 0.1, 0.0, 0.2];
    group.bench_function("update_coefficients", |b| {
        b.iter(|| custom.update_coefficients(black_box(&coefficients)))
    });

    group.finish();
}
