//! Benchmarks for the complete synth.
//!
//! Every playing note costs a modulator and a carrier voice, so these show
//! how rendering scales towards the full pool.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_poly::{
    param::{
        controller::ControllerId,
        ids::{ParamId, Role, VoiceParam},
    },
    PolySynth, SynthConfig,
};

use crate::BLOCK_SIZES;

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");

    for &size in BLOCK_SIZES {
        for notes in [1u8, 8, 32, 64] {
            let config = SynthConfig::default()
                .with_sample_rate(48_000.0)
                .with_block_size(size);
            let Ok((mut synth, mut handle)) = PolySynth::new(config) else {
                continue;
            };

            // FM on, both voices filtered and the modulator's filter swept by
            // an LFO, a typical patch
            for (id, ratio) in [
                (ParamId::FM, 0.4),
                (ParamId::voice(Role::Carrier, VoiceParam::Filter1Frequency), 0.1),
                (ParamId::voice(Role::Modulator, VoiceParam::Filter1Frequency), 0.2),
            ] {
                let _ = handle.set_param_ratio(id, ratio);
            }
            let _ = handle.assign_controller(
                ParamId::voice(Role::Modulator, VoiceParam::Filter1Frequency),
                ControllerId::lfo(0),
            );
            synth.process_messages();

            for note in 0..notes {
                synth.note_on(0.0, 0, 36 + note, 100);
            }

            let mut round = 0;
            let id = format!("{}_notes", notes);
            group.bench_with_input(BenchmarkId::new(id, size), &size, |b, _| {
                b.iter(|| {
                    round += 1;
                    black_box(synth.generate_samples(round, size));
                })
            });
        }
    }

    group.finish();
}
