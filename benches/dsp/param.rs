//! Benchmarks for parameter rendering: constant values, ramps and following
//! a leader.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_poly::{
    graph::producer::SignalProducer,
    param::float::{Evaluation, FloatParam, ParamCtx},
};

use crate::BLOCK_SIZES;

pub fn bench_param(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/param");

    for &size in BLOCK_SIZES {
        // Constant - a fill per block
        let mut param = FloatParam::new(0.0, 1.0, 0.5, Evaluation::Sample, size, 48_000.0);
        let mut round = 0;
        group.bench_with_input(BenchmarkId::new("constant", size), &size, |b, _| {
            b.iter(|| {
                round += 1;
                black_box(param.produce(ParamCtx::default(), round, size));
            })
        });

        // Ramp - restarted every block so each iteration interpolates
        let mut param = FloatParam::new(0.0, 1.0, 0.0, Evaluation::Sample, size, 48_000.0);
        let mut round = 0;
        let mut target = 1.0;
        group.bench_with_input(BenchmarkId::new("ramp", size), &size, |b, _| {
            b.iter(|| {
                round += 1;
                target = 1.0 - target;
                param.cancel_events_at(0.0);
                param.schedule_linear_ramp(1.0, target);
                black_box(param.produce(ParamCtx::default(), round, size));
            })
        });

        // Follower - copies its leader's rendered block
        let mut leader = FloatParam::new(0.0, 1.0, 0.5, Evaluation::Sample, size, 48_000.0);
        let mut follower = FloatParam::new(0.0, 1.0, 0.5, Evaluation::Sample, size, 48_000.0);
        let mut round = 0;
        group.bench_with_input(BenchmarkId::new("follower", size), &size, |b, _| {
            b.iter(|| {
                round += 1;
                leader.produce(ParamCtx::default(), round, size);
                black_box(follower.produce(ParamCtx::follow(&leader), round, size));
            })
        });
    }

    group.finish();
}
