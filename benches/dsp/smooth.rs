//! Benchmarks for per-sample parameter smoothing.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_shift::dsp::smooth::SmoothedParam;

use crate::BLOCK_SIZES;

pub fn bench_smooth(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/smooth");

    for &size in BLOCK_SIZES {
        group.bench_with_input(BenchmarkId::new("ramping", size), &size, |b, &size| {
            b.iter(|| {
                let mut param = SmoothedParam::new(0.0);
                param.set_target_at(1.0, 0, 0.01, 48_000.0);
                let mut sum = 0.0f32;
                for frame in 0..size as u64 {
                    sum += param.next(frame);
                }
                black_box(sum)
            })
        });
    }

    group.finish();
}
