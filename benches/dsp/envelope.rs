//! Benchmarks for grain buffer generation.
//!
//! Runs once per shifter, off the audio thread, but long grains at high
//! sample rates make it the biggest allocation the shifter does.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_shift::dsp::envelope::{make_delay_ramp_buffer, make_fade_buffer};

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &(active, fade) in &[(0.1, 0.05), (0.5, 0.1)] {
        let label = format!("{}ms", (active * 1000.0) as u32);

        group.bench_with_input(BenchmarkId::new("fade", &label), &active, |b, _| {
            b.iter(|| make_fade_buffer(48_000.0, black_box(active), black_box(fade)))
        });

        group.bench_with_input(BenchmarkId::new("ramp_up", &label), &active, |b, _| {
            b.iter(|| make_delay_ramp_buffer(48_000.0, black_box(active), black_box(fade), true))
        });
    }

    group.finish();
}
