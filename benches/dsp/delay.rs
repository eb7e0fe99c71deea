//! Benchmarks for delay line operations.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_shift::dsp::delay::DelayLine;

use crate::BLOCK_SIZES;

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();

        // Swept delay time, the way the shifter drives it
        let mut delay = DelayLine::new(5.0, 48_000.0);
        group.bench_with_input(BenchmarkId::new("swept", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for (i, &sample) in input.iter().enumerate() {
                    let delay_samples = 4800.0 * (1.0 - i as f32 / size as f32);
                    sum += delay.next_sample(black_box(sample), black_box(delay_samples));
                }
                black_box(sum)
            })
        });

        // Interpolated read only
        let mut delay = DelayLine::new(5.0, 48_000.0);
        for &sample in &input {
            delay.write(sample);
        }
        group.bench_with_input(
            BenchmarkId::new("read_interpolated", size),
            &size,
            |b, _| {
                b.iter(|| {
                    let mut sum = 0.0f32;
                    for i in 0..size {
                        let delay_time = 480.0 + (i as f32 * 0.1).sin() * 48.0;
                        sum += delay.read_interpolated(black_box(delay_time));
                    }
                    black_box(sum)
                })
            },
        );
    }

    group.finish();
}
