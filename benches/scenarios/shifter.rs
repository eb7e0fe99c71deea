//! Full shifter graph: six grain players, two modulated delay lines.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_shift::{OfflineEngine, PitchShifter};

use crate::BLOCK_SIZES;

pub fn bench_shifter(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/shifter");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.05).sin()).collect();
        let mut output = vec![0.0f32; size];

        for (name, mult) in [("up", 1.5), ("down", -0.5), ("bypass", 0.0)] {
            let mut shifter = PitchShifter::new(OfflineEngine::new(48_000.0))
                .expect("default shifter");
            shifter
                .set_pitch_offset(mult, false)
                .expect("queue has room");

            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    shifter
                        .engine_mut()
                        .process(black_box(&input), &mut output)
                        .expect("realized graph");
                    black_box(&output);
                })
            });
        }
    }

    group.finish();
}
