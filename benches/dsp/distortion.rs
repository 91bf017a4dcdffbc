//! Benchmarks for the output stage: tanh soft clip and i16 quantization.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polytone::dsp::distortion;

use crate::BLOCK_SIZES;

pub fn bench_distortion(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/distortion");

    for &size in BLOCK_SIZES {
        // Generate a test signal that overshoots full scale
        let input: Vec<f32> = (0..size).map(|i| 1.5 * (i as f32 * 0.1).sin()).collect();

        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("soft_clip", size), &size, |b, _| {
            b.iter(|| {
                for (out, &x) in buffer.iter_mut().zip(&input) {
                    *out = distortion::soft_clip(black_box(x));
                }
            })
        });

        let mut pcm = vec![0i16; size];
        group.bench_with_input(BenchmarkId::new("soft_clip_to_i16", size), &size, |b, _| {
            b.iter(|| {
                distortion::soft_clip_to_i16(black_box(&input), black_box(&mut pcm));
            })
        });
    }

    group.finish();
}
