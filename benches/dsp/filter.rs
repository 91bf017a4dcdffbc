//! Benchmarks for the resonant biquad filter.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polytone::dsp::filter::{FilterMode, ResonantFilter};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        // Generate a test signal (sawtooth-like ramp)
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();

        for (name, mode) in [
            ("lowpass", FilterMode::LowPass),
            ("highpass", FilterMode::HighPass),
            ("bandpass", FilterMode::BandPass),
        ] {
            let mut filter = ResonantFilter::new(SAMPLE_RATE);
            filter.set_params(mode, 1_000.0, 0.5);
            let mut buffer = input.clone();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    buffer.copy_from_slice(&input);
                    filter.render(black_box(&mut buffer));
                })
            });
        }

        // Cutoff swept every sample, as under LFO modulation
        let mut filter = ResonantFilter::new(SAMPLE_RATE);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("lowpass_swept", size), &size, |b, _| {
            b.iter(|| {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    filter.set_params(FilterMode::LowPass, 500.0 + i as f32 * 10.0, 0.5);
                    *sample = filter.process(black_box(input[i]));
                }
            })
        });
    }

    group.finish();
}
