//! Benchmarks for the feedback delay.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polytone::dsp::delay::FeedbackDelay;

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    for &size in BLOCK_SIZES {
        // Generate a test signal
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();

        for seconds in [0.01f32, 0.3, 2.0] {
            let mut delay = FeedbackDelay::new(SAMPLE_RATE);
            delay.set_time(seconds);
            delay.set_feedback(0.5);
            delay.set_mix(0.3);
            let mut buffer = input.clone();
            group.bench_with_input(
                BenchmarkId::new(format!("render_{}ms", (seconds * 1000.0) as u32), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        buffer.copy_from_slice(&input);
                        delay.render(black_box(&mut buffer));
                    })
                },
            );
        }
    }

    group.finish();
}
