//! Benchmarks for wavetable oscillator generation.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion};
use polytone::dsp::oscillator::{Oscillator, Waveform, WavetableBank};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");
    let bank = Arc::new(WavetableBank::new());

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Every waveform is one table lookup plus a lerp
        for (name, waveform) in [
            ("sine", Waveform::Sine),
            ("saw", Waveform::Saw),
            ("noise", Waveform::Noise),
        ] {
            let mut osc = Oscillator::new(bank.clone());
            osc.reset(1);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    for sample in buffer.iter_mut() {
                        *sample = osc.next_sample(waveform, black_box(440.0), 1, 0.0, SAMPLE_RATE);
                    }
                })
            });
        }

        // Supersaw: eight detuned copies per sample
        let mut osc = Oscillator::new(bank.clone());
        osc.reset(8);
        group.bench_with_input(BenchmarkId::new("saw_unison8", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample =
                        osc.next_sample(Waveform::Saw, black_box(440.0), 8, 25.0, SAMPLE_RATE);
                }
            })
        });
    }

    group.finish();
}
