//! Benchmarks for full engine renders.
//!
//! The worst case is a full voice pool with every layer and unison copy
//! sounding; it has to fit in one block deadline with room to spare.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polytone::{
    dsp::{
        filter::FilterMode,
        lfo::{LfoWaveform, ModTarget},
        oscillator::Waveform,
    },
    synth::params::{DelayParams, FilterParams, LfoParams, OscillatorParams, SynthParams},
    SynthEngine, MAX_VOICES, OSC_LAYERS,
};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

fn chord(engine: &mut SynthEngine, notes: usize) {
    for i in 0..notes {
        engine.note_on(110.0 * (1.0 + i as f64 / 3.0));
    }
}

/// Every layer on, eight-voice unison, filter swept by the LFO, delay on.
fn heavy_patch() -> SynthParams {
    let mut params = SynthParams::default();
    for layer in 0..OSC_LAYERS {
        params.oscillators[layer] = OscillatorParams {
            waveform: Waveform::Saw,
            semitones: 12.0 * layer as f32,
            volume: 0.8,
            unison: 8,
            detune: 30.0,
        };
    }
    params.filter = FilterParams {
        enabled: true,
        mode: FilterMode::LowPass,
        cutoff: 1_200.0,
        resonance: 0.6,
    };
    params.lfo = LfoParams {
        enabled: true,
        waveform: LfoWaveform::Triangle,
        target: ModTarget::FilterCutoff,
        rate: 2.0,
        amount: 0.5,
    };
    params.delay = DelayParams {
        enabled: true,
        ..Default::default()
    };
    params
}

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");

    for &size in BLOCK_SIZES {
        let mut block = vec![0i16; size];

        // === SINGLE SINE ===
        // Baseline: one voice, one layer, no effects
        let mut engine = SynthEngine::new(SAMPLE_RATE);
        chord(&mut engine, 1);
        group.bench_with_input(BenchmarkId::new("single_sine", size), &size, |b, _| {
            b.iter(|| {
                engine.render_block(black_box(&mut block));
            })
        });

        // === TRIAD ===
        let mut engine = SynthEngine::new(SAMPLE_RATE);
        chord(&mut engine, 3);
        group.bench_with_input(BenchmarkId::new("triad", size), &size, |b, _| {
            b.iter(|| {
                engine.render_block(black_box(&mut block));
            })
        });

        // === FULL POOL, HEAVY PATCH ===
        let mut engine = SynthEngine::with_params(SAMPLE_RATE, heavy_patch());
        chord(&mut engine, MAX_VOICES);
        group.bench_with_input(BenchmarkId::new("full_pool_heavy", size), &size, |b, _| {
            b.iter(|| {
                engine.render_block(black_box(&mut block));
            })
        });
    }

    // Offline bounce of one second
    let engine = SynthEngine::with_params(SAMPLE_RATE, heavy_patch());
    group.bench_function("generate_sample_1s", |b| {
        b.iter(|| black_box(engine.generate_sample(SAMPLE_RATE as usize)))
    });

    group.finish();
}
