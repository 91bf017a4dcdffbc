//! polytone - plays a short chord progression through the default output
//!
//! Run with: cargo run -- [device name]
//! Set RUST_LOG=debug to watch the streaming thread.

use std::thread;
use std::time::Duration;

use polytone::{
    dsp::{filter::FilterMode, lfo::LfoWaveform, lfo::ModTarget, oscillator::Waveform},
    output::CpalDeviceFactory,
    synth::{
        live::LiveSynth,
        params::{AdsrParams, DelayParams, FilterParams, LfoParams, OscillatorParams},
    },
    AudioOutputPipeline, PipelineConfig, SynthEngine, SAMPLE_RATE,
};

const PROGRESSION: [[&str; 3]; 4] = [
    ["C4", "E4", "G4"],
    ["A3", "C4", "E4"],
    ["F3", "A3", "C4"],
    ["G3", "B3", "D4"],
];

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let factory = match std::env::args().nth(1) {
        Some(name) => CpalDeviceFactory::named(name),
        None => CpalDeviceFactory::new(),
    };

    let (source, mut synth) = LiveSynth::new(SynthEngine::new(SAMPLE_RATE as f32));
    let mut pipeline = AudioOutputPipeline::start(factory, source, PipelineConfig::default())?;
    synth.attach(pipeline.waker());

    // Detuned saw pad an octave below a quiet square.
    synth.set_oscillator(
        0,
        OscillatorParams {
            waveform: Waveform::Saw,
            unison: 4,
            detune: 18.0,
            volume: 0.8,
            ..Default::default()
        },
    );
    synth.set_oscillator(
        1,
        OscillatorParams {
            waveform: Waveform::Square,
            semitones: 12.0,
            volume: 0.3,
            ..Default::default()
        },
    );
    synth.set_adsr(AdsrParams::new(0.08, 0.3, 0.6, 0.8));
    synth.set_filter(FilterParams {
        enabled: true,
        mode: FilterMode::LowPass,
        cutoff: 1_800.0,
        resonance: 0.3,
    });
    synth.set_lfo(LfoParams {
        enabled: true,
        waveform: LfoWaveform::Sine,
        target: ModTarget::FilterCutoff,
        rate: 0.5,
        amount: 0.25,
    });
    synth.set_delay(DelayParams {
        enabled: true,
        time: 0.375,
        feedback: 0.35,
        mix: 0.25,
    });

    println!("=== polytone ===");
    println!("Sample rate: {SAMPLE_RATE} Hz");
    println!();

    for chord in PROGRESSION.iter().cycle().take(8) {
        println!("  {}", chord.join(" "));
        for note in chord {
            synth.note_on_named(note);
        }
        thread::sleep(Duration::from_millis(900));
        for note in chord {
            synth.note_off_named(note);
        }
        thread::sleep(Duration::from_millis(100));
    }

    // Let the release and echoes ring out.
    thread::sleep(Duration::from_secs(3));
    println!("Pipeline state at exit: {:?}", pipeline.state());
    pipeline.shutdown();
    Ok(())
}
