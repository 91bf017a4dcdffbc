pub mod dsp; // Per-sample DSP primitives
pub mod error;
pub mod output; // Device pipeline and streaming thread
pub mod synth; // Voices, engine, control surface

pub use error::{DeviceError, PipelineError};
pub use output::{AudioOutputPipeline, PipelineConfig, PipelineState, StreamWaker};
pub use synth::{
    engine::SynthEngine,
    live::{LiveSynth, SynthHandle},
    params::SynthParams,
};

/// The one operating rate of the engine and the output stream.
pub const SAMPLE_RATE: u32 = 44_100;
/// Size of the fixed voice pool.
pub const MAX_VOICES: usize = 16;
/// Oscillator layers per voice.
pub const OSC_LAYERS: usize = 3;
/// Upper bound on detuned unison copies per layer.
pub const MAX_UNISON: usize = 8;
pub const MAX_BLOCK_SIZE: usize = 2048;
/// Shortest envelope stage, in samples. Zero-length stages click.
pub(crate) const MIN_STAGE_SAMPLES: f32 = 10.0;
