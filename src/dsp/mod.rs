//! Low-level DSP primitives used by the voices and the engine.
//!
//! These components are allocation-free once constructed and realtime-safe,
//! so they can live directly inside voice structs. They stay focused on the
//! signal-processing math; voice allocation and modulation routing happen in
//! `synth`.

/// Circular-buffer echo with feedback and wet/dry mix.
pub mod delay;
/// Soft clipping and 16-bit quantization.
pub mod distortion;
/// Attack/decay/sustain/release envelope generator.
pub mod envelope;
/// Biquad resonant filter.
pub mod filter;
/// Low frequency modulation oscillator.
pub mod lfo;
/// Wavetables and the phase-accumulator oscillator.
pub mod oscillator;

pub use envelope::EnvelopeState;
