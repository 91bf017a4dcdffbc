//! Output Saturation
//!
//! The final stage of the engine: the mixed signal is pushed through a smooth
//! nonlinearity and then quantized to signed 16-bit PCM.
//!
//! # Why Not Just Clamp?
//!
//! Hard clipping flattens every peak above the threshold into a corner. The
//! corners add a burst of odd harmonics that sounds like a crackle. A
//! hyperbolic tangent approaches ±1 smoothly instead:
//!
//! ```text
//!   tanh(x)
//!     1.0 ┤          ___------
//!         │       _-‾
//!     0.0 ┤     ╱
//!         │ __-‾
//!    -1.0 ┤‾
//!         └──────────────────→ x
//! ```
//!
//! Small signals pass almost untouched (tanh(x) ≈ x near zero), loud chords
//! are compressed gently, and the result can never leave (-1, 1).

/// Soft clip with tanh. Output is always inside (-1, 1).
#[inline]
pub fn soft_clip(sample: f32) -> f32 {
    sample.tanh()
}

/// Scale a sample in [-1, 1] to signed 16-bit PCM.
///
/// Out-of-range and NaN input saturates rather than wrapping.
#[inline]
pub fn to_i16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample * i16::MAX as f32)
        .round()
        .clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Soft clip and quantize a whole block.
pub fn soft_clip_to_i16(input: &[f32], out: &mut [i16]) {
    for (o, &x) in out.iter_mut().zip(input) {
        *o = to_i16(soft_clip(x));
    }
}
