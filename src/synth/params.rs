//! Parameter records for the engine.
//!
//! Every record is plain `Copy` data so it can cross the control ring to the
//! streaming thread. Out-of-range values are never rejected: `clamped()`
//! pulls each field back into its domain.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::{
    delay,
    filter::{FilterMode, MAX_CUTOFF_HZ, MIN_CUTOFF_HZ},
    lfo::{self, LfoWaveform, ModTarget},
    oscillator::Waveform,
};
use crate::{MAX_UNISON, OSC_LAYERS};

/// Longest accepted envelope stage, in seconds.
pub const MAX_STAGE_SECONDS: f32 = 10.0;
/// Semitone offset range of an oscillator layer.
pub const MAX_SEMITONE_OFFSET: f32 = 24.0;
/// Widest unison spread, in cents.
pub const MAX_DETUNE_CENTS: f32 = 100.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrParams {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl AdsrParams {
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
        .clamped()
    }

    pub fn clamped(self) -> Self {
        Self {
            attack: clamp_finite(self.attack, 0.0, MAX_STAGE_SECONDS),
            decay: clamp_finite(self.decay, 0.0, MAX_STAGE_SECONDS),
            sustain: clamp_finite(self.sustain, 0.0, 1.0),
            release: clamp_finite(self.release, 0.0, MAX_STAGE_SECONDS),
        }
    }
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.3,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub enabled: bool,
    pub mode: FilterMode,
    pub cutoff: f32,
    pub resonance: f32,
}

impl FilterParams {
    pub fn clamped(self) -> Self {
        Self {
            cutoff: clamp_finite(self.cutoff, MIN_CUTOFF_HZ, MAX_CUTOFF_HZ),
            resonance: clamp_finite(self.resonance, 0.0, 1.0),
            ..self
        }
    }

    /// Mode the filter actually runs in.
    pub fn effective_mode(&self) -> FilterMode {
        if self.enabled {
            self.mode
        } else {
            FilterMode::Off
        }
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: FilterMode::LowPass,
            cutoff: 2_000.0,
            resonance: 0.0,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LfoParams {
    pub enabled: bool,
    pub waveform: LfoWaveform,
    pub target: ModTarget,
    pub rate: f32,
    pub amount: f32,
}

impl LfoParams {
    pub fn clamped(self) -> Self {
        Self {
            rate: clamp_finite(self.rate, lfo::MIN_RATE_HZ, lfo::MAX_RATE_HZ),
            amount: clamp_finite(self.amount, 0.0, 1.0),
            ..self
        }
    }

    /// True when the LFO output is routed somewhere.
    pub fn is_routed(&self) -> bool {
        self.enabled && self.target != ModTarget::None
    }
}

impl Default for LfoParams {
    fn default() -> Self {
        Self {
            enabled: false,
            waveform: LfoWaveform::Sine,
            target: ModTarget::None,
            rate: 5.0,
            amount: 0.5,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayParams {
    pub enabled: bool,
    pub time: f32,
    pub feedback: f32,
    pub mix: f32,
}

impl DelayParams {
    pub fn clamped(self) -> Self {
        Self {
            time: clamp_finite(self.time, delay::MIN_TIME, delay::MAX_TIME),
            feedback: clamp_finite(self.feedback, 0.0, delay::MAX_FEEDBACK),
            mix: clamp_finite(self.mix, 0.0, 1.0),
            ..self
        }
    }
}

impl Default for DelayParams {
    fn default() -> Self {
        Self {
            enabled: false,
            time: 0.3,
            feedback: 0.4,
            mix: 0.3,
        }
    }
}

/// Settings of one oscillator layer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorParams {
    pub waveform: Waveform,
    /// Offset from the note pitch, in semitones.
    pub semitones: f32,
    pub volume: f32,
    /// Number of detuned copies (1 = no unison).
    pub unison: usize,
    /// Spread of the outermost unison copies, in cents.
    pub detune: f32,
}

impl OscillatorParams {
    pub fn clamped(self) -> Self {
        Self {
            semitones: clamp_finite(self.semitones, -MAX_SEMITONE_OFFSET, MAX_SEMITONE_OFFSET),
            volume: clamp_finite(self.volume, 0.0, 1.0),
            unison: self.unison.clamp(1, MAX_UNISON),
            detune: clamp_finite(self.detune, 0.0, MAX_DETUNE_CENTS),
            ..self
        }
    }

    pub fn is_audible(&self) -> bool {
        self.volume > 0.0
    }

    /// A layer with zero volume.
    pub fn silent() -> Self {
        Self {
            volume: 0.0,
            ..Self::default()
        }
    }
}

impl Default for OscillatorParams {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sine,
            semitones: 0.0,
            volume: 1.0,
            unison: 1,
            detune: 0.0,
        }
    }
}

/// The full parameter set of the engine.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthParams {
    pub adsr: AdsrParams,
    pub filter: FilterParams,
    pub lfo: LfoParams,
    pub delay: DelayParams,
    pub oscillators: [OscillatorParams; OSC_LAYERS],
}

impl SynthParams {
    pub fn clamped(self) -> Self {
        Self {
            adsr: self.adsr.clamped(),
            filter: self.filter.clamped(),
            lfo: self.lfo.clamped(),
            delay: self.delay.clamped(),
            oscillators: self.oscillators.map(OscillatorParams::clamped),
        }
    }
}

impl Default for SynthParams {
    fn default() -> Self {
        let mut oscillators = [OscillatorParams::silent(); OSC_LAYERS];
        oscillators[0] = OscillatorParams::default();

        Self {
            adsr: AdsrParams::default(),
            filter: FilterParams::default(),
            lfo: LfoParams::default(),
            delay: DelayParams::default(),
            oscillators,
        }
    }
}

/// Clamp into [min, max]; NaN falls back to `min`.
fn clamp_finite(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}
