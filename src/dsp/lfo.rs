//! Low Frequency Oscillator (LFO) used as the engine's modulation source.

use std::f64::consts::TAU;

use rand::{rngs::StdRng, Rng, SeedableRng};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Low Frequency Oscillators
=========================

An LFO is an oscillator running at sub-audio rates (0.1 - 20 Hz here). It
is never heard directly; its output moves a parameter of something else.

Vocabulary
----------

  phase       Position in the cycle, 0.0 .. 1.0 (not radians: the shapes
              below are simpler to write on a unit phase).

  rate        Cycles per second.

  amount      Output scale, 0.0 .. 1.0. The LFO returns waveform · amount,
              so amount = 0 disables the modulation without touching the
              routing.

  target      Where the caller applies the value. The LFO itself does not
              know; routing lives in the engine.


Shapes (bipolar, -1.0 .. +1.0)
------------------------------

  sine        sin(2π · phase)
  triangle    2 · |2 · phase - 1| - 1
  saw         2 · phase - 1
  square      +1 for phase < 0.5, else -1
  random      sample & hold: a uniform value in [-1, 1], redrawn only
              when the phase wraps


Typical Rates
-------------

    0.1 - 0.5 Hz    Slow filter sweeps
    0.5 - 2 Hz      Classic tremolo
    2 - 7 Hz        Vibrato sweet spot
    7 - 20 Hz       Fast tremolo, "helicopter" effect
*/

pub const MIN_RATE_HZ: f32 = 0.1;
pub const MAX_RATE_HZ: f32 = 20.0;

/// Seed for the sample & hold shape, so renders are repeatable.
const RANDOM_SEED: u64 = 0x1f0_5eed;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfoWaveform {
    #[default]
    Sine,
    Triangle,
    Saw,
    Square,
    Random,
}

/// Parameter the LFO output is routed to.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModTarget {
    FilterCutoff,
    FilterResonance,
    OscVolume,
    Pitch,
    #[default]
    None,
}

pub struct ModulationOscillator {
    sample_rate: f32,
    waveform: LfoWaveform,
    target: ModTarget,
    rate: f32,
    amount: f32,
    phase: f64,
    held: f32,
    rng: StdRng,
}

impl ModulationOscillator {
    pub fn new(sample_rate: f32) -> Self {
        let mut rng = StdRng::seed_from_u64(RANDOM_SEED);
        let held = rng.random_range(-1.0..=1.0);

        Self {
            sample_rate,
            waveform: LfoWaveform::Sine,
            target: ModTarget::None,
            rate: 1.0,
            amount: 0.5,
            phase: 0.0,
            held,
            rng,
        }
    }

    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    pub fn set_target(&mut self, target: ModTarget) {
        self.target = target;
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate.clamp(MIN_RATE_HZ, MAX_RATE_HZ);
    }

    pub fn set_amount(&mut self, amount: f32) {
        self.amount = amount.clamp(0.0, 1.0);
    }

    /// Restart the cycle from phase 0.
    pub fn reset_phase(&mut self) {
        self.phase = 0.0;
    }

    /// Value of the current waveform at the current phase, without `amount`.
    fn shape(&self) -> f32 {
        let phase = self.phase as f32;
        match self.waveform {
            LfoWaveform::Sine => (TAU * self.phase).sin() as f32,
            LfoWaveform::Triangle => 2.0 * (2.0 * phase - 1.0).abs() - 1.0,
            LfoWaveform::Saw => 2.0 * phase - 1.0,
            LfoWaveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoWaveform::Random => self.held,
        }
    }

    /// Evaluate the waveform, then advance the phase by `samples_advanced`
    /// samples. Returns `waveform · amount`.
    pub fn next_sample(&mut self, samples_advanced: u32) -> f32 {
        let value = self.shape() * self.amount;

        self.phase += self.rate as f64 * samples_advanced as f64 / self.sample_rate as f64;
        if self.phase >= 1.0 {
            self.phase %= 1.0;
            if self.waveform == LfoWaveform::Random {
                self.held = self.rng.random_range(-1.0..=1.0);
            }
        }

        value
    }

    pub fn waveform(&self) -> LfoWaveform {
        self.waveform
    }

    pub fn target(&self) -> ModTarget {
        self.target
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn lfo(waveform: LfoWaveform, rate: f32) -> ModulationOscillator {
        let mut lfo = ModulationOscillator::new(SAMPLE_RATE);
        lfo.set_waveform(waveform);
        lfo.set_rate(rate);
        lfo.set_amount(1.0);
        lfo
    }

    #[test]
    fn test_shapes_at_known_phases() {
        let mut tri = lfo(LfoWaveform::Triangle, 1.0);
        assert!((tri.next_sample(0) - 1.0).abs() < 1e-6);
        tri.next_sample(500);
        assert!((tri.next_sample(0) + 1.0).abs() < 1e-6);

        let mut saw = lfo(LfoWaveform::Saw, 1.0);
        saw.next_sample(250);
        assert!((saw.next_sample(0) + 0.5).abs() < 1e-6);

        let mut square = lfo(LfoWaveform::Square, 1.0);
        assert_eq!(square.next_sample(600), 1.0);
        assert_eq!(square.next_sample(0), -1.0);

        let mut sine = lfo(LfoWaveform::Sine, 1.0);
        sine.next_sample(250);
        assert!((sine.next_sample(0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_amount_scales_output() {
        let mut square = lfo(LfoWaveform::Square, 1.0);
        square.set_amount(0.25);
        assert!((square.next_sample(1) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_phase_wraps() {
        let mut sine = lfo(LfoWaveform::Sine, 5.0);
        for _ in 0..10_000 {
            sine.next_sample(1);
        }
        assert!((0.0..1.0).contains(&sine.phase()));
    }

    #[test]
    fn test_random_holds_until_wrap() {
        let mut random = lfo(LfoWaveform::Random, 1.0);

        let first = random.next_sample(0);
        assert_eq!(random.next_sample(400), first);
        assert_eq!(random.next_sample(400), first);

        // Crosses the wrap: the draw happens after this value is returned.
        assert_eq!(random.next_sample(400), first);
        let second = random.next_sample(0);
        assert_ne!(first, second);
        assert!((-1.0..=1.0).contains(&second));
    }

    #[test]
    fn test_rate_and_amount_are_clamped() {
        let mut lfo = ModulationOscillator::new(SAMPLE_RATE);
        lfo.set_rate(0.0);
        assert_eq!(lfo.rate(), MIN_RATE_HZ);
        lfo.set_rate(1_000.0);
        assert_eq!(lfo.rate(), MAX_RATE_HZ);
        lfo.set_amount(-1.0);
        assert_eq!(lfo.amount(), 0.0);
    }
}
