use std::f64::consts::TAU;
use std::sync::Arc;

use rand::{rngs::StdRng, Rng, SeedableRng};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::MAX_UNISON;

/*
Wavetable Oscillator
====================

Each waveform is computed once into a single-cycle table. Voices never
evaluate sin() or generate noise per sample: they read the table at their
current phase and linearly interpolate between the two nearest entries.

Vocabulary
----------

  phase       Position inside one cycle, in radians: 0.0 .. 2π.
              Advanced by every sample and wrapped at 2π.

  step        How far the phase moves per sample:
                  step = 2π · frequency / sample_rate

  unison      Several copies of the same oscillator, each slightly detuned,
              summed together. Makes a single note sound "wide".

  spread      Detune of the outermost unison copies, in cents.
              100 cents = 1 semitone.


Table Lookup
------------

    position = phase / 2π · TABLE_SIZE
    index    = floor(position)
    frac     = position - index

    sample   = table[index] · (1 - frac) + table[index + 1] · frac

The phase accumulator is f64. A 32-bit phase drifts audibly over long
sustained notes; 64 bits keeps the pitch exact for hours.


Unison Detune Curve
-------------------

N copies are spread evenly across [-spread, +spread]:

    N = 1:   0
    N = 2:   -s, +s
    N = 3:   -s, 0, +s
    N = 5:   -s, -s/2, 0, +s/2, +s

Summing N copies with uncorrelated phases raises the RMS level by √N, so
the sum is divided by √N. Changing the unison width then changes the
texture, not the loudness.
*/

/// Entries per single-cycle table.
pub const TABLE_SIZE: usize = 2048;

/// Fixed seed so the noise table (and every bounce using it) is reproducible.
const NOISE_SEED: u64 = 0x5eed_cafe;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Triangle,
    Saw,
    Square,
    Noise,
}

/// One precomputed cycle of a waveform.
pub struct Wavetable {
    samples: Box<[f32]>,
}

impl Wavetable {
    pub fn new(waveform: Waveform) -> Self {
        let mut rng = StdRng::seed_from_u64(NOISE_SEED);

        let samples = (0..TABLE_SIZE)
            .map(|i| {
                let t = i as f64 / TABLE_SIZE as f64;
                let value = match waveform {
                    Waveform::Sine => (TAU * t).sin(),
                    Waveform::Triangle => {
                        if t < 0.25 {
                            4.0 * t
                        } else if t < 0.75 {
                            2.0 - 4.0 * t
                        } else {
                            4.0 * t - 4.0
                        }
                    }
                    Waveform::Saw => 2.0 * t - 1.0,
                    Waveform::Square => {
                        if t < 0.5 {
                            1.0
                        } else {
                            -1.0
                        }
                    }
                    Waveform::Noise => rng.random_range(-1.0..=1.0),
                };
                value as f32
            })
            .collect();

        Self { samples }
    }

    /// Read the table at `phase` (radians), interpolating between neighbours.
    #[inline]
    pub fn render(&self, phase: f64) -> f32 {
        let position = phase.rem_euclid(TAU) / TAU * TABLE_SIZE as f64;
        let index = position as usize % TABLE_SIZE;
        let next = (index + 1) % TABLE_SIZE;
        let frac = (position - position.floor()) as f32;

        self.samples[index] * (1.0 - frac) + self.samples[next] * frac
    }
}

/// All waveform tables, built once and shared by every oscillator.
pub struct WavetableBank {
    sine: Wavetable,
    triangle: Wavetable,
    saw: Wavetable,
    square: Wavetable,
    noise: Wavetable,
}

impl WavetableBank {
    pub fn new() -> Self {
        Self {
            sine: Wavetable::new(Waveform::Sine),
            triangle: Wavetable::new(Waveform::Triangle),
            saw: Wavetable::new(Waveform::Saw),
            square: Wavetable::new(Waveform::Square),
            noise: Wavetable::new(Waveform::Noise),
        }
    }

    pub fn get(&self, waveform: Waveform) -> &Wavetable {
        match waveform {
            Waveform::Sine => &self.sine,
            Waveform::Triangle => &self.triangle,
            Waveform::Saw => &self.saw,
            Waveform::Square => &self.square,
            Waveform::Noise => &self.noise,
        }
    }
}

impl Default for WavetableBank {
    fn default() -> Self {
        Self::new()
    }
}

/// Phase increment per sample for `frequency`.
#[inline]
pub fn phase_step(frequency: f64, sample_rate: f32) -> f64 {
    TAU * frequency / sample_rate as f64
}

/// Frequency ratio for an offset in semitones: 2^(semitones/12).
#[inline]
pub fn semitone_ratio(semitones: f64) -> f64 {
    2.0_f64.powf(semitones / 12.0)
}

/// Detune of unison copy `index` out of `count`, in cents.
pub fn unison_offset_cents(index: usize, count: usize, spread_cents: f32) -> f64 {
    if count <= 1 {
        return 0.0;
    }
    let spread = spread_cents as f64;
    -spread + 2.0 * spread * index as f64 / (count - 1) as f64
}

/// One oscillator layer of a voice: a bank of unison phase accumulators
/// reading a shared wavetable.
pub struct Oscillator {
    bank: Arc<WavetableBank>,
    phases: [f64; MAX_UNISON],
    // Step multiplier per unison copy, valid for `detune_for`.
    detune: [f64; MAX_UNISON],
    detune_for: (usize, f32),
}

impl Oscillator {
    pub fn new(bank: Arc<WavetableBank>) -> Self {
        Self {
            bank,
            phases: [0.0; MAX_UNISON],
            detune: [1.0; MAX_UNISON],
            detune_for: (1, 0.0),
        }
    }

    fn update_detune(&mut self, count: usize, spread_cents: f32) {
        if self.detune_for == (count, spread_cents) {
            return;
        }
        for (i, ratio) in self.detune.iter_mut().enumerate() {
            let cents = if i < count {
                unison_offset_cents(i, count, spread_cents)
            } else {
                0.0
            };
            *ratio = if cents == 0.0 {
                1.0
            } else {
                2.0_f64.powf(cents / 1200.0)
            };
        }
        self.detune_for = (count, spread_cents);
    }

    /// Restart all accumulators, staggering the unison copies across the
    /// cycle so they do not start phase-locked.
    pub fn reset(&mut self, unison: usize) {
        let count = unison.clamp(1, MAX_UNISON);
        for (i, phase) in self.phases.iter_mut().enumerate() {
            *phase = if i < count {
                TAU * i as f64 / count as f64
            } else {
                0.0
            };
        }
    }

    /// Render one sample and advance every unison accumulator.
    ///
    /// `frequency` already includes the layer's semitone offset and any
    /// pitch modulation.
    pub fn next_sample(
        &mut self,
        waveform: Waveform,
        frequency: f64,
        unison: usize,
        spread_cents: f32,
        sample_rate: f32,
    ) -> f32 {
        let count = unison.clamp(1, MAX_UNISON);
        self.update_detune(count, spread_cents);
        let table = self.bank.get(waveform);
        let base_step = phase_step(frequency, sample_rate);

        let mut sum = 0.0;
        for (phase, ratio) in self.phases[..count].iter_mut().zip(&self.detune) {
            sum += table.render(*phase);
            *phase = (*phase + base_step * ratio) % TAU;
        }

        if count == 1 {
            sum
        } else {
            sum / (count as f32).sqrt()
        }
    }

    pub fn phase(&self, index: usize) -> f64 {
        self.phases[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn rms(buffer: &[f32]) -> f32 {
        (buffer.iter().map(|x| x * x).sum::<f32>() / buffer.len() as f32).sqrt()
    }

    #[test]
    fn sine_table_matches_sin() {
        let table = Wavetable::new(Waveform::Sine);
        for &phase in &[0.0, 0.3, 1.0, std::f64::consts::PI, 5.5] {
            let expected = phase.sin() as f32;
            let actual = table.render(phase);
            assert!(
                (actual - expected).abs() < 1e-4,
                "phase {phase}: expected {expected}, got {actual}"
            );
        }
    }

    #[test]
    fn interpolates_between_entries() {
        let table = Wavetable::new(Waveform::Saw);
        let step = TAU / TABLE_SIZE as f64;
        let a = table.render(step * 10.0);
        let b = table.render(step * 11.0);
        let mid = table.render(step * 10.5);
        assert!((mid - (a + b) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn unison_offsets_are_symmetric() {
        assert_eq!(unison_offset_cents(0, 1, 30.0), 0.0);

        let offsets: Vec<f64> = (0..5).map(|i| unison_offset_cents(i, 5, 20.0)).collect();
        assert!((offsets[0] + 20.0).abs() < 1e-9);
        assert!((offsets[4] - 20.0).abs() < 1e-9);
        assert!(offsets[2].abs() < 1e-9);
        assert!((offsets[1] + offsets[3]).abs() < 1e-9);
    }

    #[test]
    fn single_layer_follows_phase_accumulator() {
        let bank = Arc::new(WavetableBank::new());
        let mut osc = Oscillator::new(bank);
        osc.reset(1);

        let frequency = 440.0;
        let mut buffer = vec![0.0f32; 64];
        for sample in buffer.iter_mut() {
            *sample = osc.next_sample(Waveform::Sine, frequency, 1, 0.0, SAMPLE_RATE);
        }

        let n = 12;
        let expected = (TAU * frequency * n as f64 / SAMPLE_RATE as f64).sin() as f32;
        assert!((buffer[n] - expected).abs() < 1e-3);
    }

    #[test]
    fn phase_wraps_below_two_pi() {
        let bank = Arc::new(WavetableBank::new());
        let mut osc = Oscillator::new(bank);
        osc.reset(1);
        for _ in 0..10_000 {
            osc.next_sample(Waveform::Saw, 3_000.0, 1, 0.0, SAMPLE_RATE);
        }
        assert!((0.0..TAU).contains(&osc.phase(0)));
    }

    #[test]
    fn detune_change_applies_to_next_sample() {
        let bank = Arc::new(WavetableBank::new());
        let mut osc = Oscillator::new(bank);
        osc.reset(3);

        let advance = |osc: &mut Oscillator, spread: f32| {
            let before = [osc.phase(0), osc.phase(2)];
            osc.next_sample(Waveform::Sine, 1.0, 3, spread, SAMPLE_RATE);
            [osc.phase(0) - before[0], osc.phase(2) - before[1]]
        };

        let [low, high] = advance(&mut osc, 0.0);
        assert!((high / low - 1.0).abs() < 1e-9);

        let [low, high] = advance(&mut osc, 100.0);
        let expected = 2.0_f64.powf(200.0 / 1200.0);
        assert!((high / low - expected).abs() < 1e-6, "ratio {}", high / low);

        let [low, high] = advance(&mut osc, 0.0);
        assert!((high / low - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unison_keeps_rms_level() {
        let bank = Arc::new(WavetableBank::new());
        let render = |unison: usize| {
            let mut osc = Oscillator::new(bank.clone());
            osc.reset(unison);
            let buffer: Vec<f32> = (0..SAMPLE_RATE as usize)
                .map(|_| osc.next_sample(Waveform::Saw, 220.0, unison, 25.0, SAMPLE_RATE))
                .collect();
            rms(&buffer)
        };

        let single = render(1);
        let wide = render(6);
        let ratio = wide / single;
        assert!(
            (0.6..1.4).contains(&ratio),
            "unison changed loudness: single={single}, wide={wide}"
        );
    }
}
