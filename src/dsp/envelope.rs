use crate::MIN_STAGE_SAMPLES;

/*
ADSR Envelope Generator
=======================

The envelope produces a 0.0 .. 1.0 multiplier that shapes a note's
amplitude over its lifetime.

Vocabulary
----------

  level       The envelope's current output value (0.0 to 1.0).

  stage       Which phase we're in: Idle, Attack, Decay, Sustain, Release.

  rate        Per-sample change of `level`, precomputed when a stage starts
              so the per-sample work is one add or one multiply.


The Shape
---------

  Level
    1.0 ┐     ╱╲
        │    ╱  ╲___________
    S   │   ╱               ╲
        │  ╱                 ╲_
    0.0 └─╱────────────────────‾‾──→ Time
        Attack Decay  Sustain  Release
        (lin)  (lin)           (exp)

Attack and decay are linear ramps. Release is exponential: every sample
multiplies the level by the same factor, so the tail fades the way an
acoustic sound does instead of hitting zero with a corner.


The Math
--------

  attack_rate  = 1 / max(10, attack · sample_rate)            level += rate
  decay_rate   = (1 - S) / max(10, decay · sample_rate)       level -= rate
  release_rate = exp(-5 / max(10, release · sample_rate))     level *= rate

After `release · sample_rate` samples the level has been multiplied by
e^-5 ≈ 0.0067, i.e. it is below 1% of where the release started. Once it
drops under 0.001 the envelope snaps to Idle.

Every stage lasts at least 10 samples. A zero-length stage is a step, and
a step in amplitude is a click.


The State Machine
-----------------

   ┌──────┐ note_on ┌────────┐ level≥1 ┌───────┐ level≤S ┌─────────┐
   │ Idle │────────→│ Attack │────────→│ Decay │────────→│ Sustain │
   └──────┘         └────────┘         └───────┘         └─────────┘
       ↑                 │ note_off        │ note_off         │ note_off
       │                 ↓                 ↓                  ↓
       │  level<0.001  ┌─────────────────────────────────────────┐
       └───────────────│                 Release                 │
                       └─────────────────────────────────────────┘

note_on enters Attack from the CURRENT level. Retriggering a sounding
voice ramps up from where it is rather than jumping back to zero.
*/

/// Level below which a releasing envelope is considered silent.
const RELEASE_FLOOR: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,    // Gate low, envelope inactive, level = 0
    Attack,  // Gate high, ramping up to 1.0
    Decay,   // Reached peak, ramping down to sustain level
    Sustain, // Holding at sustain level while gate is high
    Release, // Gate low, decaying exponentially toward 0
}

pub struct EnvelopeGenerator {
    sample_rate: f32,

    // ADSR parameters
    attack_time: f32,   // seconds to ramp 0 → 1
    decay_time: f32,    // seconds to ramp 1 → sustain
    sustain_level: f32, // level to hold (0.0 - 1.0)
    release_time: f32,  // seconds to fall below 1% of the release start

    // Runtime state
    state: EnvelopeState,
    level: f32,

    // Per-sample rates, recomputed on note_on / note_off
    attack_rate: f32,
    decay_rate: f32,
    release_rate: f32,
}

impl EnvelopeGenerator {
    pub fn new(sample_rate: f32) -> Self {
        Self::adsr(sample_rate, 0.01, 0.1, 0.7, 0.3)
    }

    pub fn adsr(sample_rate: f32, attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        let mut env = Self {
            sample_rate,
            attack_time: 0.0,
            decay_time: 0.0,
            sustain_level: 0.0,
            release_time: 0.0,
            state: EnvelopeState::Idle,
            level: 0.0,
            attack_rate: 0.0,
            decay_rate: 0.0,
            release_rate: 0.0,
        };
        env.set_adsr(attack, decay, sustain, release);
        env
    }

    /// Update the stage times and sustain level. Takes effect on the next
    /// note_on / note_off.
    pub fn set_adsr(&mut self, attack: f32, decay: f32, sustain: f32, release: f32) {
        self.attack_time = attack.max(0.0);
        self.decay_time = decay.max(0.0);
        self.sustain_level = sustain.clamp(0.0, 1.0);
        self.release_time = release.max(0.0);
    }

    #[inline]
    fn stage_samples(&self, seconds: f32) -> f32 {
        (seconds * self.sample_rate).max(MIN_STAGE_SAMPLES)
    }

    fn release_rate_for(&self, seconds: f32) -> f32 {
        (-5.0 / self.stage_samples(seconds)).exp()
    }

    /// Gate high: enter Attack from the current level.
    pub fn note_on(&mut self) {
        self.attack_rate = 1.0 / self.stage_samples(self.attack_time);
        self.decay_rate = (1.0 - self.sustain_level) / self.stage_samples(self.decay_time);
        self.release_rate = self.release_rate_for(self.release_time);
        self.state = EnvelopeState::Attack;
    }

    /// Gate low: enter Release from whatever stage we are in.
    pub fn note_off(&mut self) {
        self.note_off_with(self.release_time);
    }

    /// Release over `release_time` seconds instead of the configured time.
    /// Used to fade out a voice that is about to be stolen.
    pub fn note_off_with(&mut self, release_time: f32) {
        self.release_rate = self.release_rate_for(release_time.max(0.0));
        self.state = EnvelopeState::Release;
    }

    /// Advance the envelope by one sample and return the new level.
    pub fn next_sample(&mut self) -> f32 {
        match self.state {
            EnvelopeState::Idle => {
                self.level = 0.0;
            }

            EnvelopeState::Attack => {
                self.level += self.attack_rate;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.state = EnvelopeState::Decay;
                }
            }

            EnvelopeState::Decay => {
                self.level -= self.decay_rate;
                if self.level <= self.sustain_level {
                    self.level = self.sustain_level;
                    self.state = EnvelopeState::Sustain;
                }
            }

            EnvelopeState::Sustain => {
                self.level = self.sustain_level;
            }

            EnvelopeState::Release => {
                self.level *= self.release_rate;
                if self.level < RELEASE_FLOOR {
                    self.level = 0.0;
                    self.state = EnvelopeState::Idle;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    /// Render a block of envelope values into the buffer.
    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }

    /// Returns true if the envelope is producing output (not idle).
    pub fn is_active(&self) -> bool {
        self.state != EnvelopeState::Idle
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn state(&self) -> EnvelopeState {
        self.state
    }
}

/// Fit an attack and a release segment into `total` samples.
///
/// When the two together are longer than `total`, both are scaled by the
/// same factor so they keep their proportions and never overlap.
pub fn fit_segments(total: usize, attack: usize, release: usize) -> (usize, usize) {
    let requested = attack + release;
    if requested <= total {
        return (attack, release);
    }

    let scale = total as f64 / requested as f64;
    let attack = (attack as f64 * scale).floor() as usize;
    let release = (release as f64 * scale).floor() as usize;
    (attack, release.min(total - attack))
}

/// Apply linear fade-in and fade-out ramps to a rendered block.
///
/// The first sample of a fade-in and the last sample of a fade-out are
/// silent. Oversized fades are rescaled with [`fit_segments`].
pub fn apply_fades(samples: &mut [i16], fade_in: usize, fade_out: usize) {
    let len = samples.len();
    let (fade_in, fade_out) = fit_segments(len, fade_in, fade_out);

    for (i, sample) in samples[..fade_in].iter_mut().enumerate() {
        let gain = i as f32 / fade_in as f32;
        *sample = (*sample as f32 * gain).round() as i16;
    }

    for (k, sample) in samples[len - fade_out..].iter_mut().enumerate() {
        let gain = (fade_out - 1 - k) as f32 / fade_out as f32;
        *sample = (*sample as f32 * gain).round() as i16;
    }
}
