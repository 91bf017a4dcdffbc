use std::sync::Arc;

use crate::{
    dsp::{
        envelope::{EnvelopeGenerator, EnvelopeState},
        oscillator::{semitone_ratio, Oscillator, WavetableBank},
    },
    synth::params::{AdsrParams, OscillatorParams},
    OSC_LAYERS,
};

/// Fade applied to a voice that is being stolen, in seconds.
pub const STEAL_RELEASE_SECONDS: f32 = 0.005;

/// Tolerance when matching a note-off against a voice's frequency.
pub const FREQUENCY_EPSILON: f64 = 1e-3;

/// A note waiting for its stolen voice to finish fading out.
#[derive(Debug, Clone, Copy)]
struct PendingNote {
    frequency: f64,
    adsr: AdsrParams,
    age: u64,
}

/// One note's worth of sound: an envelope and a bank of oscillator layers.
pub struct Voice {
    active: bool,
    frequency: f64,
    age: u64,
    sample_rate: f32,
    envelope: EnvelopeGenerator,
    oscillators: [Oscillator; OSC_LAYERS],
    // Last seen semitone offset per layer and its frequency ratio.
    layer_ratios: [(f32, f64); OSC_LAYERS],
    pending: Option<PendingNote>,
}

impl Voice {
    pub fn new(sample_rate: f32, bank: Arc<WavetableBank>) -> Self {
        Self {
            active: false,
            frequency: 0.0,
            age: 0,
            sample_rate,
            envelope: EnvelopeGenerator::new(sample_rate),
            oscillators: std::array::from_fn(|_| Oscillator::new(bank.clone())),
            layer_ratios: [(0.0, 1.0); OSC_LAYERS],
            pending: None,
        }
    }

    /// Start a note immediately.
    pub fn start(
        &mut self,
        frequency: f64,
        adsr: &AdsrParams,
        layers: &[OscillatorParams; OSC_LAYERS],
        age: u64,
    ) {
        let was_silent = !self.active;

        self.frequency = frequency;
        self.age = age;
        self.pending = None;
        self.envelope
            .set_adsr(adsr.attack, adsr.decay, adsr.sustain, adsr.release);
        self.envelope.note_on();
        self.active = true;

        if was_silent {
            for (osc, layer) in self.oscillators.iter_mut().zip(layers) {
                osc.reset(layer.unison);
            }
        }
    }

    /// Take this voice for a new note.
    ///
    /// A silent voice starts right away. A sounding one fades out quickly
    /// through Release and the new note starts the moment it reaches Idle.
    pub fn steal(
        &mut self,
        frequency: f64,
        adsr: &AdsrParams,
        layers: &[OscillatorParams; OSC_LAYERS],
        age: u64,
    ) {
        if !self.active {
            self.start(frequency, adsr, layers, age);
            return;
        }

        self.pending = Some(PendingNote {
            frequency,
            adsr: *adsr,
            age,
        });
        self.envelope.note_off_with(STEAL_RELEASE_SECONDS);
    }

    /// Gate low for the sounding note. A pending note for the same pitch is
    /// dropped instead.
    pub fn release(&mut self, frequency: f64) {
        if let Some(pending) = self.pending {
            if (pending.frequency - frequency).abs() < FREQUENCY_EPSILON {
                self.pending = None;
            }
            return;
        }

        if self.active && self.sounds(frequency) {
            self.envelope.note_off();
        }
    }

    /// Gate low regardless of pitch, dropping any pending note.
    pub fn release_all(&mut self) {
        self.pending = None;
        if self.active {
            self.envelope.note_off();
        }
    }

    fn sounds(&self, frequency: f64) -> bool {
        (self.frequency - frequency).abs() < FREQUENCY_EPSILON
    }

    /// Render one sample.
    ///
    /// `pitch` multiplies every layer's frequency (vibrato). Layers with
    /// zero volume are skipped; the sum is divided by the audible count.
    pub fn next_sample(&mut self, layers: &[OscillatorParams; OSC_LAYERS], pitch: f64) -> f32 {
        if !self.active {
            return 0.0;
        }

        let level = self.envelope.next_sample();

        let mut sum = 0.0;
        let mut audible = 0;
        let voices = self.oscillators.iter_mut().zip(self.layer_ratios.iter_mut());
        for ((osc, cached), layer) in voices.zip(layers) {
            if !layer.is_audible() {
                continue;
            }
            if cached.0 != layer.semitones {
                *cached = (layer.semitones, semitone_ratio(layer.semitones as f64));
            }
            let frequency = self.frequency * cached.1 * pitch;
            sum += osc.next_sample(
                layer.waveform,
                frequency,
                layer.unison,
                layer.detune,
                self.sample_rate,
            ) * layer.volume;
            audible += 1;
        }

        let out = if audible > 0 {
            sum / audible as f32 * level
        } else {
            0.0
        };

        if !self.envelope.is_active() {
            self.active = false;
            if let Some(next) = self.pending.take() {
                self.start(next.frequency, &next.adsr, layers, next.age);
            }
        }

        out
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Frequency the voice will play once a pending steal completes.
    pub fn pending_frequency(&self) -> Option<f64> {
        self.pending.map(|p| p.frequency)
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn envelope_state(&self) -> EnvelopeState {
        self.envelope.state()
    }

    pub fn envelope_level(&self) -> f32 {
        self.envelope.level()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::params::SynthParams;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn voice() -> Voice {
        Voice::new(SAMPLE_RATE, Arc::new(WavetableBank::new()))
    }

    #[test]
    fn test_start_and_release_cycle() {
        let params = SynthParams::default();
        let mut voice = voice();
        assert!(!voice.is_active());

        voice.start(110.0, &params.adsr, &params.oscillators, 1);
        assert!(voice.is_active());
        assert_eq!(voice.frequency(), 110.0);

        for _ in 0..100 {
            voice.next_sample(&params.oscillators, 1.0);
        }
        voice.release(110.0);
        assert_eq!(voice.envelope_state(), EnvelopeState::Release);

        for _ in 0..1_000 {
            voice.next_sample(&params.oscillators, 1.0);
        }
        assert!(!voice.is_active());
    }

    #[test]
    fn test_release_ignores_other_pitches() {
        let params = SynthParams::default();
        let mut voice = voice();
        voice.start(220.0, &params.adsr, &params.oscillators, 1);
        voice.release(330.0);
        assert_ne!(voice.envelope_state(), EnvelopeState::Release);
    }

    #[test]
    fn test_steal_fades_before_new_note() {
        let params = SynthParams::default();
        let mut voice = voice();
        voice.start(220.0, &params.adsr, &params.oscillators, 1);
        for _ in 0..100 {
            voice.next_sample(&params.oscillators, 1.0);
        }

        voice.steal(440.0, &params.adsr, &params.oscillators, 2);
        assert_eq!(voice.envelope_state(), EnvelopeState::Release);
        assert_eq!(voice.frequency(), 220.0);
        assert_eq!(voice.pending_frequency(), Some(440.0));

        // 5 ms fade is floored at 10 samples; the tail falls under the
        // release floor within a few dozen samples.
        for _ in 0..100 {
            voice.next_sample(&params.oscillators, 1.0);
        }
        assert!(voice.is_active());
        assert_eq!(voice.frequency(), 440.0);
        assert_eq!(voice.pending_frequency(), None);
        assert_eq!(voice.age(), 2);
    }

    #[test]
    fn test_note_off_cancels_pending_steal() {
        let params = SynthParams::default();
        let mut voice = voice();
        voice.start(220.0, &params.adsr, &params.oscillators, 1);
        voice.steal(440.0, &params.adsr, &params.oscillators, 2);
        voice.release(440.0);
        assert_eq!(voice.pending_frequency(), None);

        for _ in 0..100 {
            voice.next_sample(&params.oscillators, 1.0);
        }
        assert!(!voice.is_active());
    }

    #[test]
    fn test_steal_has_no_step() {
        let sample_rate = 44_100.0;
        let params = SynthParams {
            adsr: AdsrParams::new(0.01, 0.0, 1.0, 0.5),
            ..Default::default()
        };
        let mut voice = Voice::new(sample_rate, Arc::new(WavetableBank::new()));
        voice.start(220.0, &params.adsr, &params.oscillators, 1);

        let mut previous = 0.0;
        for _ in 0..2_000 {
            previous = voice.next_sample(&params.oscillators, 1.0);
        }

        // Full-scale sines at 220 and 440 Hz move at most 0.031 and 0.063
        // per sample. A hard cut would jump by up to 1.0.
        voice.steal(440.0, &params.adsr, &params.oscillators, 2);
        for i in 0..2_000 {
            let sample = voice.next_sample(&params.oscillators, 1.0);
            assert!((sample - previous).abs() < 0.08, "step at sample {i}");
            previous = sample;
        }
        assert_eq!(voice.frequency(), 440.0);
    }

    #[test]
    fn test_silent_layers_render_nothing() {
        let mut params = SynthParams::default();
        params.oscillators[0].volume = 0.0;
        let mut voice = voice();
        voice.start(220.0, &params.adsr, &params.oscillators, 1);
        for _ in 0..50 {
            assert_eq!(voice.next_sample(&params.oscillators, 1.0), 0.0);
        }
    }

    #[test]
    fn test_semitone_change_retunes_running_note() {
        let mut params = SynthParams::default();
        params.oscillators = [OscillatorParams::silent(); OSC_LAYERS];
        params.oscillators[0] = OscillatorParams::default();

        let mut voice = voice();
        voice.start(50.0, &params.adsr, &params.oscillators, 1);

        let crossings = |voice: &mut Voice, layers: &[OscillatorParams; OSC_LAYERS]| {
            let samples: Vec<f32> = (0..500).map(|_| voice.next_sample(layers, 1.0)).collect();
            samples.windows(2).filter(|w| (w[0] < 0.0) != (w[1] < 0.0)).count()
        };

        crossings(&mut voice, &params.oscillators);
        let base = crossings(&mut voice, &params.oscillators);
        params.oscillators[0].semitones = 12.0;
        let octave = crossings(&mut voice, &params.oscillators);
        assert!(octave as f32 > base as f32 * 1.6, "{base} -> {octave}");
    }
}
