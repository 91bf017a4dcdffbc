use std::sync::Arc;

use log::debug;

use crate::{
    dsp::{
        delay::FeedbackDelay,
        distortion::{soft_clip, to_i16},
        envelope::{apply_fades, fit_segments, EnvelopeState},
        filter::ResonantFilter,
        lfo::{ModTarget, ModulationOscillator},
        oscillator::{semitone_ratio, WavetableBank},
    },
    synth::{
        message::{MessageReceiver, SynthMessage},
        notes::{midi_note_to_freq, NoteTable},
        params::{AdsrParams, DelayParams, FilterParams, LfoParams, OscillatorParams, SynthParams},
        voice::Voice,
    },
    MAX_VOICES, MIN_STAGE_SAMPLES, OSC_LAYERS,
};

/// Gain applied to the voice sum when more than one voice sounds.
pub const CHORD_ATTENUATION: f32 = 0.6;
/// Cutoff swing at full LFO output, in Hz.
pub const CUTOFF_MOD_RANGE_HZ: f32 = 4_000.0;
/// Resonance swing at full LFO output.
pub const RESONANCE_MOD_RANGE: f32 = 0.5;
/// Pitch swing at full LFO output, in semitones.
pub const PITCH_MOD_SEMITONES: f64 = 2.0;
/// Lowest frequency accepted by note_on.
pub const MIN_NOTE_HZ: f64 = 8.0;
/// Samples faded out at the very end of a bounce.
const BOUNCE_TAIL_FADE: usize = 64;

/// The polyphonic synthesis engine.
///
/// Owns a fixed pool of voices and one shared filter, LFO and delay. All
/// voices feed the same effect chain:
///
/// ```text
/// voices ─sum─→ chord gain ─→ LFO gain ─→ filter ─→ delay ─→ tanh ─→ i16
/// ```
pub struct SynthEngine {
    sample_rate: f32,
    params: SynthParams,
    voices: Vec<Voice>,
    filter: ResonantFilter,
    lfo: ModulationOscillator,
    delay: FeedbackDelay,
    bank: Arc<WavetableBank>,
    notes: Arc<NoteTable>,
    note_counter: u64,
    was_sounding: bool,
}

impl SynthEngine {
    pub fn new(sample_rate: f32) -> Self {
        Self::with_params(sample_rate, SynthParams::default())
    }

    pub fn with_params(sample_rate: f32, params: SynthParams) -> Self {
        Self::build(
            sample_rate,
            params,
            Arc::new(WavetableBank::new()),
            Arc::new(NoteTable::new()),
        )
    }

    pub(crate) fn build(
        sample_rate: f32,
        params: SynthParams,
        bank: Arc<WavetableBank>,
        notes: Arc<NoteTable>,
    ) -> Self {
        let voices = (0..MAX_VOICES)
            .map(|_| Voice::new(sample_rate, bank.clone()))
            .collect();

        let mut engine = Self {
            sample_rate,
            params: SynthParams::default(),
            voices,
            filter: ResonantFilter::new(sample_rate),
            lfo: ModulationOscillator::new(sample_rate),
            delay: FeedbackDelay::new(sample_rate),
            bank,
            notes,
            note_counter: 0,
            was_sounding: false,
        };
        engine.set_params(params);
        engine
    }

    // --- Notes -------------------------------------------------------------

    /// Clamp into the playable range. `None` for NaN.
    fn note_frequency_in_range(&self, frequency: f64) -> Option<f64> {
        if frequency.is_nan() {
            return None;
        }
        let nyquist = self.sample_rate as f64 / 2.0;
        Some(frequency.clamp(MIN_NOTE_HZ, nyquist))
    }

    pub fn note_on(&mut self, frequency: f64) {
        let Some(frequency) = self.note_frequency_in_range(frequency) else {
            debug!("ignoring note_on with NaN frequency");
            return;
        };

        self.note_counter += 1;
        let index = self.free_voice_index();
        let SynthParams {
            adsr, oscillators, ..
        } = &self.params;
        self.voices[index].steal(frequency, adsr, oscillators, self.note_counter);
    }

    /// Release every voice holding `frequency`.
    pub fn note_off(&mut self, frequency: f64) {
        let Some(frequency) = self.note_frequency_in_range(frequency) else {
            return;
        };
        for voice in self.voices.iter_mut() {
            voice.release(frequency);
        }
    }

    /// Send every voice into Release and drop pending steals.
    pub fn all_notes_off(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.release_all();
        }
    }

    /// `note_on` by name ("A4", "C#3"). Returns false for unknown names.
    pub fn note_on_named(&mut self, name: &str) -> bool {
        match self.notes.frequency(name) {
            Some(frequency) => {
                self.note_on(frequency);
                true
            }
            None => false,
        }
    }

    pub fn note_off_named(&mut self, name: &str) -> bool {
        match self.notes.frequency(name) {
            Some(frequency) => {
                self.note_off(frequency);
                true
            }
            None => false,
        }
    }

    pub fn note_frequency(&self, name: &str) -> Option<f64> {
        self.notes.frequency(name)
    }

    /// Voice for a new note: a free one, else the quietest releasing one
    /// (oldest on ties), else voice 0.
    fn free_voice_index(&self) -> usize {
        if let Some(index) = self.voices.iter().position(|v| !v.is_active()) {
            return index;
        }

        self.voices
            .iter()
            .enumerate()
            .filter(|(_, v)| {
                v.envelope_state() == EnvelopeState::Release && v.pending_frequency().is_none()
            })
            .min_by(|(_, a), (_, b)| {
                a.envelope_level()
                    .total_cmp(&b.envelope_level())
                    .then(a.age().cmp(&b.age()))
            })
            .map(|(index, _)| index)
            .unwrap_or(0)
    }

    // --- Parameters --------------------------------------------------------

    pub fn set_params(&mut self, params: SynthParams) {
        let params = params.clamped();
        self.set_adsr(params.adsr);
        for (layer, osc) in params.oscillators.iter().enumerate() {
            self.set_oscillator(layer, *osc);
        }
        self.set_delay(params.delay);
        self.set_filter(params.filter);
        self.set_lfo(params.lfo);
    }

    /// Applies to voices triggered from now on.
    pub fn set_adsr(&mut self, adsr: AdsrParams) {
        self.params.adsr = adsr.clamped();
    }

    pub fn set_filter(&mut self, filter: FilterParams) {
        let filter = filter.clamped();
        if filter.enabled && !self.params.filter.enabled {
            self.filter.reset();
        }
        self.params.filter = filter;
        self.restore_filter();
    }

    pub fn set_lfo(&mut self, lfo: LfoParams) {
        let lfo = lfo.clamped();
        if lfo.enabled && !self.params.lfo.enabled {
            self.lfo.reset_phase();
        }
        self.lfo.set_waveform(lfo.waveform);
        self.lfo.set_target(lfo.target);
        self.lfo.set_rate(lfo.rate);
        self.lfo.set_amount(lfo.amount);
        self.params.lfo = lfo;
        self.restore_filter();
    }

    pub fn set_delay(&mut self, delay: DelayParams) {
        let delay = delay.clamped();
        if !delay.enabled && self.params.delay.enabled {
            self.delay.clear();
        }
        self.delay.set_time(delay.time);
        self.delay.set_feedback(delay.feedback);
        self.delay.set_mix(delay.mix);
        self.params.delay = delay;
    }

    /// Out-of-range layer indices address the last layer.
    pub fn set_oscillator(&mut self, layer: usize, params: OscillatorParams) {
        let layer = layer.min(OSC_LAYERS - 1);
        self.params.oscillators[layer] = params.clamped();
    }

    /// Put the filter back on its base parameters (no modulation).
    fn restore_filter(&mut self) {
        let base = self.params.filter;
        self.filter
            .set_params(base.effective_mode(), base.cutoff, base.resonance);
    }

    pub fn params(&self) -> &SynthParams {
        &self.params
    }

    pub fn apply(&mut self, message: SynthMessage) {
        match message {
            SynthMessage::NoteOn { frequency } => self.note_on(frequency),
            SynthMessage::NoteOff { frequency } => self.note_off(frequency),
            SynthMessage::AllNotesOff => self.all_notes_off(),
            SynthMessage::SetAdsr(adsr) => self.set_adsr(adsr),
            SynthMessage::SetFilter(filter) => self.set_filter(filter),
            SynthMessage::SetLfo(lfo) => self.set_lfo(lfo),
            SynthMessage::SetDelay(delay) => self.set_delay(delay),
            SynthMessage::SetOscillator { layer, params } => self.set_oscillator(layer, params),
            SynthMessage::SetParams(params) => self.set_params(params),
        }
    }

    /// Apply every queued control message.
    pub fn drain<R: MessageReceiver>(&mut self, rx: &mut R) {
        while let Some(message) = rx.pop() {
            self.apply(message);
        }
    }

    // --- Rendering ---------------------------------------------------------

    /// Render one sample in [-1, 1].
    pub fn next_sample(&mut self) -> f32 {
        let mut pitch = 1.0;
        let mut gain = 1.0;

        if self.params.lfo.is_routed() {
            let value = self.lfo.next_sample(1);
            let base = self.params.filter;
            match self.params.lfo.target {
                ModTarget::FilterCutoff => self.filter.set_params(
                    base.effective_mode(),
                    base.cutoff + value * CUTOFF_MOD_RANGE_HZ,
                    base.resonance,
                ),
                ModTarget::FilterResonance => self.filter.set_params(
                    base.effective_mode(),
                    base.cutoff,
                    base.resonance + value * RESONANCE_MOD_RANGE,
                ),
                ModTarget::OscVolume => gain = (1.0 - value.abs()).clamp(0.0, 1.0),
                ModTarget::Pitch => pitch = semitone_ratio(value as f64 * PITCH_MOD_SEMITONES),
                ModTarget::None => {}
            }
        }

        let mut mix = 0.0;
        let mut sounding = 0;
        for voice in self.voices.iter_mut() {
            if voice.is_active() {
                mix += voice.next_sample(&self.params.oscillators, pitch);
                sounding += 1;
            }
        }

        if sounding > 1 {
            mix *= CHORD_ATTENUATION;
        }
        mix *= gain;

        if sounding == 0 && self.was_sounding {
            self.filter.reset();
        }
        self.was_sounding = sounding > 0;

        if self.params.filter.enabled {
            mix = self.filter.process(mix);
        }
        if self.params.delay.enabled {
            mix = self.delay.process(mix);
        }

        soft_clip(mix)
    }

    /// Render into a float buffer.
    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.next_sample();
        }
    }

    /// Render one block of 16-bit PCM.
    ///
    /// Returns false, leaving `out` untouched, when there is nothing to
    /// render: no voice is sounding and no echo tail is left.
    pub fn render_block(&mut self, out: &mut [i16]) -> bool {
        if self.is_idle() {
            return false;
        }
        for sample in out.iter_mut() {
            *sample = to_i16(self.next_sample());
        }
        true
    }

    pub fn is_idle(&self) -> bool {
        let voices_idle = self.voices.iter().all(|v| !v.is_active());
        let tail_done = !self.params.delay.enabled || !self.delay.is_audio_active();
        voices_idle && tail_done
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub(crate) fn bank(&self) -> &Arc<WavetableBank> {
        &self.bank
    }

    pub(crate) fn notes(&self) -> &Arc<NoteTable> {
        &self.notes
    }

    // --- Offline -----------------------------------------------------------

    /// Bounce middle C to `num_samples` of PCM. See [`Self::generate_sample_at`].
    pub fn generate_sample(&self, num_samples: usize) -> Vec<i16> {
        self.generate_sample_at(num_samples, midi_note_to_freq(60))
    }

    /// Bounce one note with the current parameters.
    ///
    /// The note is held and released early enough for the release stage to
    /// fit inside the block. Rendering uses a fresh engine, so live voices
    /// are untouched and the result is the same every call.
    pub fn generate_sample_at(&self, num_samples: usize, frequency: f64) -> Vec<i16> {
        let mut engine = Self::build(
            self.sample_rate,
            self.params,
            self.bank.clone(),
            self.notes.clone(),
        );
        bounce(&mut engine, num_samples, frequency)
    }
}

pub(crate) fn bounce(engine: &mut SynthEngine, num_samples: usize, frequency: f64) -> Vec<i16> {
    let adsr = engine.params.adsr;
    let stage = |seconds: f32| (seconds * engine.sample_rate).max(MIN_STAGE_SAMPLES) as usize;
    let (_, release) = fit_segments(num_samples, stage(adsr.attack), stage(adsr.release));
    let release_at = num_samples - release;

    engine.note_on(frequency);
    let mut out = Vec::with_capacity(num_samples);
    for i in 0..num_samples {
        if i == release_at {
            engine.note_off(frequency);
        }
        out.push(to_i16(engine.next_sample()));
    }

    apply_fades(&mut out, 0, BOUNCE_TAIL_FADE);
    out
}
