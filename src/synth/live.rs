use std::sync::Arc;

use log::{trace, warn};
use rtrb::{Consumer, Producer, PushError, RingBuffer};

use crate::{
    dsp::oscillator::WavetableBank,
    output::{device::BlockSource, StreamWaker},
    synth::{
        engine::{bounce, SynthEngine},
        message::SynthMessage,
        notes::{midi_note_to_freq, NoteTable},
        params::{AdsrParams, DelayParams, FilterParams, LfoParams, OscillatorParams, SynthParams},
    },
    OSC_LAYERS,
};

/// Capacity of the control ring between a handle and its engine.
pub const MESSAGE_QUEUE_SIZE: usize = 256;

/// The engine as it runs on the streaming thread.
///
/// Applies queued control messages at the start of every block, then
/// renders. Reports "nothing to play" once the engine has gone idle.
pub struct LiveSynth {
    engine: SynthEngine,
    rx: Consumer<SynthMessage>,
}

impl LiveSynth {
    /// Split an engine into its streaming half and its control half.
    pub fn new(engine: SynthEngine) -> (Self, SynthHandle) {
        let (tx, rx) = RingBuffer::new(MESSAGE_QUEUE_SIZE);
        let handle = SynthHandle {
            tx,
            waker: None,
            params: *engine.params(),
            sample_rate: engine.sample_rate(),
            bank: engine.bank().clone(),
            notes: engine.notes().clone(),
        };
        (Self { engine, rx }, handle)
    }

    pub fn engine(&self) -> &SynthEngine {
        &self.engine
    }
}

impl BlockSource for LiveSynth {
    fn fill_block(&mut self, out: &mut [i16]) -> bool {
        self.engine.drain(&mut self.rx);
        self.engine.render_block(out)
    }
}

/// Caller-side control of a running engine.
///
/// Every call is queued for the streaming thread and wakes it. Parameter
/// setters are mirrored locally so `params()` and `generate_sample` see
/// the latest values without a round trip.
pub struct SynthHandle {
    tx: Producer<SynthMessage>,
    waker: Option<StreamWaker>,
    params: SynthParams,
    sample_rate: f32,
    bank: Arc<WavetableBank>,
    notes: Arc<NoteTable>,
}

impl SynthHandle {
    /// Wake this pipeline whenever a message is sent.
    pub fn attach(&mut self, waker: StreamWaker) {
        self.waker = Some(waker);
    }

    fn send(&mut self, message: SynthMessage) {
        if self.waker.as_ref().is_some_and(|w| w.is_closed()) {
            trace!("pipeline closed, dropping {message:?}");
            return;
        }
        if let Err(PushError::Full(message)) = self.tx.push(message) {
            warn!("control queue full, dropping {message:?}");
        }
        if let Some(waker) = &self.waker {
            waker.wake();
        }
    }

    pub fn note_on(&mut self, frequency: f64) {
        self.send(SynthMessage::NoteOn { frequency });
    }

    pub fn note_off(&mut self, frequency: f64) {
        self.send(SynthMessage::NoteOff { frequency });
    }

    pub fn note_on_midi(&mut self, note: u8) {
        self.note_on(midi_note_to_freq(note));
    }

    pub fn note_off_midi(&mut self, note: u8) {
        self.note_off(midi_note_to_freq(note));
    }

    /// Returns false for unknown note names.
    pub fn note_on_named(&mut self, name: &str) -> bool {
        self.notes
            .frequency(name)
            .map(|frequency| self.note_on(frequency))
            .is_some()
    }

    pub fn note_off_named(&mut self, name: &str) -> bool {
        self.notes
            .frequency(name)
            .map(|frequency| self.note_off(frequency))
            .is_some()
    }

    pub fn all_notes_off(&mut self) {
        self.send(SynthMessage::AllNotesOff);
    }

    pub fn set_adsr(&mut self, adsr: AdsrParams) {
        self.params.adsr = adsr.clamped();
        self.send(SynthMessage::SetAdsr(adsr));
    }

    pub fn set_filter(&mut self, filter: FilterParams) {
        self.params.filter = filter.clamped();
        self.send(SynthMessage::SetFilter(filter));
    }

    pub fn set_lfo(&mut self, lfo: LfoParams) {
        self.params.lfo = lfo.clamped();
        self.send(SynthMessage::SetLfo(lfo));
    }

    pub fn set_delay(&mut self, delay: DelayParams) {
        self.params.delay = delay.clamped();
        self.send(SynthMessage::SetDelay(delay));
    }

    pub fn set_oscillator(&mut self, layer: usize, params: OscillatorParams) {
        self.params.oscillators[layer.min(OSC_LAYERS - 1)] = params.clamped();
        self.send(SynthMessage::SetOscillator { layer, params });
    }

    pub fn set_params(&mut self, params: SynthParams) {
        self.params = params.clamped();
        self.send(SynthMessage::SetParams(params));
    }

    pub fn params(&self) -> &SynthParams {
        &self.params
    }

    pub fn note_frequency(&self, name: &str) -> Option<f64> {
        self.notes.frequency(name)
    }

    /// Bounce middle C with the current parameters. Runs on the calling
    /// thread and leaves the live voices alone.
    pub fn generate_sample(&self, num_samples: usize) -> Vec<i16> {
        self.generate_sample_at(num_samples, midi_note_to_freq(60))
    }

    pub fn generate_sample_at(&self, num_samples: usize, frequency: f64) -> Vec<i16> {
        let mut engine = SynthEngine::build(
            self.sample_rate,
            self.params,
            self.bank.clone(),
            self.notes.clone(),
        );
        bounce(&mut engine, num_samples, frequency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::Waveform;

    const SAMPLE_RATE: f32 = 8_000.0;

    #[test]
    fn test_messages_reach_engine_on_next_block() {
        let (mut live, mut handle) = LiveSynth::new(SynthEngine::new(SAMPLE_RATE));
        let mut block = [0i16; 64];
        assert!(!live.fill_block(&mut block));

        handle.note_on(440.0);
        assert_eq!(live.engine().active_voices(), 0);
        assert!(live.fill_block(&mut block));
        assert_eq!(live.engine().active_voices(), 1);
    }

    #[test]
    fn test_params_are_mirrored() {
        let (live, mut handle) = LiveSynth::new(SynthEngine::new(SAMPLE_RATE));
        handle.set_oscillator(
            1,
            OscillatorParams {
                waveform: Waveform::Saw,
                unison: 20,
                ..Default::default()
            },
        );
        assert_eq!(handle.params().oscillators[1].waveform, Waveform::Saw);
        assert_eq!(handle.params().oscillators[1].unison, crate::MAX_UNISON);
        drop(live);
    }

    #[test]
    fn test_bounce_matches_engine() {
        let mut engine = SynthEngine::new(SAMPLE_RATE);
        let adsr = AdsrParams::new(0.02, 0.05, 0.5, 0.1);
        engine.set_adsr(adsr);
        let expected = engine.generate_sample(2_000);

        let (_live, mut handle) = LiveSynth::new(SynthEngine::new(SAMPLE_RATE));
        handle.set_adsr(adsr);
        assert_eq!(handle.generate_sample(2_000), expected);
    }

    #[test]
    fn test_full_queue_drops_messages() {
        let (mut live, mut handle) = LiveSynth::new(SynthEngine::new(SAMPLE_RATE));
        for _ in 0..MESSAGE_QUEUE_SIZE + 10 {
            handle.note_on(220.0);
        }
        let mut block = [0i16; 16];
        assert!(live.fill_block(&mut block));
        assert_eq!(live.engine().active_voices(), crate::MAX_VOICES);
    }

    #[test]
    fn test_named_notes() {
        let (mut live, mut handle) = LiveSynth::new(SynthEngine::new(SAMPLE_RATE));
        assert!(handle.note_on_named("E4"));
        assert!(!handle.note_on_named("nope"));
        let mut block = [0i16; 16];
        assert!(live.fill_block(&mut block));
        assert_eq!(live.engine().active_voices(), 1);
    }
}
