use rtrb::Consumer;

use crate::synth::params::{
    AdsrParams, DelayParams, FilterParams, LfoParams, OscillatorParams, SynthParams,
};

/// Control events sent from the caller's thread to the streaming thread.
#[derive(Debug, Copy, Clone)]
pub enum SynthMessage {
    NoteOn { frequency: f64 },
    NoteOff { frequency: f64 },
    AllNotesOff,
    SetAdsr(AdsrParams),
    SetFilter(FilterParams),
    SetLfo(LfoParams),
    SetDelay(DelayParams),
    SetOscillator { layer: usize, params: OscillatorParams },
    SetParams(SynthParams),
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<SynthMessage>;
}

impl MessageReceiver for Consumer<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        Consumer::pop(self).ok()
    }
}
