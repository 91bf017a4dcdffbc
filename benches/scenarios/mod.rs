//! Engine scenario benchmarks.
//!
//! These render through the whole engine (voices, shared filter, LFO,
//! delay and soft clip) the way the streaming thread does.

mod voices;

pub use voices::bench_voices;
