// Voices, the engine that mixes them, and the control surface that drives
// the engine from another thread.

pub mod engine;
pub mod live;
pub mod message;
pub mod notes;
pub mod params;
pub mod voice;
