/*
Audio Output Pipeline
=====================

The engine renders blocks of 16-bit mono PCM. Something has to push those
blocks at a device at the rate the device eats them, and keep doing so
when the device goes away and comes back (headphones unplugged, Bluetooth
sink switched, USB interface power-cycled).

That something is a single dedicated streaming thread:

  caller thread                 streaming thread                device
  ─────────────                 ────────────────                ──────
  note_on ──ring──→ ┐
  wake()  ──signal─→│ wait ─→ pump ─→ fill_block ─→ queue ──→  play
                    │          ↑  (per drained buffer)
                    │          └── poll every few ms
                    └ on error: release ─→ back off ─→ reopen

Vocabulary
----------

  block         `block_frames` samples of mono i16. The unit the thread
                renders and hands to the device.

  drained       A buffer slot the device has finished playing and can
                take a new block into.

  source        Anything that fills blocks ([`BlockSource`]). Returns
                false when it has nothing to play, which sends the thread
                back to sleep until the next wake.


The State Machine
-----------------

   ┌───────────────┐ open ok  ┌───────────┐  device error  ┌────────────┐
   │ Uninitialized │─────────→│ Streaming │───────────────→│ Recovering │
   └───────────────┘          └───────────┘←───────────────└────────────┘
          │ open fails                         reopen ok        ↑
          └─────────────────────────────────────────────────────┘

   Any state ──shutdown──→ Closed

Recovery never gives up. It backs off between attempts and only stops
when the pipeline is shut down.
*/

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::SAMPLE_RATE;

#[cfg(feature = "cpal")]
pub mod cpal_device;
pub mod device;
pub mod pipeline;
pub mod signal;

#[cfg(feature = "cpal")]
pub use cpal_device::{CpalDevice, CpalDeviceFactory};
pub use device::{BlockSource, BufferLayout, DeviceFactory, OutputDevice};
pub use pipeline::AudioOutputPipeline;
pub use signal::StreamWaker;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub sample_rate: u32,
    /// Samples per block.
    pub block_frames: usize,
    /// Blocks the device holds at once.
    pub buffer_count: usize,
    /// Wait between reconnect attempts.
    pub reconnect_backoff: Duration,
    /// Interval at which a streaming device is checked for drained buffers.
    pub health_poll: Duration,
}

impl PipelineConfig {
    pub fn clamped(self) -> Self {
        Self {
            sample_rate: self.sample_rate.max(1),
            block_frames: self.block_frames.clamp(1, crate::MAX_BLOCK_SIZE),
            buffer_count: self.buffer_count.max(2),
            reconnect_backoff: self.reconnect_backoff.max(Duration::from_millis(1)),
            health_poll: self.health_poll.max(Duration::from_micros(100)),
        }
    }

    pub fn layout(&self) -> BufferLayout {
        BufferLayout {
            sample_rate: self.sample_rate,
            block_frames: self.block_frames,
            buffer_count: self.buffer_count,
        }
    }

    /// Audio held by the device when every buffer is full.
    pub fn latency(&self) -> Duration {
        let samples = (self.block_frames * self.buffer_count) as f64;
        Duration::from_secs_f64(samples / self.sample_rate.max(1) as f64)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            block_frames: 512,
            buffer_count: 8,
            reconnect_backoff: Duration::from_millis(500),
            health_poll: Duration::from_millis(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelineState {
    Uninitialized = 0,
    Streaming = 1,
    Recovering = 2,
    Closed = 3,
}

impl PipelineState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => PipelineState::Streaming,
            2 => PipelineState::Recovering,
            3 => PipelineState::Closed,
            _ => PipelineState::Uninitialized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_latency() {
        let config = PipelineConfig::default();
        let ms = config.latency().as_secs_f64() * 1000.0;
        assert!((ms - 92.88).abs() < 0.1, "got {ms} ms");
    }

    #[test]
    fn test_clamped_config() {
        let config = PipelineConfig {
            block_frames: 0,
            buffer_count: 0,
            reconnect_backoff: Duration::ZERO,
            ..Default::default()
        }
        .clamped();
        assert_eq!(config.block_frames, 1);
        assert_eq!(config.buffer_count, 2);
        assert!(config.reconnect_backoff > Duration::ZERO);
    }

    #[test]
    fn test_state_encoding() {
        for state in [
            PipelineState::Uninitialized,
            PipelineState::Streaming,
            PipelineState::Recovering,
            PipelineState::Closed,
        ] {
            assert_eq!(PipelineState::from_u8(state as u8), state);
        }
    }
}
