use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, error, info, trace, warn};

use crate::error::{DeviceError, PipelineError};
use crate::output::{
    device::{BlockSource, DeviceFactory, OutputDevice},
    signal::{StreamSignal, StreamWaker},
    PipelineConfig, PipelineState,
};

/// Owns the streaming thread.
///
/// Dropping the pipeline shuts it down: the thread is signalled, the
/// device released and the thread joined before `drop` returns.
pub struct AudioOutputPipeline {
    signal: Arc<StreamSignal>,
    thread: Option<JoinHandle<()>>,
    config: PipelineConfig,
}

impl AudioOutputPipeline {
    /// Spawn the streaming thread.
    ///
    /// The device is opened on that thread, so a missing device is not an
    /// error here: the pipeline starts in Recovering and keeps retrying.
    pub fn start<F, S>(factory: F, source: S, config: PipelineConfig) -> Result<Self, PipelineError>
    where
        F: DeviceFactory,
        S: BlockSource,
    {
        let config = config.clamped();
        let signal = Arc::new(StreamSignal::new());

        let thread_signal = signal.clone();
        let thread = thread::Builder::new()
            .name("audio-out".into())
            .spawn(move || StreamWorker::new(factory, source, config, thread_signal).run())?;

        info!(
            "output pipeline started: {} Hz, {} x {} frames ({:.1} ms)",
            config.sample_rate,
            config.buffer_count,
            config.block_frames,
            config.latency().as_secs_f64() * 1000.0
        );

        Ok(Self {
            signal,
            thread: Some(thread),
            config,
        })
    }

    pub fn waker(&self) -> StreamWaker {
        StreamWaker::new(self.signal.clone())
    }

    pub fn state(&self) -> PipelineState {
        self.signal.state()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_alive(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the streaming thread and wait for it. Idempotent.
    pub fn shutdown(&mut self) {
        self.signal.close();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("streaming thread panicked");
                self.signal.set_state(PipelineState::Closed);
            }
        }
    }
}

impl Drop for AudioOutputPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

enum Pump {
    Busy,
    Idle,
}

/// Everything the streaming thread owns. Built on that thread, so the
/// device never has to cross threads.
struct StreamWorker<F: DeviceFactory, S> {
    factory: F,
    source: S,
    config: PipelineConfig,
    signal: Arc<StreamSignal>,
    device: Option<F::Device>,
    buffers: Vec<Vec<i16>>,
    next_buffer: usize,
}

impl<F: DeviceFactory, S: BlockSource> StreamWorker<F, S> {
    fn new(factory: F, source: S, config: PipelineConfig, signal: Arc<StreamSignal>) -> Self {
        Self {
            factory,
            source,
            config,
            signal,
            device: None,
            buffers: vec![vec![0; config.block_frames]; config.buffer_count],
            next_buffer: 0,
        }
    }

    fn run(mut self) {
        debug!("streaming thread started");
        let mut rendering = false;

        while !self.signal.is_closed() {
            if self.device.is_none() {
                if let Err(err) = self.initialize() {
                    self.recover(err);
                    continue;
                }
            }

            if !rendering {
                trace!("waiting for work");
                if !self.signal.wait_for_work() {
                    break;
                }
                rendering = true;
            }

            match self.pump() {
                Ok(Pump::Busy) => {
                    if !self.signal.sleep(self.config.health_poll) {
                        break;
                    }
                }
                Ok(Pump::Idle) => {
                    trace!("source idle");
                    rendering = false;
                }
                Err(err) => self.recover(err),
            }
        }

        self.release();
        self.signal.set_state(PipelineState::Closed);
        debug!("streaming thread stopped");
    }

    /// Open the device, prime every buffer with silence and start it.
    fn initialize(&mut self) -> Result<(), DeviceError> {
        let mut device = self.factory.open(self.config.layout())?;

        for buffer in self.buffers.iter_mut() {
            buffer.fill(0);
            device.queue(buffer)?;
        }
        device.play()?;

        self.device = Some(device);
        self.next_buffer = 0;
        self.signal.set_state(PipelineState::Streaming);
        info!("output device open");
        Ok(())
    }

    /// Refill whatever the device has drained.
    fn pump(&mut self) -> Result<Pump, DeviceError> {
        let Some(device) = self.device.as_mut() else {
            return Err(DeviceError::Disconnected);
        };
        if !device.is_connected() {
            return Err(DeviceError::Disconnected);
        }

        let underruns = device.take_underruns();
        if underruns > 0 {
            warn!("{}", DeviceError::BufferUnderrun(underruns));
        }

        let drained = device.drained_buffers().min(self.buffers.len());
        for _ in 0..drained {
            let buffer = &mut self.buffers[self.next_buffer];
            if !self.source.fill_block(buffer) {
                return Ok(Pump::Idle);
            }
            device.queue(buffer)?;
            self.next_buffer = (self.next_buffer + 1) % self.buffers.len();
        }

        if !device.is_playing() {
            device.play()?;
        }
        Ok(Pump::Busy)
    }

    /// Release the device and reopen it, backing off between attempts
    /// until one succeeds or the pipeline closes.
    fn recover(&mut self, err: DeviceError) {
        warn!("output device failed: {err}; reconnecting");
        self.signal.set_state(PipelineState::Recovering);
        self.release();

        let mut attempts = 0u32;
        loop {
            if !self.signal.sleep(self.config.reconnect_backoff) {
                return;
            }
            attempts += 1;
            match self.initialize() {
                Ok(()) => {
                    info!("output device recovered after {attempts} attempt(s)");
                    return;
                }
                Err(err) => {
                    self.release();
                    warn!("reconnect attempt {attempts} failed: {err}");
                }
            }
        }
    }

    fn release(&mut self) {
        if self.device.take().is_some() {
            debug!("output device released");
        }
    }
}
