use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SampleRate, SizedSample, StreamConfig};
use log::{debug, error, info};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::error::DeviceError;
use crate::output::device::{BufferLayout, DeviceFactory, OutputDevice};

/// Opens the system output device through cpal.
#[derive(Debug, Clone, Default)]
pub struct CpalDeviceFactory {
    device_name: Option<String>,
}

impl CpalDeviceFactory {
    /// Use the host's default output device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the output device whose name matches `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }

    fn find_device(&self) -> Result<cpal::Device, DeviceError> {
        let host = cpal::default_host();
        match &self.device_name {
            None => host.default_output_device().ok_or(DeviceError::NoDevice),
            Some(wanted) => host
                .output_devices()
                .map_err(|e| DeviceError::Config(e.to_string()))?
                .find(|d| d.name().is_ok_and(|name| &name == wanted))
                .ok_or(DeviceError::NoDevice),
        }
    }
}

impl DeviceFactory for CpalDeviceFactory {
    type Device = CpalDevice;

    fn open(&mut self, layout: BufferLayout) -> Result<CpalDevice, DeviceError> {
        let device = self.find_device()?;
        CpalDevice::open(&device, layout)
    }
}

/// A cpal output stream fed from a ring of mono i16 samples.
///
/// The ring holds `buffer_count` blocks. A "drained buffer" is a block's
/// worth of free space in it. The callback duplicates each mono sample to
/// every output channel and converts it to the device's sample format.
pub struct CpalDevice {
    stream: cpal::Stream,
    producer: Producer<i16>,
    block_frames: usize,
    connected: Arc<AtomicBool>,
    underruns: Arc<AtomicUsize>,
    playing: bool,
}

impl CpalDevice {
    pub fn open(device: &cpal::Device, layout: BufferLayout) -> Result<Self, DeviceError> {
        let name = device.name().unwrap_or_else(|_| "<unnamed>".into());
        let default = device
            .default_output_config()
            .map_err(|e| DeviceError::Config(e.to_string()))?;

        let rate = SampleRate(layout.sample_rate);
        let supported = device
            .supported_output_configs()
            .map_err(|e| DeviceError::Config(e.to_string()))?
            .filter(|c| c.min_sample_rate() <= rate && rate <= c.max_sample_rate())
            .max_by_key(|c| {
                (
                    c.sample_format() == default.sample_format(),
                    c.channels() == default.channels(),
                )
            })
            .ok_or_else(|| {
                DeviceError::Config(format!("{name} does not support {} Hz", layout.sample_rate))
            })?
            .with_sample_rate(rate);

        let config = StreamConfig {
            channels: supported.channels(),
            sample_rate: rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let (producer, consumer) = RingBuffer::<i16>::new(layout.capacity());
        let connected = Arc::new(AtomicBool::new(true));
        let underruns = Arc::new(AtomicUsize::new(0));

        let stream = match supported.sample_format() {
            SampleFormat::F32 => {
                build_stream::<f32>(device, &config, consumer, &connected, &underruns)?
            }
            SampleFormat::I16 => {
                build_stream::<i16>(device, &config, consumer, &connected, &underruns)?
            }
            SampleFormat::U16 => {
                build_stream::<u16>(device, &config, consumer, &connected, &underruns)?
            }
            other => return Err(DeviceError::UnsupportedFormat(format!("{other:?}"))),
        };

        info!(
            "opened {name}: {} Hz, {} ch, {:?}",
            layout.sample_rate,
            config.channels,
            supported.sample_format()
        );

        Ok(Self {
            stream,
            producer,
            block_frames: layout.block_frames,
            connected,
            underruns,
            playing: false,
        })
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut consumer: Consumer<i16>,
    connected: &Arc<AtomicBool>,
    underruns: &Arc<AtomicUsize>,
) -> Result<cpal::Stream, DeviceError>
where
    T: SizedSample + FromSample<i16>,
{
    let channels = config.channels as usize;
    let underruns = underruns.clone();
    let connected = connected.clone();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                let available = consumer.slots().min(frames);

                if let Ok(chunk) = consumer.read_chunk(available) {
                    let (first, second) = chunk.as_slices();
                    // Copy to output (mono to all channels)
                    for (frame, &sample) in data
                        .chunks_mut(channels)
                        .zip(first.iter().chain(second))
                    {
                        frame.fill(T::from_sample(sample));
                    }
                    chunk.commit_all();
                }

                data[available * channels..].fill(T::EQUILIBRIUM);
                // An empty ring is just silence; running dry mid-block is not.
                if available > 0 && available < frames {
                    underruns.fetch_add(1, Ordering::Relaxed);
                }
            },
            move |err| {
                error!("output stream error: {err}");
                connected.store(false, Ordering::Release);
            },
            None,
        )
        .map_err(|e| DeviceError::Build(e.to_string()))
}

impl OutputDevice for CpalDevice {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn drained_buffers(&mut self) -> usize {
        self.producer.slots() / self.block_frames
    }

    fn queue(&mut self, block: &[i16]) -> Result<(), DeviceError> {
        let mut chunk = self
            .producer
            .write_chunk(block.len())
            .map_err(|_| DeviceError::QueueFull(block.len()))?;
        let (first, second) = chunk.as_mut_slices();
        let split = first.len();
        first.copy_from_slice(&block[..split]);
        second.copy_from_slice(&block[split..]);
        chunk.commit_all();
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn play(&mut self) -> Result<(), DeviceError> {
        self.stream
            .play()
            .map_err(|e| DeviceError::Play(e.to_string()))?;
        self.playing = true;
        Ok(())
    }

    fn take_underruns(&mut self) -> usize {
        self.underruns.swap(0, Ordering::Relaxed)
    }
}

impl Drop for CpalDevice {
    fn drop(&mut self) {
        if let Err(err) = self.stream.pause() {
            debug!("pause on release failed: {err}");
        }
    }
}
