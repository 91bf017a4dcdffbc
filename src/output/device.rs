use crate::error::DeviceError;

/// Shape of the device's buffer queue, handed to the factory on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLayout {
    pub sample_rate: u32,
    pub block_frames: usize,
    pub buffer_count: usize,
}

impl BufferLayout {
    /// Samples the device can hold across all buffers.
    pub fn capacity(&self) -> usize {
        self.block_frames * self.buffer_count
    }
}

/// A sink for blocks of mono 16-bit PCM.
///
/// Implementations are driven from the streaming thread only and never
/// need to be `Send`.
pub trait OutputDevice {
    /// False once the device has gone away. The pipeline then releases it
    /// and reopens a fresh one.
    fn is_connected(&self) -> bool;

    /// Buffers that finished playing since the last call and can take a
    /// new block.
    fn drained_buffers(&mut self) -> usize;

    /// Hand one block to the device.
    fn queue(&mut self, block: &[i16]) -> Result<(), DeviceError>;

    fn is_playing(&self) -> bool;

    fn play(&mut self) -> Result<(), DeviceError>;

    /// Underruns observed since the last call.
    fn take_underruns(&mut self) -> usize {
        0
    }
}

/// Opens output devices on the streaming thread.
pub trait DeviceFactory: Send + 'static {
    type Device: OutputDevice;

    fn open(&mut self, layout: BufferLayout) -> Result<Self::Device, DeviceError>;
}

impl<F, D> DeviceFactory for F
where
    F: FnMut(BufferLayout) -> Result<D, DeviceError> + Send + 'static,
    D: OutputDevice,
{
    type Device = D;

    fn open(&mut self, layout: BufferLayout) -> Result<D, DeviceError> {
        self(layout)
    }
}

/// Produces the blocks the pipeline plays.
pub trait BlockSource: Send + 'static {
    /// Fill `out` completely and return true, or return false if there is
    /// nothing to play right now.
    fn fill_block(&mut self, out: &mut [i16]) -> bool;
}

impl<F> BlockSource for F
where
    F: FnMut(&mut [i16]) -> bool + Send + 'static,
{
    fn fill_block(&mut self, out: &mut [i16]) -> bool {
        self(out)
    }
}
