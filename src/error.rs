use thiserror::Error;

/// Failures reported by an output device.
///
/// None of these are fatal to the streaming thread: the pipeline tears the
/// device down and reopens it.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no audio output device available")]
    NoDevice,

    #[error("failed to query output config: {0}")]
    Config(String),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to build output stream: {0}")]
    Build(String),

    #[error("failed to start playback: {0}")]
    Play(String),

    #[error("output device disconnected")]
    Disconnected,

    #[error("output queue has no room for a {0}-sample block")]
    QueueFull(usize),

    /// Not fatal. Reported for logging only.
    #[error("buffer underrun ({0} callbacks ran dry)")]
    BufferUnderrun(usize),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to spawn streaming thread")]
    Spawn(#[from] std::io::Error),
}
