//! Audio output trait and error types.

use dw_engine::Frame;

/// Failures raised while bringing up or driving the output device.
#[derive(Debug)]
pub enum AudioError {
    /// A device exists but refused its configuration.
    DeviceInit(String),
    /// The host rejected stream construction.
    StreamCreate(String),
    /// The stream would not play or pause.
    Playback(String),
    /// The host has no output device at all.
    NoDevice,
}

impl std::fmt::Display for AudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioError::DeviceInit(msg) => write!(f, "device setup failed: {}", msg),
            AudioError::StreamCreate(msg) => write!(f, "stream construction failed: {}", msg),
            AudioError::Playback(msg) => write!(f, "playback control failed: {}", msg),
            AudioError::NoDevice => write!(f, "no output device available"),
        }
    }
}

impl std::error::Error for AudioError {}

/// An output the render loop can feed one frame at a time.
pub trait AudioOutput {
    /// Sample rate the device is running at.
    fn sample_rate(&self) -> u32;

    /// Offer one frame. `Err` returns the frame when the output has
    /// no room; the caller decides whether to wait or drop.
    fn try_write(&mut self, frame: Frame) -> Result<(), Frame>;

    /// Start playback.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop playback.
    fn stop(&mut self) -> Result<(), AudioError>;
}
