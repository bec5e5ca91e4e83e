use tokio::sync::mpsc;

use crate::error::AgentResult;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for audio capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (frames are decimated if needed)
    pub target_sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Frame size in milliseconds
    pub buffer_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // 16kHz for transcription
            target_channels: 1,        // Mono
            buffer_duration_ms: 100,   // 100ms frames
        }
    }
}

/// Capture device trait
///
/// A device is the only exclusive resource in the system: it is opened once per
/// recording and must be released before it can be opened again.
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Request access and start the device stream
    ///
    /// Returns a channel receiver that yields frames until the device is released
    /// or runs out of input. Fails with `PermissionDenied`, `DeviceUnavailable` or
    /// `Unknown`.
    async fn open(&mut self, config: &CaptureConfig) -> AgentResult<mpsc::Receiver<AudioFrame>>;

    /// Stop every underlying track and release the device
    async fn release(&mut self) -> AgentResult<()>;

    /// Check if the device is currently held
    fn is_open(&self) -> bool;

    /// Get device name for logging
    fn name(&self) -> &str;
}
