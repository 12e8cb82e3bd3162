use anyhow::Result;
use tokio::sync::mpsc;

use crate::error::DeviceAccessError;

/// One fixed-duration slice of captured audio.
///
/// Samples are normalized mono f32 in [-1.0, 1.0]. The timestamp is derived
/// from the number of samples emitted so far, not the wall clock, so a chunk
/// stream is reproducible. Immutable once produced.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (fixed: 1)
    pub channels: u16,
    /// Milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for audio capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (device input is downsampled if needed)
    pub sample_rate: u32,
    /// Target channel count (1 = mono)
    pub channels: u16,
    /// Duration of each emitted chunk in milliseconds
    pub chunk_duration_ms: u64,
}

impl CaptureConfig {
    /// Samples per emitted chunk.
    pub fn chunk_samples(&self) -> usize {
        (self.sample_rate as u64 * self.chunk_duration_ms / 1000) as usize
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,    // what the service expects for input
            channels: 1,           // Mono
            chunk_duration_ms: 500, // One frame per half second
        }
    }
}

/// Audio capture source trait
///
/// Implementations:
/// - `MicrophoneSource`: cpal default input device
/// - `ScriptedSource`: replays a prepared chunk list (tests)
#[async_trait::async_trait]
pub trait CaptureSource: Send {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio chunks. Denied or
    /// missing hardware surfaces as `DeviceAccessError`.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, DeviceAccessError>;

    /// Stop capturing and release the device. Idempotent: stopping an
    /// already-stopped source is a no-op.
    async fn stop(&mut self) -> Result<()>;

    /// Check if the source is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get source name for logging
    fn name(&self) -> &str;
}
