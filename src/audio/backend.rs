use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Fixed session audio format: 16kHz, 16-bit signed little-endian, mono.
/// Everything appended to the live buffer has already been converted to
/// this format.
pub const SESSION_SAMPLE_RATE: u32 = 16000;
pub const SESSION_CHANNELS: u16 = 1;
pub const BYTES_PER_SAMPLE: u32 = 2;
pub const BYTES_PER_SECOND: u32 =
    SESSION_SAMPLE_RATE * SESSION_CHANNELS as u32 * BYTES_PER_SAMPLE;

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

/// Configuration for audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Target sample rate (frames are decimated down if the device is faster)
    pub target_sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Buffer size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: SESSION_SAMPLE_RATE,
            target_channels: SESSION_CHANNELS,
            buffer_duration_ms: 100, // 100ms buffers
        }
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - Microphone: cpal default input device (all platforms)
/// - File: read frames from a WAV file (for testing/batch processing)
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames. The
    /// channel closing before `stop` was called means the device was lost.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio source type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AudioSource {
    /// Microphone input (all platforms)
    Microphone,
    /// WAV file input (for testing/batch processing)
    File(PathBuf),
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create audio backend for the requested source
    pub fn create(
        source: AudioSource,
        config: AudioBackendConfig,
    ) -> Result<Box<dyn AudioBackend>> {
        match source {
            AudioSource::Microphone => {
                let backend = super::microphone::MicrophoneBackend::new(config)?;
                Ok(Box::new(backend))
            }

            AudioSource::File(path) => {
                let backend = super::file::FileBackend::new(path, config)?;
                Ok(Box::new(backend))
            }
        }
    }
}
