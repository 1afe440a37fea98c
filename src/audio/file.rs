use anyhow::{Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::info;

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};

/// WAV file contents loaded into memory
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

/// Audio backend that replays a WAV file as capture frames
///
/// All frames are delivered as fast as the consumer drains them, then
/// the frame channel is held open until `stop` — so a finished file
/// looks like a microphone that has gone silent, not a lost device.
pub struct FileBackend {
    path: PathBuf,
    config: AudioBackendConfig,
    hold_tx: Option<mpsc::Sender<AudioFrame>>,
    capturing: bool,
}

impl FileBackend {
    pub fn new(path: PathBuf, config: AudioBackendConfig) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Audio file does not exist: {}", path.display());
        }

        Ok(Self {
            path,
            config,
            hold_tx: None,
            capturing: false,
        })
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing {
            anyhow::bail!("Already capturing");
        }

        let audio = AudioFile::open(&self.path)?;

        let samples_per_frame = (audio.sample_rate as u64
            * audio.channels as u64
            * self.config.buffer_duration_ms
            / 1000)
            .max(1) as usize;

        let frame_count = audio.samples.len().div_ceil(samples_per_frame);

        // Capacity covers every frame so the sends below never block
        let (tx, rx) = mpsc::channel::<AudioFrame>(frame_count.max(1) + 1);

        for (index, window) in audio.samples.chunks(samples_per_frame).enumerate() {
            let timestamp_ms = index as u64 * samples_per_frame as u64 * 1000
                / (audio.sample_rate as u64 * audio.channels as u64);

            let frame = AudioFrame {
                samples: window.to_vec(),
                sample_rate: audio.sample_rate,
                channels: audio.channels,
                timestamp_ms,
            };

            tx.try_send(frame)
                .context("File backend frame channel unexpectedly full")?;
        }

        info!(
            "File backend queued {} frames from {}",
            frame_count,
            self.path.display()
        );

        // Keep one sender alive so the channel stays open until stop()
        self.hold_tx = Some(tx);
        self.capturing = true;

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.hold_tx = None;
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "WAV file"
    }
}
