// Microphone audio backend using cpal
//
// cpal streams are not Send, so the stream lives on a dedicated capture
// thread. The thread opens the default input device, forwards converted
// frames over a bounded channel, and parks until the stop flag flips.
// A stream error flips the same flag, so the frame channel closing
// before stop() is the device-loss signal the session layer relies on.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};

pub struct MicrophoneBackend {
    config: AudioBackendConfig,
    stop_flag: Arc<AtomicBool>,
    capture_thread: Option<thread::JoinHandle<()>>,
    capturing: bool,
}

impl MicrophoneBackend {
    pub fn new(config: AudioBackendConfig) -> Result<Self> {
        if !microphone_available() {
            anyhow::bail!("No audio input device available");
        }

        info!(
            "Microphone backend initialized ({}Hz, {} channels target)",
            config.target_sample_rate, config.target_channels
        );

        Ok(Self {
            config,
            stop_flag: Arc::new(AtomicBool::new(false)),
            capture_thread: None,
            capturing: false,
        })
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing {
            anyhow::bail!("Already capturing");
        }

        info!(
            "Starting microphone capture (target {}Hz, {} channels)",
            self.config.target_sample_rate, self.config.target_channels
        );

        let (frame_tx, frame_rx) = mpsc::channel::<AudioFrame>(100);
        let (setup_tx, setup_rx) = std_mpsc::channel::<Result<()>>();

        self.stop_flag.store(false, Ordering::SeqCst);
        let stop_flag = Arc::clone(&self.stop_flag);

        let handle = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                capture_thread_main(frame_tx, setup_tx, stop_flag);
            })
            .context("Failed to spawn capture thread")?;

        // Wait for the thread to report whether the device opened
        match setup_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e.context("Failed to open audio input device"));
            }
            Err(_) => {
                let _ = handle.join();
                anyhow::bail!("Capture thread exited before reporting device state");
            }
        }

        self.capture_thread = Some(handle);
        self.capturing = true;

        info!("Microphone capture started successfully");

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing {
            return Ok(());
        }

        info!("Stopping microphone capture");

        self.stop_flag.store(true, Ordering::SeqCst);

        if let Some(handle) = self.capture_thread.take() {
            if handle.join().is_err() {
                warn!("Capture thread panicked during shutdown");
            }
        }

        self.capturing = false;

        info!("Microphone capture stopped");

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

impl Drop for MicrophoneBackend {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.capture_thread.take() {
            let _ = handle.join();
        }
    }
}

/// Check whether any audio input device exists, without opening a stream.
pub fn microphone_available() -> bool {
    cpal::default_host().default_input_device().is_some()
}

/// Names of all input devices on the default host, for device pickers.
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .context("Failed to enumerate input devices")?;

    let mut names = Vec::new();
    for device in devices {
        names.push(device.name().unwrap_or_else(|_| "<unknown>".to_string()));
    }

    Ok(names)
}

/// Body of the capture thread: owns the cpal stream for its entire life.
fn capture_thread_main(
    frame_tx: mpsc::Sender<AudioFrame>,
    setup_tx: std_mpsc::Sender<Result<()>>,
    stop_flag: Arc<AtomicBool>,
) {
    let setup = open_input_stream(frame_tx, Arc::clone(&stop_flag));

    let stream = match setup {
        Ok(stream) => {
            let _ = setup_tx.send(Ok(()));
            stream
        }
        Err(e) => {
            let _ = setup_tx.send(Err(e));
            return;
        }
    };

    // Park until asked to stop or the stream errors out. Dropping the
    // stream on exit closes the frame channel, which downstream reads
    // as end-of-capture (or device loss, if stop was never requested).
    while !stop_flag.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(50));
    }

    drop(stream);
}

fn open_input_stream(
    frame_tx: mpsc::Sender<AudioFrame>,
    stop_flag: Arc<AtomicBool>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    let device_name = device.name().unwrap_or_else(|_| "<unknown>".to_string());
    let default_config = device
        .default_input_config()
        .context("Failed to get default input config")?;

    info!(
        "Using input device: {} ({}Hz, {} channels, {:?})",
        device_name,
        default_config.sample_rate().0,
        default_config.channels(),
        default_config.sample_format()
    );

    let sample_rate = default_config.sample_rate().0;
    let channels = default_config.channels();
    let stream_config: cpal::StreamConfig = default_config.clone().into();

    // Stream errors flip the stop flag so the parked thread drops the
    // stream and closes the channel.
    let err_flag = Arc::clone(&stop_flag);
    let err_fn = move |err: cpal::StreamError| {
        warn!("Audio input stream error: {}", err);
        err_flag.store(true, Ordering::SeqCst);
    };

    // Samples delivered so far, for frame timestamps
    let samples_seen = Arc::new(AtomicU64::new(0));

    let stream = match default_config.sample_format() {
        cpal::SampleFormat::I16 => {
            let tx = frame_tx.clone();
            let seen = Arc::clone(&samples_seen);
            device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    forward_frame(data.to_vec(), sample_rate, channels, &tx, &seen);
                },
                err_fn,
                None,
            )
        }
        cpal::SampleFormat::F32 => {
            let tx = frame_tx.clone();
            let seen = Arc::clone(&samples_seen);
            device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let samples: Vec<i16> = data
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                        .collect();
                    forward_frame(samples, sample_rate, channels, &tx, &seen);
                },
                err_fn,
                None,
            )
        }
        other => anyhow::bail!("Unsupported input sample format: {:?}", other),
    }
    .context("Failed to build input stream")?;

    stream.play().context("Failed to start input stream")?;

    Ok(stream)
}

/// Push one callback's worth of samples into the frame channel.
///
/// The audio callback must never block, so a full channel drops the
/// frame rather than waiting for the consumer.
fn forward_frame(
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
    frame_tx: &mpsc::Sender<AudioFrame>,
    samples_seen: &AtomicU64,
) {
    let sample_count = samples.len() as u64;
    let seen = samples_seen.fetch_add(sample_count, Ordering::Relaxed);
    let timestamp_ms = seen * 1000 / (sample_rate as u64 * channels as u64);

    let frame = AudioFrame {
        samples,
        sample_rate,
        channels,
        timestamp_ms,
    };

    if let Err(e) = frame_tx.try_send(frame) {
        match e {
            mpsc::error::TrySendError::Full(_) => {
                warn!("Frame channel full, dropping {} samples", sample_count);
            }
            mpsc::error::TrySendError::Closed(_) => {
                // Consumer gone; the parked thread will notice stop shortly
            }
        }
    }
}
