use super::config::SessionConfig;
use super::stats::{SessionState, SessionStats};
use crate::audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, LiveAudioBuffer,
    SESSION_CHANNELS, SESSION_SAMPLE_RATE,
};
use crate::transcription::{ChunkDispatcher, ChunkScheduler, TranscriptEvent, TranscriptionBackend};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// How long a capture-loop poll waits before re-checking the stop flag
const FRAME_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Why a session could not start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("a recording session is already active")]
    AlreadyActive,
    #[error("no compatible audio input device is available")]
    DeviceUnavailable,
}

/// Why a session could not stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StopError {
    #[error("no recording session is active")]
    NotActive,
}

/// Owns the lifecycle of a live transcription session
///
/// Ties the capture loop, the live buffer and the chunk scheduler
/// together: `start` spins them up, `stop` winds them down and drains
/// any unprocessed tail, `force_stop` tears everything down without
/// draining. Exactly one session can be active at a time; per-chunk
/// outcomes arrive on the event channel returned by `new`.
pub struct SessionController {
    config: SessionConfig,

    /// Opaque speech-to-text service
    transcription: Arc<dyn TranscriptionBackend>,

    /// Sender side of the caller's transcript event channel
    events_tx: mpsc::Sender<TranscriptEvent>,

    /// Lifecycle state; all transitions happen under this lock
    state: Arc<StdMutex<SessionState>>,

    /// Cleared to make the capture loop and scheduler wind down
    capturing: Arc<AtomicBool>,

    /// Audio captured so far in the current session
    buffer: Arc<LiveAudioBuffer>,

    /// Next chunk sequence number (doubles as the dispatched-chunk count)
    sequence: Arc<AtomicU64>,

    /// When the current session started
    started_at: StdMutex<Option<DateTime<Utc>>>,

    /// Scheduler for the current session (rebuilt on every start)
    scheduler: StdMutex<Option<Arc<ChunkScheduler>>>,

    /// Handle for the capture task
    capture_task: Mutex<Option<JoinHandle<()>>>,

    /// Handle for the scheduler task
    scheduler_task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    /// Create a controller and the receiver for its transcript events
    pub fn new(
        config: SessionConfig,
        transcription: Arc<dyn TranscriptionBackend>,
    ) -> (Self, mpsc::Receiver<TranscriptEvent>) {
        let (events_tx, events_rx) = mpsc::channel(config.event_capacity);

        let controller = Self {
            config,
            transcription,
            events_tx,
            state: Arc::new(StdMutex::new(SessionState::Idle)),
            capturing: Arc::new(AtomicBool::new(false)),
            buffer: Arc::new(LiveAudioBuffer::new()),
            sequence: Arc::new(AtomicU64::new(0)),
            started_at: StdMutex::new(None),
            scheduler: StdMutex::new(None),
            capture_task: Mutex::new(None),
            scheduler_task: Mutex::new(None),
        };

        (controller, events_rx)
    }

    /// Start recording and transcribing
    pub async fn start(&self) -> Result<(), StartError> {
        {
            let mut state = self.state.lock().expect("state lock poisoned");
            if *state != SessionState::Idle {
                return Err(StartError::AlreadyActive);
            }
            // Reserve the session before any fallible setup
            *state = SessionState::Capturing;
        }

        match self.start_inner().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.set_state(SessionState::Idle);
                Err(e)
            }
        }
    }

    async fn start_inner(&self) -> Result<(), StartError> {
        info!("Starting session: {}", self.config.session_id);

        let mut audio_backend = AudioBackendFactory::create(
            self.config.source.clone(),
            AudioBackendConfig::default(),
        )
        .map_err(|e| {
            warn!("Audio backend unavailable: {}", e);
            StartError::DeviceUnavailable
        })?;

        let frame_rx = audio_backend.start().await.map_err(|e| {
            warn!("Failed to open capture device: {}", e);
            StartError::DeviceUnavailable
        })?;

        // Fresh per-session state
        self.buffer.reset();
        self.sequence.store(0, Ordering::SeqCst);
        self.capturing.store(true, Ordering::SeqCst);
        {
            let mut started = self.started_at.lock().expect("started_at lock poisoned");
            *started = Some(Utc::now());
        }

        let dispatcher = ChunkDispatcher::new(
            Arc::clone(&self.transcription),
            self.config.language.clone(),
            self.config.request_timeout,
            self.events_tx.clone(),
        );

        let scheduler = Arc::new(ChunkScheduler::new(
            Arc::clone(&self.buffer),
            dispatcher,
            Arc::clone(&self.sequence),
            Arc::clone(&self.capturing),
            self.config.overlap,
            self.config.min_chunk,
        ));

        {
            let mut slot = self.scheduler.lock().expect("scheduler lock poisoned");
            *slot = Some(Arc::clone(&scheduler));
        }

        // Capture task: owns the audio backend for the session's lifetime
        let buffer = Arc::clone(&self.buffer);
        let capturing = Arc::clone(&self.capturing);
        let state = Arc::clone(&self.state);
        let events = self.events_tx.clone();

        let capture_task = tokio::spawn(async move {
            Self::capture_loop(audio_backend, frame_rx, buffer, capturing, state, events).await;
        });

        let period = self.config.chunk_interval;
        let scheduler_task = tokio::spawn(async move {
            scheduler.run(period).await;
        });

        {
            let mut handle = self.capture_task.lock().await;
            *handle = Some(capture_task);
        }
        {
            let mut handle = self.scheduler_task.lock().await;
            *handle = Some(scheduler_task);
        }

        info!("Session started: {}", self.config.session_id);

        Ok(())
    }

    /// Stop recording, drain the unprocessed tail, return final stats
    ///
    /// When this returns, every chunk of the session has been dispatched;
    /// the drain chunk's own outcome may still be pending if the bounded
    /// wait expired.
    pub async fn stop(&self) -> Result<SessionStats, StopError> {
        {
            let mut state = self.state.lock().expect("state lock poisoned");
            if *state != SessionState::Capturing {
                return Err(StopError::NotActive);
            }
            *state = SessionState::Draining;
        }

        info!("Stopping session: {}", self.config.session_id);

        // No more scheduler ticks, and the capture loop winds down
        self.capturing.store(false, Ordering::SeqCst);

        {
            let mut handle = self.scheduler_task.lock().await;
            if let Some(task) = handle.take() {
                task.abort();
                let _ = task.await;
            }
        }

        // Wait for the capture loop to release the device
        {
            let mut handle = self.capture_task.lock().await;
            if let Some(task) = handle.take() {
                if let Err(e) = task.await {
                    if !e.is_cancelled() {
                        error!("Capture task panicked: {}", e);
                    }
                }
            }
        }

        // One drain pass over whatever the scheduler never dispatched
        let scheduler = {
            let slot = self.scheduler.lock().expect("scheduler lock poisoned");
            slot.clone()
        };

        if let Some(scheduler) = scheduler {
            if let Some(chunk) = scheduler.take_final_chunk() {
                info!(
                    "Draining final chunk #{} ({} bytes)",
                    chunk.sequence,
                    chunk.len()
                );
                scheduler
                    .dispatch_final(chunk, self.config.drain_timeout)
                    .await;
            }
        }

        self.set_state(SessionState::Idle);

        info!("Session stopped: {}", self.config.session_id);

        Ok(self.stats())
    }

    /// Tear the session down immediately, discarding the unprocessed tail
    ///
    /// Safe to call in any state, any number of times. In-flight backend
    /// calls for already-dispatched chunks are abandoned, not awaited.
    pub async fn force_stop(&self) {
        info!("Force-stopping session");

        self.capturing.store(false, Ordering::SeqCst);

        {
            let mut handle = self.scheduler_task.lock().await;
            if let Some(task) = handle.take() {
                task.abort();
            }
        }
        {
            let mut handle = self.capture_task.lock().await;
            if let Some(task) = handle.take() {
                // Dropping the task drops the audio backend, which
                // releases the device
                task.abort();
            }
        }
        {
            let mut slot = self.scheduler.lock().expect("scheduler lock poisoned");
            *slot = None;
        }

        self.set_state(SessionState::Idle);
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state.lock().expect("state lock poisoned")
    }

    /// Number of chunks dispatched for transcription so far this session
    pub fn chunks_processed(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Seconds of audio captured so far this session
    pub fn current_duration_seconds(&self) -> f64 {
        self.buffer.duration_seconds()
    }

    /// Current session statistics
    pub fn stats(&self) -> SessionStats {
        let started_at = *self.started_at.lock().expect("started_at lock poisoned");

        SessionStats {
            state: self.state(),
            started_at,
            duration_secs: self.buffer.duration_seconds(),
            chunks_dispatched: self.chunks_processed(),
            buffer_bytes: self.buffer.len(),
        }
    }

    fn set_state(&self, next: SessionState) {
        let mut state = self.state.lock().expect("state lock poisoned");
        *state = next;
    }

    /// Pulls frames from the audio backend into the live buffer until
    /// the session winds down or the device disappears
    async fn capture_loop(
        mut backend: Box<dyn AudioBackend>,
        mut frames: mpsc::Receiver<AudioFrame>,
        buffer: Arc<LiveAudioBuffer>,
        capturing: Arc<AtomicBool>,
        state: Arc<StdMutex<SessionState>>,
        events: mpsc::Sender<TranscriptEvent>,
    ) {
        info!("Capture loop started ({})", backend.name());

        let mut device_lost = false;

        loop {
            if !capturing.load(Ordering::SeqCst) {
                break;
            }

            // Bounded wait so a silent device never delays shutdown by
            // more than one poll interval
            match timeout(FRAME_POLL_INTERVAL, frames.recv()).await {
                Ok(Some(frame)) => {
                    let processed =
                        Self::process_frame(frame, SESSION_SAMPLE_RATE, SESSION_CHANNELS);

                    let pcm_bytes: Vec<u8> = processed
                        .samples
                        .iter()
                        .flat_map(|s| s.to_le_bytes())
                        .collect();

                    buffer.append(&pcm_bytes);
                }
                Ok(None) => {
                    // Channel closed without a stop request: device gone
                    if capturing.load(Ordering::SeqCst) {
                        device_lost = true;
                    }
                    break;
                }
                Err(_) => {
                    // No frame this interval; re-check the stop flag
                }
            }
        }

        if let Err(e) = backend.stop().await {
            error!("Failed to stop audio backend: {}", e);
        }

        if device_lost {
            warn!("Capture device lost mid-session, ending session");

            // Scheduler ticks become no-ops; no drain pass for a dead device
            capturing.store(false, Ordering::SeqCst);
            {
                let mut state = state.lock().expect("state lock poisoned");
                *state = SessionState::Idle;
            }

            let _ = events
                .send(TranscriptEvent::DeviceLost {
                    reason: "audio input device disconnected".to_string(),
                })
                .await;
        }

        info!("Capture loop stopped");
    }

    /// Process audio frame: downsample and convert to the session format
    fn process_frame(
        frame: AudioFrame,
        target_sample_rate: u32,
        target_channels: u16,
    ) -> AudioFrame {
        let mut processed = frame;

        if processed.channels != target_channels && target_channels == 1 {
            processed = Self::to_mono(processed);
        }

        if processed.sample_rate != target_sample_rate {
            processed = Self::downsample_frame(processed, target_sample_rate);
        }

        processed
    }

    /// Downsample audio frame by decimation
    fn downsample_frame(frame: AudioFrame, target_rate: u32) -> AudioFrame {
        if frame.sample_rate == target_rate {
            return frame;
        }

        let ratio = frame.sample_rate / target_rate;
        if ratio <= 1 {
            return frame; // Can't upsample
        }

        // Decimate: take every Nth sample
        let downsampled: Vec<i16> = frame
            .samples
            .iter()
            .step_by(ratio as usize)
            .copied()
            .collect();

        AudioFrame {
            samples: downsampled,
            sample_rate: target_rate,
            channels: frame.channels,
            timestamp_ms: frame.timestamp_ms,
        }
    }

    /// Fold interleaved channels down to mono by summing with clipping
    fn to_mono(frame: AudioFrame) -> AudioFrame {
        if frame.channels <= 1 {
            return frame;
        }

        let channels = frame.channels as usize;
        let mut mono_samples = Vec::with_capacity(frame.samples.len() / channels);

        for group in frame.samples.chunks_exact(channels) {
            let sum: i32 = group.iter().map(|&s| s as i32).sum();
            let mono = sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
            mono_samples.push(mono);
        }

        AudioFrame {
            samples: mono_samples,
            sample_rate: frame.sample_rate,
            channels: 1,
            timestamp_ms: frame.timestamp_ms,
        }
    }
}
