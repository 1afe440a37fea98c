use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a transcription session
///
/// Transitions: Idle → Capturing → Draining → Idle. A force-stop or a
/// lost capture device returns to Idle from anywhere, skipping Draining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No session active
    Idle,
    /// Capture loop and chunk scheduler are running
    Capturing,
    /// Capture has stopped; the final drain chunk is being processed
    Draining,
}

/// Statistics about a transcription session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Current lifecycle state
    pub state: SessionState,

    /// When the session started (None before the first start)
    pub started_at: Option<DateTime<Utc>>,

    /// Seconds of audio captured so far
    pub duration_secs: f64,

    /// Number of chunks dispatched for transcription so far
    pub chunks_dispatched: u64,

    /// Bytes of PCM audio in the live buffer
    pub buffer_bytes: usize,
}
