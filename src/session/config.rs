use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::audio::AudioSource;

/// Configuration for a live transcription session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "session-2026-08-06-standup")
    pub session_id: String,

    /// Where the audio comes from (microphone or WAV file)
    pub source: AudioSource,

    /// How often the scheduler slices a new chunk off the live buffer
    /// Default: 5 seconds
    pub chunk_interval: Duration,

    /// Already-processed audio re-included at the start of each chunk,
    /// so the backend can recover words cut at the previous boundary
    /// Default: 500 milliseconds
    pub overlap: Duration,

    /// Minimum chunk length worth a backend call; shorter windows are
    /// deferred to the next tick or the final drain
    /// Default: 1 second
    pub min_chunk: Duration,

    /// Language hint passed to the transcription backend
    pub language: String,

    /// Per-chunk backend call timeout
    /// Default: 15 seconds
    pub request_timeout: Duration,

    /// How long `stop` waits for the final drain chunk's outcome
    /// Default: 10 seconds
    pub drain_timeout: Duration,

    /// Capacity of the transcript event channel handed to the caller
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            source: AudioSource::Microphone,
            chunk_interval: Duration::from_secs(5),
            overlap: Duration::from_millis(500),
            min_chunk: Duration::from_secs(1),
            language: "en".to_string(),
            request_timeout: Duration::from_secs(15),
            drain_timeout: Duration::from_secs(10),
            event_capacity: 256,
        }
    }
}
