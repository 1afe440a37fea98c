use std::sync::RwLock;

use super::backend::BYTES_PER_SECOND;

/// Thread-safe growing buffer of raw PCM audio for the current session
///
/// Holds everything captured so far as 16kHz/16-bit/mono little-endian
/// bytes. The capture task is the only writer; any number of readers may
/// take a consistent snapshot concurrently with appends. Bytes are only
/// ever appended, never mutated or removed, until `reset` at the start
/// of the next session.
pub struct LiveAudioBuffer {
    data: RwLock<Vec<u8>>,
}

impl LiveAudioBuffer {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(Vec::new()),
        }
    }

    /// Append one captured frame. Frames are atomic units: a concurrent
    /// `snapshot` sees either none or all of the frame's bytes.
    pub fn append(&self, frame: &[u8]) {
        let mut data = self.data.write().expect("audio buffer lock poisoned");
        data.extend_from_slice(frame);
    }

    /// Copy of all bytes appended so far. Safe to call while the capture
    /// task is appending; the result is always a prefix of the final
    /// session audio.
    pub fn snapshot(&self) -> Vec<u8> {
        let data = self.data.read().expect("audio buffer lock poisoned");
        data.clone()
    }

    /// Number of bytes captured so far.
    pub fn len(&self) -> usize {
        let data = self.data.read().expect("audio buffer lock poisoned");
        data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Seconds of audio captured so far at the fixed session format.
    pub fn duration_seconds(&self) -> f64 {
        self.len() as f64 / BYTES_PER_SECOND as f64
    }

    /// Clear the buffer. Only called between sessions, when no capture
    /// task is running.
    pub fn reset(&self) {
        let mut data = self.data.write().expect("audio buffer lock poisoned");
        data.clear();
    }
}

impl Default for LiveAudioBuffer {
    fn default() -> Self {
        Self::new()
    }
}
