use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::chunk::Chunk;
use super::dispatcher::ChunkDispatcher;
use crate::audio::{LiveAudioBuffer, BYTES_PER_SECOND};

/// Periodically slices overlapping windows off the live buffer
///
/// One scheduler exists per session. Each tick decides, against a
/// consistent (snapshot, cursor) pair, whether enough new audio exists
/// to be worth a backend call; short windows are deferred to the next
/// tick or the final drain rather than dispatched.
pub struct ChunkScheduler {
    buffer: Arc<LiveAudioBuffer>,
    dispatcher: ChunkDispatcher,

    /// Buffer offset up to which audio has been dispatched (minus overlap).
    /// Held across the snapshot so "is there enough new audio" is atomic
    /// with respect to the snapshot used to build the chunk.
    cursor: Mutex<usize>,

    /// Next chunk sequence number, shared with the session for stats
    sequence: Arc<AtomicU64>,

    /// Cleared by the session when capturing ends; ticks become no-ops
    capturing: Arc<AtomicBool>,

    overlap_bytes: usize,
    min_chunk_bytes: usize,
}

impl ChunkScheduler {
    pub fn new(
        buffer: Arc<LiveAudioBuffer>,
        dispatcher: ChunkDispatcher,
        sequence: Arc<AtomicU64>,
        capturing: Arc<AtomicBool>,
        overlap: Duration,
        min_chunk: Duration,
    ) -> Self {
        Self {
            buffer,
            dispatcher,
            cursor: Mutex::new(0),
            sequence,
            capturing,
            overlap_bytes: bytes_for(overlap),
            min_chunk_bytes: bytes_for(min_chunk),
        }
    }

    /// Tick loop. Fixed-delay semantics: a tick slowed by lock
    /// contention pushes its successor back instead of stacking ticks.
    pub async fn run(&self, period: Duration) {
        let mut ticks = interval_at(Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Chunk scheduler running (period {:?})", period);

        loop {
            ticks.tick().await;

            if !self.capturing.load(Ordering::SeqCst) {
                break;
            }

            self.tick();
        }

        info!("Chunk scheduler stopped");
    }

    /// One scheduling pass. Returns the dispatched chunk's sequence
    /// number, or `None` if the window was below the minimum length.
    pub fn tick(&self) -> Option<u64> {
        let mut cursor = self.cursor.lock().expect("cursor lock poisoned");
        let snapshot = self.buffer.snapshot();

        // Re-include the tail of the previous window so the backend can
        // recover words cut at the boundary. Callers tolerate the minor
        // duplicate wording this produces in consecutive fragments.
        let window_start = cursor.saturating_sub(self.overlap_bytes);
        let candidate_len = snapshot.len() - window_start;

        if candidate_len < self.min_chunk_bytes {
            debug!(
                "Deferring short window: {} bytes available, {} required",
                candidate_len, self.min_chunk_bytes
            );
            return None;
        }

        let end = snapshot.len();
        let pcm = snapshot[window_start..].to_vec();
        *cursor = end;
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        drop(cursor);

        self.dispatcher.dispatch(Chunk {
            sequence,
            start: window_start,
            end,
            pcm,
        });

        Some(sequence)
    }

    /// Slice off everything not yet dispatched, for the stop-time drain.
    /// No overlap is re-included: this is the terminal chunk. Returns
    /// `None` when the tail is empty.
    pub fn take_final_chunk(&self) -> Option<Chunk> {
        let mut cursor = self.cursor.lock().expect("cursor lock poisoned");
        let snapshot = self.buffer.snapshot();

        if snapshot.len() <= *cursor {
            return None;
        }

        let start = *cursor;
        let end = snapshot.len();
        let pcm = snapshot[start..].to_vec();
        *cursor = end;
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);

        Some(Chunk {
            sequence,
            start,
            end,
            pcm,
        })
    }

    /// Dispatch a drain chunk through the shared dispatcher, waiting up
    /// to `wait` for its outcome.
    pub async fn dispatch_final(&self, chunk: Chunk, wait: Duration) {
        self.dispatcher.dispatch_final(chunk, wait).await;
    }
}

/// Bytes of session-format audio covering `d`
fn bytes_for(d: Duration) -> usize {
    (d.as_millis() as u64 * BYTES_PER_SECOND as u64 / 1000) as usize
}
