//! Real-time transcription pipeline
//!
//! This module turns the growing session audio buffer into a stream of
//! transcript fragments:
//! - `ChunkScheduler` slices overlapping windows off the live buffer
//! - `ChunkDispatcher` submits each chunk to the backend asynchronously
//! - `TranscriptionBackend` is the opaque speech-to-text boundary
//! - `TranscriptEvent` carries per-chunk outcomes back to the caller

pub mod backend;
pub mod chunk;
pub mod dispatcher;
pub mod scheduler;

pub use backend::TranscriptionBackend;
pub use chunk::{Chunk, TranscriptEvent};
pub use dispatcher::ChunkDispatcher;
pub use scheduler::ChunkScheduler;
