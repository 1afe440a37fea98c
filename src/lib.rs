pub mod audio;
pub mod config;
pub mod session;
pub mod transcription;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFile, AudioFrame, AudioSource,
    LiveAudioBuffer,
};
pub use config::Config;
pub use session::{
    SessionConfig, SessionController, SessionState, SessionStats, StartError, StopError,
};
pub use transcription::{Chunk, ChunkDispatcher, ChunkScheduler, TranscriptEvent, TranscriptionBackend};
