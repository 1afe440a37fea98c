pub mod backend;
pub mod buffer;
pub mod file;
pub mod microphone;
pub mod wav;

pub use backend::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource,
    BYTES_PER_SECOND, SESSION_CHANNELS, SESSION_SAMPLE_RATE,
};
pub use buffer::LiveAudioBuffer;
pub use file::{AudioFile, FileBackend};
pub use microphone::{list_input_devices, microphone_available, MicrophoneBackend};
pub use wav::encode_wav;
