use anyhow::Result;

/// Speech-to-text service boundary
///
/// The pipeline treats transcription as an opaque capability: WAV bytes
/// and a language hint in, text out. Concrete HTTP clients live in the
/// embedding application; tests use scripted implementations. A backend
/// may reject audio (for example above its size limit) — that is just
/// another failure, reported per chunk.
#[async_trait::async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Transcribe one WAV-encoded audio chunk
    async fn transcribe(&self, wav: &[u8], language: &str) -> Result<String>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
