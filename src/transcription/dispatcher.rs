use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{error, info, warn};

use super::backend::TranscriptionBackend;
use super::chunk::{Chunk, TranscriptEvent};
use crate::audio::wav::encode_wav;
use crate::audio::{SESSION_CHANNELS, SESSION_SAMPLE_RATE};

/// Submits chunks to the transcription backend and reports outcomes
///
/// Each chunk runs as its own task, bounded in lifetime by the per-call
/// timeout, so a slow backend cannot accumulate work without bound.
/// Outcomes are emitted on the session event channel in completion
/// order; sequence numbers let callers reorder if they care.
#[derive(Clone)]
pub struct ChunkDispatcher {
    backend: Arc<dyn TranscriptionBackend>,
    language: String,
    request_timeout: Duration,
    events: mpsc::Sender<TranscriptEvent>,
}

impl ChunkDispatcher {
    pub fn new(
        backend: Arc<dyn TranscriptionBackend>,
        language: String,
        request_timeout: Duration,
        events: mpsc::Sender<TranscriptEvent>,
    ) -> Self {
        Self {
            backend,
            language,
            request_timeout,
            events,
        }
    }

    /// Fire-and-forget dispatch of a periodic chunk
    pub fn dispatch(&self, chunk: Chunk) {
        let this = self.clone();
        tokio::spawn(async move {
            this.transcribe_chunk(chunk).await;
        });
    }

    /// Dispatch the final drain chunk, waiting up to `wait` for its outcome
    ///
    /// On wait expiry the call is abandoned, not cancelled: it keeps
    /// running and its outcome may still arrive on the event channel.
    pub async fn dispatch_final(&self, chunk: Chunk, wait: Duration) {
        let sequence = chunk.sequence;
        let this = self.clone();

        let handle = tokio::spawn(async move {
            this.transcribe_chunk(chunk).await;
        });

        if timeout(wait, handle).await.is_err() {
            warn!(
                "Final chunk #{} still pending after {:?}, leaving it in flight",
                sequence, wait
            );
        }
    }

    async fn transcribe_chunk(&self, chunk: Chunk) {
        info!(
            "Transcribing chunk #{} ({} bytes, [{}, {}))",
            chunk.sequence,
            chunk.len(),
            chunk.start,
            chunk.end
        );

        let outcome = self.run_backend_call(&chunk).await;

        match outcome {
            Ok(Some(text)) => {
                info!(
                    "Chunk #{} transcribed: {} chars",
                    chunk.sequence,
                    text.len()
                );
                self.emit(TranscriptEvent::Text {
                    sequence: chunk.sequence,
                    text,
                })
                .await;
            }
            Ok(None) => {
                // Backend returned empty text; nothing to report
            }
            Err(reason) => {
                warn!("Chunk #{} transcription failed: {}", chunk.sequence, reason);
                self.emit(TranscriptEvent::Error {
                    sequence: chunk.sequence,
                    reason,
                })
                .await;
            }
        }
    }

    /// Encode, call the backend under timeout, and normalize the text.
    /// `Ok(None)` means a successful call with nothing worth reporting.
    async fn run_backend_call(&self, chunk: &Chunk) -> Result<Option<String>, String> {
        let wav = encode_wav(&chunk.pcm, SESSION_SAMPLE_RATE, SESSION_CHANNELS)
            .map_err(|e| format!("WAV encoding failed: {}", e))?;

        let call = self.backend.transcribe(&wav, &self.language);

        match timeout(self.request_timeout, call).await {
            Ok(Ok(text)) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                Ok(Some(pad_fragment(trimmed)))
            }
            Ok(Err(e)) => Err(format!("Transcription error: {}", e)),
            Err(_) => Err("Transcription timeout".to_string()),
        }
    }

    async fn emit(&self, event: TranscriptEvent) {
        if let Err(e) = self.events.send(event).await {
            error!("Failed to deliver transcript event: {}", e);
        }
    }
}

/// Append a trailing space unless the fragment already ends a sentence,
/// so consecutive fragments concatenate into readable text.
fn pad_fragment(text: &str) -> String {
    let mut out = text.to_string();
    if !matches!(out.chars().last(), Some('.') | Some('!') | Some('?')) {
        out.push(' ');
    }
    out
}
