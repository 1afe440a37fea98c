use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::audio::AudioSource;
use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub transcription: TranscriptionConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionConfig {
    pub language: String,
    pub chunk_interval_secs: u64,
    pub overlap_ms: u64,
    pub min_chunk_ms: u64,
    pub request_timeout_secs: u64,
    pub drain_timeout_secs: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Session settings derived from the loaded file, for the given source
    pub fn session_config(&self, source: AudioSource) -> SessionConfig {
        SessionConfig {
            source,
            language: self.transcription.language.clone(),
            chunk_interval: Duration::from_secs(self.transcription.chunk_interval_secs),
            overlap: Duration::from_millis(self.transcription.overlap_ms),
            min_chunk: Duration::from_millis(self.transcription.min_chunk_ms),
            request_timeout: Duration::from_secs(self.transcription.request_timeout_secs),
            drain_timeout: Duration::from_secs(self.transcription.drain_timeout_secs),
            ..SessionConfig::default()
        }
    }
}
