use anyhow::{Context, Result};
use std::io::Cursor;

/// Wrap raw 16-bit little-endian PCM in an in-memory WAV container
///
/// Transcription services will not accept headerless PCM, so every
/// dispatched chunk goes through this before hitting the wire.
pub fn encode_wav(pcm: &[u8], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());

    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .context("Failed to create in-memory WAV writer")?;

        for pair in pcm.chunks_exact(2) {
            let sample = i16::from_le_bytes([pair[0], pair[1]]);
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV")?;
        }

        writer.finalize().context("Failed to finalize WAV data")?;
    }

    Ok(cursor.into_inner())
}
