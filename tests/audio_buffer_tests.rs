// Tests for the live audio buffer and core audio types
//
// These tests verify the single-writer/many-reader contract of the
// buffer: snapshots taken concurrently with appends are always a prefix
// of the final content and never contain a torn frame.

use std::sync::Arc;
use std::thread;
use voiceai_live::audio::{AudioBackendConfig, AudioFrame, LiveAudioBuffer, BYTES_PER_SECOND};

#[test]
fn test_buffer_starts_empty() {
    let buffer = LiveAudioBuffer::new();

    assert!(buffer.is_empty());
    assert_eq!(buffer.len(), 0);
    assert_eq!(buffer.snapshot().len(), 0);
    assert_eq!(buffer.duration_seconds(), 0.0);
}

#[test]
fn test_buffer_append_and_snapshot() {
    let buffer = LiveAudioBuffer::new();

    buffer.append(&[1, 2, 3, 4]);
    buffer.append(&[5, 6]);

    assert_eq!(buffer.len(), 6);
    assert_eq!(buffer.snapshot(), vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_buffer_reset() {
    let buffer = LiveAudioBuffer::new();

    buffer.append(&[0u8; 1000]);
    assert_eq!(buffer.len(), 1000);

    buffer.reset();
    assert!(buffer.is_empty());
    assert_eq!(buffer.snapshot().len(), 0);
}

#[test]
fn test_buffer_duration_tracks_byte_count() {
    let buffer = LiveAudioBuffer::new();

    // One second of session-format audio
    buffer.append(&vec![0u8; BYTES_PER_SECOND as usize]);
    assert!((buffer.duration_seconds() - 1.0).abs() < 1e-9);

    // Half a second more
    buffer.append(&vec![0u8; BYTES_PER_SECOND as usize / 2]);
    assert!((buffer.duration_seconds() - 1.5).abs() < 1e-9);
}

#[test]
fn test_buffer_snapshots_are_prefixes_under_concurrent_appends() {
    let buffer = Arc::new(LiveAudioBuffer::new());

    // Writer appends frames whose content encodes their position, so a
    // torn or reordered frame is detectable from any snapshot
    let frame_size = 256;
    let frame_count = 200;

    let writer = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            for i in 0..frame_count {
                let frame = vec![(i % 251) as u8; frame_size];
                buffer.append(&frame);
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                let mut last_len = 0;
                for _ in 0..100 {
                    let snapshot = buffer.snapshot();

                    // Buffer only grows
                    assert!(snapshot.len() >= last_len, "snapshot shrank");
                    last_len = snapshot.len();

                    // Appends are atomic: length is a whole number of frames
                    assert_eq!(
                        snapshot.len() % frame_size,
                        0,
                        "snapshot contains a torn frame"
                    );

                    // Content is the expected prefix
                    for (frame_index, frame) in snapshot.chunks(frame_size).enumerate() {
                        let expected = (frame_index % 251) as u8;
                        assert!(
                            frame.iter().all(|&b| b == expected),
                            "frame {} has unexpected content",
                            frame_index
                        );
                    }
                }
            })
        })
        .collect();

    writer.join().expect("writer panicked");
    for reader in readers {
        reader.join().expect("reader panicked");
    }

    assert_eq!(buffer.len(), frame_size * frame_count);
}

#[test]
fn test_audio_frame_creation() {
    let frame = AudioFrame {
        samples: vec![100, 200, 300],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms: 1000,
    };

    assert_eq!(frame.samples.len(), 3);
    assert_eq!(frame.sample_rate, 16000);
    assert_eq!(frame.channels, 1);
    assert_eq!(frame.timestamp_ms, 1000);
}

#[test]
fn test_audio_backend_config_default() {
    let config = AudioBackendConfig::default();

    assert_eq!(config.target_sample_rate, 16000, "Default should be 16kHz");
    assert_eq!(config.target_channels, 1, "Default should be mono");
    assert_eq!(config.buffer_duration_ms, 100, "Default buffer should be 100ms");
}
