use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use voiceai_live::audio::{list_input_devices, microphone_available, AudioSource};
use voiceai_live::transcription::TranscriptionBackend;
use voiceai_live::{Config, SessionController, TranscriptEvent};

#[derive(Parser, Debug)]
#[command(name = "voiceai-live", about = "Live audio chunking and transcription pipeline")]
struct Args {
    /// Configuration file (without extension)
    #[arg(long, default_value = "config/voiceai-live")]
    config: String,

    /// List available audio input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Record from the microphone for this many seconds, running the
    /// full chunking pipeline against a dry-run transcription backend
    #[arg(long)]
    record: Option<u64>,
}

/// Stand-in transcription service for pipeline smoke runs. Real
/// deployments plug an actual speech-to-text client in here.
struct DryRunBackend;

#[async_trait::async_trait]
impl TranscriptionBackend for DryRunBackend {
    async fn transcribe(&self, wav: &[u8], language: &str) -> Result<String> {
        info!(
            "Dry-run transcription: {} WAV bytes (language: {})",
            wav.len(),
            language
        );
        Ok(String::new())
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v0.1.0", cfg.service.name);

    if args.list_devices {
        let devices = list_input_devices()?;
        if devices.is_empty() {
            println!("No audio input devices found");
        }
        for name in devices {
            println!("{}", name);
        }
        return Ok(());
    }

    if let Some(secs) = args.record {
        return record(&cfg, secs).await;
    }

    if microphone_available() {
        info!("Audio input device detected; run with --record <secs> to test the pipeline");
    } else {
        info!("No audio input device found");
    }

    Ok(())
}

async fn record(cfg: &Config, secs: u64) -> Result<()> {
    let session_config = cfg.session_config(AudioSource::Microphone);
    let (controller, mut events) =
        SessionController::new(session_config, Arc::new(DryRunBackend));

    controller.start().await?;
    info!("Recording for {} seconds...", secs);

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                TranscriptEvent::Text { sequence, text } => {
                    println!("[chunk {}] {}", sequence, text);
                }
                TranscriptEvent::Error { sequence, reason } => {
                    eprintln!("[chunk {}] error: {}", sequence, reason);
                }
                TranscriptEvent::DeviceLost { reason } => {
                    eprintln!("device lost: {}", reason);
                    break;
                }
            }
        }
    });

    tokio::time::sleep(Duration::from_secs(secs)).await;

    let stats = controller.stop().await?;
    info!(
        "Captured {:.1}s of audio, {} chunks dispatched",
        stats.duration_secs, stats.chunks_dispatched
    );
    println!("{}", serde_json::to_string_pretty(&stats)?);

    drop(controller);
    let _ = printer.await;

    Ok(())
}
