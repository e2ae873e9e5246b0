use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use live_relay::audio::AudioRecorder;
use live_relay::platform::SystemMediaDevices;
use live_relay::Config;
use tracing::info;

/// Microphone smoke test: capture for a few seconds and report what the
/// recorder produced.
#[derive(Parser, Debug)]
#[command(name = "live-relay", version)]
struct Args {
    /// Config file (without extension), as understood by the config crate.
    #[arg(long, default_value = "config/live-relay")]
    config: String,

    /// How long to capture before stopping.
    #[arg(long, default_value_t = 5)]
    seconds: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!(
        "capturing {} Hz mono audio for {} seconds",
        cfg.audio.sample_rate, args.seconds
    );

    let devices = Arc::new(SystemMediaDevices::new());
    let recorder = AudioRecorder::new(devices, (&cfg.audio).into());

    let mut data = recorder.data_events();
    let mut volume = recorder.volume_events();
    recorder.start().await?;

    let deadline = tokio::time::sleep(Duration::from_secs(args.seconds));
    tokio::pin!(deadline);

    let mut chunks = 0usize;
    let mut peak = 0.0f32;
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            Some(chunk) = data.recv() => {
                chunks += 1;
                info!(bytes = chunk.len(), "audio chunk ready");
            }
            Some(level) = volume.recv() => {
                if level > peak {
                    peak = level;
                }
            }
        }
    }

    recorder.close();
    info!("captured {} chunks, peak volume {:.3}", chunks, peak);
    Ok(())
}
