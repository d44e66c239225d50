use aether_voice::{Config, SessionIo, VoiceSession};
use anyhow::Result;
use clap::Parser;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "aether-voice", about = "Realtime voice assistant client")]
struct Args {
    /// Config file (without extension)
    #[arg(long, default_value = "config/aether-voice")]
    config: String,

    /// Override the model identifier
    #[arg(long)]
    model: Option<String>,

    /// Override the reply voice
    #[arg(long)]
    voice: Option<String>,

    /// Capture device name (default: system default microphone)
    #[arg(long)]
    device: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} starting", cfg.service.name);

    let mut session_cfg = cfg.session_config();
    if let Some(model) = args.model {
        session_cfg.model = model;
    }
    if let Some(voice) = args.voice {
        session_cfg.voice = voice;
    }
    session_cfg.capture_device = args.device;

    let session = VoiceSession::new(session_cfg, SessionIo::host(cfg.channel.api_key_env.clone()));
    session.start().await?;

    info!("session running; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    let stats = session.stop().await?;
    info!(
        "session finished after {:.1}s: {} turns, {} chunks sent ({} dropped), {} replies scheduled",
        stats.duration_secs,
        stats.turns_completed,
        stats.chunks_sent,
        stats.chunks_dropped,
        stats.audio_chunks_scheduled,
    );

    Ok(())
}
