use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use dashvox::kernel::scheduler::Notice;
use dashvox::services::cue::{LogCue, NoCue};
use dashvox::services::CueBackend;
use dashvox::services::line::LineRecognizer;
use dashvox::services::persist::DirectoryPersistence;
use dashvox::services::spool::SpoolRecorder;
use dashvox::{event_channel, Backends, CaptureConfig, Reactor};

/// Rolling dashcam capture loop. Each line on stdin is treated as one
/// recognized utterance.
#[derive(Debug, Parser)]
#[command(name = "dashvox", version)]
struct Args {
    /// JSON config file; missing keys use defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where in-progress segments are written
    #[arg(long, default_value = "spool")]
    spool_dir: PathBuf,

    /// Where saved segments are copied
    #[arg(long, default_value = "library")]
    library: PathBuf,

    /// Override the configured segment length
    #[arg(long)]
    segment_secs: Option<u64>,

    /// Do not report audio cues
    #[arg(long)]
    silent: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => CaptureConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => CaptureConfig::default(),
    };
    if let Some(secs) = args.segment_secs {
        config.segment_duration_secs = secs;
    }
    config.validate()?;
    tracing::info!(segment_secs = config.segment_duration_secs, retention = config.retention_count, "dashvox booting");

    let cues: Arc<dyn CueBackend> = if args.silent { Arc::new(NoCue) } else { Arc::new(LogCue) };

    let (tx, rx) = event_channel(&config);
    let backends = Backends {
        recorder: Arc::new(SpoolRecorder::new(&args.spool_dir, tx.clone())),
        recognizer: Arc::new(LineRecognizer::new(BufReader::new(tokio::io::stdin()), tx.clone())),
        persistence: Arc::new(DirectoryPersistence::new(&args.library)),
        cues,
    };

    let mut reactor = Reactor::new(rx, tx, &config, backends);
    let handle = reactor.handle();

    let mut notices = handle.subscribe();
    tokio::spawn(async move {
        while let Ok(notice) = notices.recv().await {
            match notice {
                Notice::Saved { sequence, location } => println!("saved segment {} -> {}", sequence, location),
                Notice::SaveFailed { sequence, reason } => println!("could not save segment {}: {}", sequence, reason),
                Notice::NothingToSave => println!("nothing recorded yet"),
                other => tracing::debug!(?other, "notice"),
            }
        }
    });

    let ctrl_c = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            let _ = ctrl_c.shutdown().await;
        }
    });

    reactor.start().await.context("capture devices not ready")?;
    println!("Listening. Say (type) \"ok garmin\", then \"save that video\" or \"nevermind\". Ctrl+C to stop.");
    reactor.run().await;

    let snap = reactor.telemetry();
    tracing::info!(
        completed = snap.segment_stats.completed,
        failed = snap.segment_stats.failed,
        saves = snap.save_stats.succeeded,
        save_failures = snap.save_stats.failed,
        avg_save_ticks = snap.save_stats.avg_latency_ticks(),
        "session summary"
    );
    Ok(())
}
