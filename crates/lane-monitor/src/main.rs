//! Lane Departure Monitor - Main Entry Point

use std::path::PathBuf;
use std::sync::Arc;

use adas::LanePositionDetector;
use anyhow::{bail, Context, Result};
use camera_capture::ImageSequenceSource;
use clap::Parser;
use lane_monitor::{init_logging, EventLog, FrameLoop, MonitorSettings, SharedStateStore, StateStore};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory of recorded frames to replay (overrides camera.frames)
    #[arg(short, long)]
    frames: Option<PathBuf>,

    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write one JSON event per frame to this file
    #[arg(short, long)]
    events: Option<PathBuf>,

    /// Start from the US-roads preset (10 ft lanes)
    #[arg(long)]
    us_roads: bool,

    /// Fixed vehicle speed in km/h, checked against speed.threshold_kmh
    #[arg(long, conflicts_with = "below_speed")]
    speed: Option<f32>,

    /// Hold the speed gate below threshold (bench testing)
    #[arg(long)]
    below_speed: bool,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.json_logs)?;

    info!("=== Lane Departure Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let base = if args.us_roads {
        MonitorSettings::us_roads()
    } else {
        MonitorSettings::default()
    };
    let mut settings = MonitorSettings::load_from(&base, args.config.as_deref())?;
    if let Some(frames) = args.frames {
        settings.camera.frames = Some(frames);
    }
    let Some(frames_dir) = settings.camera.frames.clone() else {
        bail!("No frame source: pass --frames or set camera.frames");
    };

    let detector = LanePositionDetector::new(settings.adas_config())?;
    let mut source = ImageSequenceSource::open(&frames_dir, &settings.camera.camera_config())
        .with_context(|| format!("opening {}", frames_dir.display()))?;
    info!("Replaying {} frames from {}", source.remaining(), frames_dir.display());

    let store = Arc::new(SharedStateStore::new(settings.detector.clone()));
    if let Some(kmh) = args.speed {
        let gate = settings.speed.gate();
        let below = gate.update(store.as_ref(), kmh);
        info!("Speed {} km/h against {} km/h threshold, below: {}", kmh, gate.threshold_kmh(), below);
    } else if args.below_speed {
        store.set_below_speed_threshold(true);
    }

    let mut frame_loop = FrameLoop::new(detector, store.clone());
    if let Some(path) = &args.events {
        frame_loop = frame_loop.with_event_log(EventLog::create(path)?);
        info!("Logging events to {}", path.display());
    }

    let signal_store = store.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => signal_store.request_shutdown(),
            Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    let summary = tokio::task::spawn_blocking(move || frame_loop.run(&mut source))
        .await
        .context("frame loop panicked")?;

    let snapshot = store.snapshot();
    info!(
        "Processed {}/{} frames ({} rejected), final state {:?}, stop: {:?}",
        summary.frames_processed,
        summary.frames_read,
        summary.frame_errors,
        snapshot.state,
        summary.stop_reason
    );
    Ok(())
}
