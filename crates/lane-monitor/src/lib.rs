//! Lane Departure Monitor
//!
//! Coordinates the vision core with the rest of the vehicle:
//! - Typed shared state store read by the speed, alert and display collaborators
//! - Layered settings (defaults, TOML file, environment)
//! - Cooperative frame loop driving [`adas::LanePositionDetector`]
//! - JSON-lines event log
//! - Alert selection for the audible collaborator

pub mod alert;
pub mod events;
pub mod runner;
pub mod settings;
pub mod store;

pub use alert::{AlertKind, BeepPattern};
pub use events::EventLog;
pub use runner::{FrameLoop, RunSummary, StopReason};
pub use settings::MonitorSettings;
pub use store::{MonitorSnapshot, SharedStateStore, SpeedGate, StateStore};

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Monitor error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Detector error: {0}")]
    Detector(#[from] adas::AdasError),

    #[error("Camera error: {0}")]
    Camera(#[from] camera_capture::CameraError),

    #[error("Event log error: {0}")]
    EventLog(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to install logging: {0}")]
    Logging(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Initialize logging
pub fn init_logging(verbose: bool, json: bool) -> Result<(), MonitorError> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}
