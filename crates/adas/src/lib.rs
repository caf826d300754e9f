//! Advanced Driver Assistance System (ADAS)
//!
//! Lane and divider position detection for a forward road camera:
//! - Region of interest extraction
//! - Threshold, perspective warp, opening, Canny and Hough line detection
//! - Lane / double-line divider classification of the detected lines
//! - Multi-frame smoothing and running vehicle-width estimation
//! - Debounced in-lane / out-lane / over-divider / no-lane state machine
//!
//! One frame goes through every stage before the next one is accepted.
//! The detector never touches shared state; it returns a [`LaneEvent`]
//! for the caller to publish.

pub mod analysis;
pub mod annotate;
pub mod calibration;
pub mod classifier;
pub mod config;
pub mod detector;
pub mod geometry;
pub mod hough;
pub mod position;
pub mod roi;
pub mod smoother;
pub mod width;

pub use analysis::{DisplayFrames, FrameOutput, GatingReason, LaneEvent};
pub use calibration::Calibration;
pub use classifier::{FrameClassification, LaneCandidates, LineClassifier};
pub use config::{AdasConfig, AmbiguityPolicy, LiveSettings};
pub use detector::{FrameInputs, LanePositionDetector};
pub use geometry::{EdgeGeometryPipeline, GeometryOutput, LineSegment};
pub use position::{AlertFlags, PositionState, VehiclePositionStateMachine};
pub use roi::RegionExtractor;
pub use smoother::{AveragedGeometry, TemporalSmoother};
pub use width::{RunningWidthEstimator, VehicleBounds, WidthEstimate};

use thiserror::Error;

/// ADAS error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdasError {
    #[error("Frame {width}x{height} is smaller than the 320x80 minimum")]
    FrameTooSmall { width: u32, height: u32 },

    #[error("Frame is {actual_width}x{actual_height}, configured for {expected_width}x{expected_height}")]
    ResolutionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Degenerate perspective transform for warp row {0}")]
    DegenerateWarp(u32),
}
