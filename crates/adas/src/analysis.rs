//! Per-frame detector results

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::position::{AlertFlags, PositionState};
use crate::smoother::AveragedGeometry;
use crate::width::VehicleBounds;

/// Why the state machine did not run on a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatingReason {
    /// Fewer frames processed than the warm-up length
    Warmup,
    /// No full lane seen yet, so the vehicle width is unknown
    NoWidthEstimate,
    /// Vehicle slower than the alert speed
    BelowSpeedThreshold,
}

/// Detector result for one frame, applied to the shared state store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneEvent {
    /// Source frame sequence number
    pub sequence: u32,

    /// Source frame capture time (nanoseconds)
    pub timestamp_ns: u64,

    pub state: PositionState,

    pub flags: AlertFlags,

    /// Averaged lane and divider lines
    pub geometry: AveragedGeometry,

    /// Averaged vehicle sides, once known
    pub vehicle_bounds: Option<VehicleBounds>,

    /// Raw segments found on the canonical frame
    pub segment_count: usize,

    /// True when the state machine ran
    pub evaluated: bool,

    /// Set when `evaluated` is false
    pub gating: Option<GatingReason>,
}

/// Images for the monitoring display
#[derive(Debug, Clone)]
pub struct DisplayFrames {
    /// Raw camera frame
    pub full: RgbImage,
    /// Cropped ROI, optionally with the warp rows marked
    pub roi: RgbImage,
    /// Binary top-down view
    pub warped: RgbImage,
    /// Edge view with lines and vehicle bounds; only for evaluated frames
    pub processed: Option<RgbImage>,
}

/// Everything produced by one frame
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub event: LaneEvent,
    pub displays: DisplayFrames,
}
