//! ADAS configuration

use serde::{Deserialize, Serialize};

use crate::calibration::{Calibration, MIN_FRAME_HEIGHT, MIN_FRAME_WIDTH, ROI_HEIGHT};
use crate::AdasError;

/// What to do when only one lane line is visible and the vehicle is not on it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Keep the previous in-lane/out-lane verdict, otherwise undetermined
    #[default]
    HoldPrevious,
    /// Report the frame as undetermined
    Surface,
}

/// Static detector configuration, fixed for the lifetime of a detector
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdasConfig {
    /// Raw frame width delivered by the camera
    pub frame_width: u32,

    /// Raw frame height delivered by the camera
    pub frame_height: u32,

    /// Single-line ambiguity resolution
    pub ambiguity_policy: AmbiguityPolicy,

    /// Pixel and physical thresholds
    pub calibration: Calibration,
}

impl Default for AdasConfig {
    fn default() -> Self {
        Self {
            frame_width: 640,
            frame_height: 480,
            ambiguity_policy: AmbiguityPolicy::default(),
            calibration: Calibration::default(),
        }
    }
}

impl AdasConfig {
    /// Config for a camera running at the given resolution
    pub fn for_resolution(frame_width: u32, frame_height: u32) -> Self {
        Self {
            frame_width,
            frame_height,
            ..Default::default()
        }
    }

    /// Check the configured resolution can hold the ROI
    pub fn validate(&self) -> Result<(), AdasError> {
        if self.frame_width < MIN_FRAME_WIDTH || self.frame_height < MIN_FRAME_HEIGHT {
            return Err(AdasError::FrameTooSmall {
                width: self.frame_width,
                height: self.frame_height,
            });
        }
        let cal = &self.calibration;
        if cal.history_depth == 0 {
            return Err(AdasError::Config("history_depth must be > 0".into()));
        }
        if cal.lane_width_m <= 0.0 {
            return Err(AdasError::Config("lane_width_m must be > 0".into()));
        }
        if cal.width_average_reset < 2 {
            return Err(AdasError::Config("width_average_reset must be >= 2".into()));
        }
        Ok(())
    }
}

/// Operator-tunable settings, re-read every frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSettings {
    /// Binary threshold cutoff (0-255); brighter pixels become white
    pub binary_threshold_lower_end: u8,

    /// First of the two ROI rows stretched into the warped view (0-59)
    pub first_row_for_warping: u32,

    /// Real vehicle width in meters
    pub vehicle_width_m: f32,

    /// Mark the two warp rows on the ROI display frame
    pub show_both_rows_for_warping: bool,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            binary_threshold_lower_end: 180,
            first_row_for_warping: 30,
            vehicle_width_m: 1.8,
            show_both_rows_for_warping: false,
        }
    }
}

impl LiveSettings {
    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), AdasError> {
        if self.first_row_for_warping >= ROI_HEIGHT {
            return Err(AdasError::InvalidSetting {
                name: "first_row_for_warping",
                reason: format!("{} is outside 0..{}", self.first_row_for_warping, ROI_HEIGHT),
            });
        }
        if !(self.vehicle_width_m.is_finite() && self.vehicle_width_m > 0.0) {
            return Err(AdasError::InvalidSetting {
                name: "vehicle_width_m",
                reason: format!("{} is not a positive width", self.vehicle_width_m),
            });
        }
        Ok(())
    }
}
