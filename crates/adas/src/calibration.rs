//! Calibration table
//!
//! Every pixel threshold below is expressed in the canonical 320x60 warped
//! frame. They encode the road geometry seen from the mounting height the
//! detector was tuned on and must stay in sync with each other.

use serde::{Deserialize, Serialize};

/// Canonical (warped) frame width in pixels
pub const CANONICAL_WIDTH: u32 = 320;
/// Canonical (warped) frame height in pixels
pub const CANONICAL_HEIGHT: u32 = 60;
/// ROI size cut from the raw frame
pub const ROI_WIDTH: u32 = 320;
pub const ROI_HEIGHT: u32 = 60;
/// Smallest raw frame the ROI fits in, with a 10 px margin above and below
pub const MIN_FRAME_WIDTH: u32 = 320;
pub const MIN_FRAME_HEIGHT: u32 = 80;

/// Physical and pixel calibration of the detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Real lane width in meters, sets the meters-per-pixel scale
    pub lane_width_m: f32,

    /// Canny hysteresis thresholds
    pub canny_low: f32,
    pub canny_high: f32,

    /// Hough accumulator votes needed for a line
    pub hough_vote_threshold: u32,
    /// Shortest segment kept (px)
    pub hough_min_length: u32,
    /// Largest gap bridged inside one segment (px)
    pub hough_max_gap: u32,

    /// Half-size of the square opening kernel (2 -> 5x5)
    pub opening_radius: u8,

    /// More raw segments than this means gravel, shadows or glare
    pub max_segments: usize,
    /// Upper bound of the lane/divider scan (segment count)
    pub max_classified_centroids: usize,

    /// Spacing between the two edges of a painted line (px)
    pub divider_edge_gap: f32,
    /// Spacing between the two painted lines of a divider (px)
    pub divider_line_gap: f32,

    /// Accepted centroid spacing of a full lane (px)
    pub lane_gap_min: f32,
    pub lane_gap_max: f32,

    /// Frames of history averaged by the smoother
    pub history_depth: usize,

    /// Frames processed before the state machine runs
    pub warmup_frames: u32,

    /// Running vehicle-width average restarts at this update count
    pub width_average_reset: u32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            lane_width_m: 3.0,
            canny_low: 200.0,
            canny_high: 225.0,
            hough_vote_threshold: 30,
            hough_min_length: 30,
            hough_max_gap: 20,
            opening_radius: 2,
            max_segments: 8,
            max_classified_centroids: 10,
            divider_edge_gap: 12.0,
            divider_line_gap: 16.0,
            lane_gap_min: 210.0,
            lane_gap_max: 240.0,
            history_depth: ring_buffer::DEFAULT_DEPTH,
            warmup_frames: 30,
            width_average_reset: 1000,
        }
    }
}

impl Calibration {
    /// US lane width (10 ft) instead of the rounded 3 m default
    pub fn us_lane() -> Self {
        Self {
            lane_width_m: 3.048,
            ..Default::default()
        }
    }

    /// True when `gap` is the spacing of a full lane
    pub fn is_lane_gap(&self, gap: f32) -> bool {
        (self.lane_gap_min..=self.lane_gap_max).contains(&gap)
    }

    /// True when four sorted centroids look like the edges of a double line
    pub fn is_divider_window(&self, window: &[f32; 4]) -> bool {
        let [a, b, c, d] = *window;
        b - a <= self.divider_edge_gap
            && c - b <= self.divider_line_gap
            && d - c <= self.divider_edge_gap
    }
}
