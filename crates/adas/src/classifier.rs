//! Lane and divider classification of one frame's segments

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::calibration::Calibration;
use crate::geometry::LineSegment;

/// Lane line centroids seen in one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum LaneCandidates {
    #[default]
    None,
    /// One visible line
    Single(f32),
    /// Left and right lines of a full lane
    Pair(f32, f32),
}

impl LaneCandidates {
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Single(_) => 1,
            Self::Pair(..) => 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Classified centroids of one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameClassification {
    pub lanes: LaneCandidates,
    /// Four edges of a double-line divider, left to right
    pub divider: Option<[f32; 4]>,
}

impl FrameClassification {
    /// Nothing usable in the frame
    pub fn nothing_detected() -> Self {
        Self::default()
    }
}

/// Splits segment centroids into lane lines and divider edges
#[derive(Debug, Clone)]
pub struct LineClassifier {
    calibration: Calibration,
}

impl LineClassifier {
    pub fn new(calibration: &Calibration) -> Self {
        Self {
            calibration: calibration.clone(),
        }
    }

    /// Classify one frame. No segments, or more than `max_segments`, means
    /// nothing was detected.
    pub fn classify(&self, segments: &[LineSegment]) -> FrameClassification {
        let cal = &self.calibration;
        if segments.is_empty() || segments.len() > cal.max_segments {
            return FrameClassification::nothing_detected();
        }

        let mut centroids: Vec<f32> = segments.iter().map(LineSegment::centroid).collect();
        centroids.sort_by(f32::total_cmp);

        let n = centroids.len();
        let classification = if (2..=cal.max_classified_centroids).contains(&n) {
            FrameClassification {
                lanes: self.find_lane(&centroids),
                divider: self.find_divider(&centroids),
            }
        } else {
            FrameClassification {
                lanes: LaneCandidates::Single(centroids[0]),
                divider: None,
            }
        };

        trace!("Centroids {:?} -> {:?}", centroids, classification);
        classification
    }

    /// Leftmost window of four centroids shaped like a double line
    fn find_divider(&self, centroids: &[f32]) -> Option<[f32; 4]> {
        centroids
            .windows(4)
            .filter_map(|w| <[f32; 4]>::try_from(w).ok())
            .find(|window| self.calibration.is_divider_window(window))
    }

    /// First pair spaced like a full lane, else the rightmost line alone
    fn find_lane(&self, centroids: &[f32]) -> LaneCandidates {
        centroids
            .windows(2)
            .find(|pair| self.calibration.is_lane_gap(pair[1] - pair[0]))
            .map(|pair| LaneCandidates::Pair(pair[0], pair[1]))
            .or_else(|| centroids.last().map(|&x| LaneCandidates::Single(x)))
            .unwrap_or_default()
    }
}
