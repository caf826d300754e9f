//! Multi-frame averaging of lane and divider candidates

use ring_buffer::SlidingBuffer;
use serde::{Deserialize, Serialize};

use crate::classifier::{FrameClassification, LaneCandidates};

/// Averaged line positions over the recent history
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AveragedGeometry {
    pub lane_x1: Option<f32>,
    pub lane_x2: Option<f32>,
    pub divider: Option<[f32; 4]>,
}

impl AveragedGeometry {
    /// Both lane lines known
    pub fn full_lane(&self) -> Option<(f32, f32)> {
        self.lane_x1.zip(self.lane_x2)
    }

    /// Rightmost divider edge
    pub fn divider_x4(&self) -> Option<f32> {
        self.divider.map(|d| d[3])
    }
}

/// Holds the last `history_depth` classifications and averages them
#[derive(Debug, Clone)]
pub struct TemporalSmoother {
    lanes: SlidingBuffer<LaneCandidates>,
    dividers: SlidingBuffer<Option<[f32; 4]>>,
}

impl TemporalSmoother {
    pub fn new(depth: usize) -> Self {
        Self {
            lanes: SlidingBuffer::new(depth),
            dividers: SlidingBuffer::new(depth),
        }
    }

    /// Record one frame and return the new averages
    pub fn update(&mut self, classification: &FrameClassification) -> AveragedGeometry {
        self.lanes.push(classification.lanes);
        self.dividers.push(classification.divider);
        self.average()
    }

    /// Averages over the current buffer contents
    pub fn average(&self) -> AveragedGeometry {
        let (lane_x1, lane_x2) = self.average_lanes();
        AveragedGeometry {
            lane_x1,
            lane_x2,
            divider: self.average_divider(),
        }
    }

    pub fn reset(&mut self) {
        self.lanes.clear();
        self.dividers.clear();
    }

    pub fn lane_history(&self) -> &SlidingBuffer<LaneCandidates> {
        &self.lanes
    }

    pub fn divider_history(&self) -> &SlidingBuffer<Option<[f32; 4]>> {
        &self.dividers
    }

    /// Pairs win over single lines; single lines are only averaged when no
    /// pair is buffered.
    fn average_lanes(&self) -> (Option<f32>, Option<f32>) {
        let pairs: Vec<(f32, f32)> = self
            .lanes
            .iter()
            .filter_map(|entry| match *entry {
                LaneCandidates::Pair(a, b) => Some((a, b)),
                _ => None,
            })
            .collect();
        if !pairs.is_empty() {
            let n = pairs.len() as f32;
            let x1 = pairs.iter().map(|p| p.0).sum::<f32>() / n;
            let x2 = pairs.iter().map(|p| p.1).sum::<f32>() / n;
            return (Some(x1), Some(x2));
        }

        let singles: Vec<f32> = self
            .lanes
            .iter()
            .filter_map(|entry| match *entry {
                LaneCandidates::Single(x) => Some(x),
                _ => None,
            })
            .collect();
        (mean(&singles), None)
    }

    fn average_divider(&self) -> Option<[f32; 4]> {
        let windows: Vec<&[f32; 4]> = self.dividers.iter().flatten().collect();
        if windows.is_empty() {
            return None;
        }
        let n = windows.len() as f32;
        let mut sum = [0.0f32; 4];
        for window in windows {
            for (acc, x) in sum.iter_mut().zip(window) {
                *acc += x;
            }
        }
        Some(sum.map(|s| s / n))
    }
}

impl Default for TemporalSmoother {
    fn default() -> Self {
        Self::new(ring_buffer::DEFAULT_DEPTH)
    }
}

fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }
}
