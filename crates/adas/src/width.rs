//! Vehicle width estimation from the lane scale

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::calibration::{Calibration, CANONICAL_WIDTH};
use crate::smoother::AveragedGeometry;

/// Pixel scale derived from one fully visible lane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WidthEstimate {
    pub meters_per_pixel: f32,
    /// Vehicle width in canonical pixels
    pub vehicle_pixel_width: f32,
}

/// Left and right vehicle sides in canonical x coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleBounds {
    pub left: f32,
    pub right: f32,
}

impl VehicleBounds {
    /// Bounds of a vehicle `pixel_width` wide, centered on the camera axis
    pub fn centered(pixel_width: f32) -> Self {
        let center = (CANONICAL_WIDTH / 2) as f32 - 1.0;
        Self {
            left: center - pixel_width / 2.0,
            right: center + pixel_width / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }
}

/// Running mean of the vehicle bounds
#[derive(Debug, Clone)]
pub struct RunningWidthEstimator {
    lane_width_m: f32,
    reset_at: u32,
    count: u32,
    average: Option<VehicleBounds>,
}

impl RunningWidthEstimator {
    pub fn new(calibration: &Calibration) -> Self {
        Self {
            lane_width_m: calibration.lane_width_m,
            reset_at: calibration.width_average_reset,
            count: 0,
            average: None,
        }
    }

    /// Fold the current frame into the average. Only a fully visible lane
    /// with positive spacing updates it.
    pub fn update(
        &mut self,
        geometry: &AveragedGeometry,
        vehicle_width_m: f32,
    ) -> Option<WidthEstimate> {
        let (x1, x2) = geometry.full_lane()?;
        let spacing = x2 - x1;
        if spacing <= 0.0 {
            return None;
        }

        let meters_per_pixel = self.lane_width_m / spacing;
        let estimate = WidthEstimate {
            meters_per_pixel,
            vehicle_pixel_width: vehicle_width_m / meters_per_pixel,
        };
        self.fold(VehicleBounds::centered(estimate.vehicle_pixel_width));
        Some(estimate)
    }

    fn fold(&mut self, bounds: VehicleBounds) {
        let average = match self.average {
            Some(avg) if self.count > 0 => {
                let n = self.count as f32;
                VehicleBounds {
                    left: avg.left + (bounds.left - avg.left) / n,
                    right: avg.right + (bounds.right - avg.right) / n,
                }
            }
            _ => bounds,
        };
        self.average = Some(average);

        self.count += 1;
        if self.count >= self.reset_at {
            trace!("Width average count reached {}, restarting", self.reset_at);
            self.count = 1;
        }
    }

    /// Averaged vehicle bounds, once any lane has been seen
    pub fn average(&self) -> Option<VehicleBounds> {
        self.average
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.average = None;
    }
}
