//! Edge and line geometry of the region of interest

use camera_capture::VideoFrame;
use image::{GrayImage, Luma};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use imageproc::morphology::open;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calibration::{Calibration, CANONICAL_HEIGHT, CANONICAL_WIDTH, ROI_WIDTH};
use crate::hough::SegmentDetector;
use crate::{AdasError, LiveSettings};

/// Line segment in canonical (warped) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl LineSegment {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Midpoint x of the two endpoints
    pub fn centroid(&self) -> f32 {
        (self.x1 + self.x2) as f32 / 2.0
    }
}

/// Intermediate rasters and segments of one frame
#[derive(Debug, Clone)]
pub struct GeometryOutput {
    /// Thresholded, warped and opened ROI
    pub warped: GrayImage,
    /// Canny edges of `warped`
    pub edges: GrayImage,
    /// Raw detected segments
    pub segments: Vec<LineSegment>,
}

/// Grayscale -> threshold -> warp -> open -> Canny -> Hough
pub struct EdgeGeometryPipeline {
    calibration: Calibration,
    segment_detector: SegmentDetector,
    /// Projection for the last warp row used
    projection: Option<(u32, Projection)>,
}

impl EdgeGeometryPipeline {
    pub fn new(calibration: &Calibration) -> Self {
        Self {
            segment_detector: SegmentDetector::new(
                calibration.hough_vote_threshold,
                calibration.hough_min_length,
                calibration.hough_max_gap,
            ),
            calibration: calibration.clone(),
            projection: None,
        }
    }

    /// Run the full chain on a cropped ROI
    pub fn process(
        &mut self,
        roi: &VideoFrame,
        settings: &LiveSettings,
    ) -> Result<GeometryOutput, AdasError> {
        let gray = roi.to_grayscale();
        let binary = threshold(&gray, settings.binary_threshold_lower_end, ThresholdType::Binary);

        let projection = self.projection_for(settings.first_row_for_warping)?;
        let mut warped = GrayImage::new(CANONICAL_WIDTH, CANONICAL_HEIGHT);
        warp_into(&binary, &projection, Interpolation::Nearest, Luma([0]), &mut warped);

        let warped = open(&warped, Norm::LInf, self.calibration.opening_radius);
        let edges = canny(&warped, self.calibration.canny_low, self.calibration.canny_high);
        let segments = self.segment_detector.detect(&edges);

        debug!("Frame {}: {} raw segments", roi.sequence, segments.len());
        Ok(GeometryOutput {
            warped,
            edges,
            segments,
        })
    }

    /// Perspective transform stretching rows `row` and `row + 1` of the ROI
    /// over the whole canonical frame
    fn projection_for(&mut self, row: u32) -> Result<Projection, AdasError> {
        if let Some((cached_row, projection)) = self.projection {
            if cached_row == row {
                return Ok(projection);
            }
        }

        let top = row as f32;
        let bottom = top + 1.0;
        let roi_w = ROI_WIDTH as f32;
        let (out_w, out_h) = (CANONICAL_WIDTH as f32, CANONICAL_HEIGHT as f32);
        let projection = Projection::from_control_points(
            [(0.0, top), (roi_w, top), (0.0, bottom), (roi_w, bottom)],
            [(0.0, 0.0), (out_w, 0.0), (0.0, out_h), (out_w, out_h)],
        )
        .ok_or(AdasError::DegenerateWarp(row))?;

        debug!("Warp projection rebuilt for row {}", row);
        self.projection = Some((row, projection));
        Ok(projection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::ROI_HEIGHT;

    /// ROI with full-height white stripes over the given column ranges
    fn striped_roi(stripes: &[(u32, u32)]) -> VideoFrame {
        let mut frame = VideoFrame::solid(ROI_WIDTH, ROI_HEIGHT, [20, 20, 20]);
        for y in 0..ROI_HEIGHT {
            for &(start, end) in stripes {
                for x in start..end {
                    let idx = ((y * ROI_WIDTH + x) * 3) as usize;
                    frame.data[idx..idx + 3].copy_from_slice(&[255, 255, 255]);
                }
            }
        }
        frame
    }

    fn centroids(output: &GeometryOutput) -> Vec<f32> {
        let mut xs: Vec<f32> = output.segments.iter().map(LineSegment::centroid).collect();
        xs.sort_by(f32::total_cmp);
        xs
    }

    #[test]
    fn test_centroid() {
        assert_eq!(LineSegment::new(10, 0, 15, 59).centroid(), 12.5);
    }

    #[test]
    fn test_blank_roi_has_no_segments() {
        let mut pipeline = EdgeGeometryPipeline::new(&Calibration::default());
        let output = pipeline
            .process(&striped_roi(&[]), &LiveSettings::default())
            .unwrap();

        assert!(output.segments.is_empty());
        assert_eq!(output.warped.dimensions(), (320, 60));
        assert!(output.warped.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_stripe_edges_become_segments() {
        let mut pipeline = EdgeGeometryPipeline::new(&Calibration::default());
        let output = pipeline
            .process(&striped_roi(&[(50, 58), (270, 278)]), &LiveSettings::default())
            .unwrap();

        let xs = centroids(&output);
        assert_eq!(xs.len(), 4, "centroids: {:?}", xs);
        for (x, expected) in xs.iter().zip([50.0, 58.0, 270.0, 278.0]) {
            assert!((x - expected).abs() <= 2.0, "centroids: {:?}", xs);
        }
    }

    #[test]
    fn test_dim_stripes_below_threshold_ignored() {
        let mut pipeline = EdgeGeometryPipeline::new(&Calibration::default());
        let settings = LiveSettings {
            binary_threshold_lower_end: 255,
            ..Default::default()
        };
        let output = pipeline
            .process(&striped_roi(&[(50, 58)]), &settings)
            .unwrap();

        assert!(output.segments.is_empty());
    }

    #[test]
    fn test_speckle_removed_by_opening() {
        let mut roi = striped_roi(&[]);
        // 2x2 bright speck on the warp rows
        for (x, y) in [(100u32, 30u32), (101, 30), (100, 31), (101, 31)] {
            let idx = ((y * ROI_WIDTH + x) * 3) as usize;
            roi.data[idx..idx + 3].copy_from_slice(&[255, 255, 255]);
        }

        let mut pipeline = EdgeGeometryPipeline::new(&Calibration::default());
        let output = pipeline.process(&roi, &LiveSettings::default()).unwrap();

        assert!(output.warped.pixels().all(|p| p.0[0] == 0));
        assert!(output.segments.is_empty());
    }

    #[test]
    fn test_projection_cached_per_row() {
        let mut pipeline = EdgeGeometryPipeline::new(&Calibration::default());
        pipeline.projection_for(10).unwrap();
        assert_eq!(pipeline.projection.map(|(row, _)| row), Some(10));
        pipeline.projection_for(12).unwrap();
        assert_eq!(pipeline.projection.map(|(row, _)| row), Some(12));
    }
}
