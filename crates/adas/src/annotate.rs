//! Display frame rendering

use camera_capture::VideoFrame;
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;

use crate::config::LiveSettings;
use crate::geometry::LineSegment;
use crate::smoother::AveragedGeometry;
use crate::width::VehicleBounds;

pub const SEGMENT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const LANE_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const DIVIDER_COLOR: Rgb<u8> = Rgb([255, 165, 0]);
pub const VEHICLE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const WARP_ROW_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// ROI with the two warp rows marked when requested
pub fn roi_frame(roi: &VideoFrame, settings: &LiveSettings) -> RgbImage {
    let mut image = roi.to_rgb_image();
    if settings.show_both_rows_for_warping {
        let width = image.width() as f32;
        for row in [settings.first_row_for_warping, settings.first_row_for_warping + 1] {
            let y = row as f32;
            thick_line(&mut image, (0.0, y), (width, y), false, WARP_ROW_COLOR);
        }
    }
    image
}

/// Gray raster as RGB
pub fn gray_frame(gray: &GrayImage) -> RgbImage {
    DynamicImage::ImageLuma8(gray.clone()).to_rgb8()
}

/// Edge view with raw segments, averaged lines and vehicle sides
pub fn processed_frame(
    edges: &GrayImage,
    segments: &[LineSegment],
    geometry: &AveragedGeometry,
    bounds: Option<VehicleBounds>,
) -> RgbImage {
    let mut image = gray_frame(edges);

    for s in segments {
        let steep = (s.y2 - s.y1).abs() >= (s.x2 - s.x1).abs();
        thick_line(
            &mut image,
            (s.x1 as f32, s.y1 as f32),
            (s.x2 as f32, s.y2 as f32),
            steep,
            SEGMENT_COLOR,
        );
    }
    if let Some(divider) = geometry.divider {
        for x in divider {
            vertical(&mut image, x, DIVIDER_COLOR);
        }
    }
    for x in [geometry.lane_x1, geometry.lane_x2].into_iter().flatten() {
        vertical(&mut image, x, LANE_COLOR);
    }
    if let Some(bounds) = bounds {
        vertical(&mut image, bounds.left, VEHICLE_COLOR);
        vertical(&mut image, bounds.right, VEHICLE_COLOR);
    }
    image
}

/// Full-height line at `x`, truncated to the pixel grid
fn vertical(image: &mut RgbImage, x: f32, color: Rgb<u8>) {
    let x = x.trunc();
    let height = image.height() as f32;
    thick_line(image, (x, 0.0), (x, height), true, color);
}

/// Two-pixel line; the second pass is offset across the major axis
fn thick_line(
    image: &mut RgbImage,
    start: (f32, f32),
    end: (f32, f32),
    steep: bool,
    color: Rgb<u8>,
) {
    let (dx, dy) = if steep { (1.0, 0.0) } else { (0.0, 1.0) };
    draw_line_segment_mut(image, start, end, color);
    draw_line_segment_mut(image, (start.0 + dx, start.1 + dy), (end.0 + dx, end.1 + dy), color);
}
