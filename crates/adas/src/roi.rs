//! Region of interest extraction

use camera_capture::VideoFrame;
use tracing::debug;

use crate::calibration::{MIN_FRAME_HEIGHT, MIN_FRAME_WIDTH, ROI_HEIGHT, ROI_WIDTH};
use crate::{AdasConfig, AdasError};

/// Cuts the fixed 320x60 band out of the middle of each raw frame
#[derive(Debug, Clone)]
pub struct RegionExtractor {
    frame_width: u32,
    frame_height: u32,
    col_start: u32,
    row_start: u32,
}

impl RegionExtractor {
    pub fn new(config: &AdasConfig) -> Result<Self, AdasError> {
        let (width, height) = (config.frame_width, config.frame_height);
        if width < MIN_FRAME_WIDTH || height < MIN_FRAME_HEIGHT {
            return Err(AdasError::FrameTooSmall { width, height });
        }

        let extractor = Self {
            frame_width: width,
            frame_height: height,
            col_start: width / 2 - ROI_WIDTH / 2,
            row_start: height / 2 - ROI_HEIGHT / 2,
        };
        debug!(
            "ROI for {}x{}: cols {}..{}, rows {}..{}",
            width,
            height,
            extractor.col_start,
            extractor.col_start + ROI_WIDTH,
            extractor.row_start,
            extractor.row_start + ROI_HEIGHT
        );
        Ok(extractor)
    }

    /// Top-left corner of the ROI in raw frame coordinates
    pub fn origin(&self) -> (u32, u32) {
        (self.col_start, self.row_start)
    }

    /// Crop the ROI from `frame`
    pub fn extract(&self, frame: &VideoFrame) -> Result<VideoFrame, AdasError> {
        if frame.width < MIN_FRAME_WIDTH || frame.height < MIN_FRAME_HEIGHT {
            return Err(AdasError::FrameTooSmall {
                width: frame.width,
                height: frame.height,
            });
        }
        if frame.width != self.frame_width || frame.height != self.frame_height {
            return Err(AdasError::ResolutionMismatch {
                expected_width: self.frame_width,
                expected_height: self.frame_height,
                actual_width: frame.width,
                actual_height: frame.height,
            });
        }

        frame
            .crop(self.col_start, self.row_start, ROI_WIDTH, ROI_HEIGHT)
            .ok_or(AdasError::FrameTooSmall {
                width: frame.width,
                height: frame.height,
            })
    }
}
