//! Video frame types and processing

use image::{GrayImage, RgbImage};

use crate::CameraError;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        timestamp_ns: u64,
        sequence: u32,
    ) -> Result<Self, CameraError> {
        let expected = (width as usize) * (height as usize) * 3;
        if data.len() != expected {
            return Err(CameraError::Buffer {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        })
    }

    /// Wrap a decoded RGB image
    pub fn from_rgb_image(image: RgbImage, timestamp_ns: u64, sequence: u32) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Frame filled with a single color
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take((width as usize) * (height as usize) * 3)
            .collect();
        Self {
            data,
            width,
            height,
            timestamp_ns: 0,
            sequence: 0,
        }
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Convert to grayscale
    pub fn to_grayscale(&self) -> GrayImage {
        let gray = self
            .data
            .chunks_exact(3)
            .map(|pixel| {
                // Luminance formula: 0.299*R + 0.587*G + 0.114*B
                (pixel[0] as f32 * 0.299 + pixel[1] as f32 * 0.587 + pixel[2] as f32 * 0.114)
                    .round()
                    .min(255.0) as u8
            })
            .collect();
        GrayImage::from_raw(self.width, self.height, gray)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }

    /// Copy into an `image` RGB buffer
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    /// Crop a region of the frame
    pub fn crop(&self, x: u32, y: u32, w: u32, h: u32) -> Option<VideoFrame> {
        if x + w > self.width || y + h > self.height {
            return None;
        }

        let mut cropped = Vec::with_capacity((w * h * 3) as usize);
        for row in y..(y + h) {
            let start = ((row * self.width + x) * 3) as usize;
            let end = start + (w * 3) as usize;
            cropped.extend_from_slice(&self.data[start..end]);
        }

        Some(VideoFrame {
            data: cropped,
            width: w,
            height: h,
            timestamp_ns: self.timestamp_ns,
            sequence: self.sequence,
        })
    }

    /// Same pixels, new capture metadata
    pub fn with_sequence(mut self, timestamp_ns: u64, sequence: u32) -> Self {
        self.timestamp_ns = timestamp_ns;
        self.sequence = sequence;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gradient(width: u32, height: u32) -> VideoFrame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 0]);
            }
        }
        VideoFrame::new(data, width, height, 7, 3).unwrap()
    }

    #[test]
    fn test_rejects_short_buffer() {
        let err = VideoFrame::new(vec![0; 10], 4, 4, 0, 0).unwrap_err();
        assert!(matches!(err, CameraError::Buffer { expected: 48, actual: 10 }));
    }

    #[test]
    fn test_crop_keeps_metadata() {
        let frame = gradient(20, 10);
        let roi = frame.crop(5, 2, 10, 4).unwrap();

        assert_eq!((roi.width, roi.height), (10, 4));
        assert_eq!(roi.get_pixel(0, 0), Some([5, 2, 0]));
        assert_eq!(roi.get_pixel(9, 3), Some([14, 5, 0]));
        assert_eq!(roi.sequence, 3);
        assert_eq!(roi.timestamp_ns, 7);
    }

    #[test]
    fn test_crop_out_of_bounds() {
        let frame = gradient(20, 10);
        assert!(frame.crop(15, 0, 10, 4).is_none());
        assert!(frame.crop(0, 8, 4, 4).is_none());
    }

    #[test]
    fn test_grayscale_white_and_black() {
        let white = VideoFrame::solid(4, 2, [255, 255, 255]).to_grayscale();
        assert!(white.pixels().all(|p| p.0[0] == 255));

        let black = VideoFrame::solid(4, 2, [0, 0, 0]).to_grayscale();
        assert!(black.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_rgb_image_round_trip() {
        let frame = gradient(8, 6);
        let again = VideoFrame::from_rgb_image(frame.to_rgb_image(), 1, 2);
        assert_eq!(again.data, frame.data);
        assert_eq!(again.sequence, 2);
    }

    proptest! {
        #[test]
        fn prop_crop_size(x in 0u32..16, y in 0u32..8, w in 1u32..16, h in 1u32..8) {
            let frame = gradient(16, 8);
            match frame.crop(x, y, w, h) {
                Some(c) => {
                    prop_assert!(x + w <= 16 && y + h <= 8);
                    prop_assert_eq!(c.data.len(), (w * h * 3) as usize);
                }
                None => prop_assert!(x + w > 16 || y + h > 8),
            }
        }
    }
}
