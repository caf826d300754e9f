//! Camera Capture Library for the lane monitor
//!
//! Provides the frame type handed to the vision core and the blocking
//! frame sources it pulls from:
//! - Recorded image sequences (bench testing, replay of test footage)
//! - In-memory queues (tests, synthetic scenes)
//!
//! Hardware capture lives outside this workspace; a driver only has to
//! implement [`FrameSource`].

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{FrameSource, ImageSequenceSource, MemorySource};

use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open frame source: {0}")]
    Open(String),

    #[error("Failed to decode frame {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid frame buffer: expected {expected} bytes, got {actual}")]
    Buffer { expected: usize, actual: usize },

    #[error("Frame source already released")]
    Released,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Road camera configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraConfig {
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Nominal frame rate, used only for timestamping replayed footage
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

impl CameraConfig {
    /// Interval between frames in nanoseconds
    pub fn frame_interval_ns(&self) -> u64 {
        1_000_000_000 / u64::from(self.fps.max(1))
    }
}
