//! Blocking frame sources

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{CameraConfig, CameraError, VideoFrame};

/// A blocking supplier of frames.
///
/// `Ok(None)` is end of stream. Errors are not retried by the caller, so an
/// implementation should only return one once the source is unusable.
pub trait FrameSource {
    /// Block until the next frame is available
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;

    /// Release the underlying device or files
    fn release(&mut self) {}
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        (**self).next_frame()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// File extensions decoded by [`ImageSequenceSource`]
const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "ppm"];

/// Replays a directory of still images in file-name order
pub struct ImageSequenceSource {
    paths: VecDeque<PathBuf>,
    frame_interval_ns: u64,
    sequence: u32,
    released: bool,
}

impl ImageSequenceSource {
    /// Open every supported image in `dir`
    pub fn open(dir: impl AsRef<Path>, config: &CameraConfig) -> Result<Self, CameraError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(CameraError::Open(format!("{} is not a directory", dir.display())));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(CameraError::Open(format!("no images found in {}", dir.display())));
        }

        info!("Opened image sequence {} ({} frames)", dir.display(), paths.len());
        Ok(Self {
            paths: paths.into(),
            frame_interval_ns: config.frame_interval_ns(),
            sequence: 0,
            released: false,
        })
    }

    /// Frames not yet read
    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.released {
            return Err(CameraError::Released);
        }
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };

        let image = image::open(&path).map_err(|source| CameraError::Decode {
            path: path.display().to_string(),
            source,
        })?;
        let timestamp_ns = u64::from(self.sequence) * self.frame_interval_ns;
        let frame = VideoFrame::from_rgb_image(image.to_rgb8(), timestamp_ns, self.sequence);
        debug!("Decoded {} as frame {}", path.display(), self.sequence);
        self.sequence = self.sequence.wrapping_add(1);
        Ok(Some(frame))
    }

    fn release(&mut self) {
        if !self.released {
            debug!("Releasing image sequence ({} frames unread)", self.paths.len());
            self.paths.clear();
            self.released = true;
        }
    }
}

/// Replays frames already in memory
#[derive(Debug, Default)]
pub struct MemorySource {
    frames: VecDeque<VideoFrame>,
    released: bool,
}

impl MemorySource {
    pub fn new(frames: impl IntoIterator<Item = VideoFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            released: false,
        }
    }

    /// Queue another frame at the end of the stream
    pub fn push(&mut self, frame: VideoFrame) {
        self.frames.push_back(frame);
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.released {
            return Err(CameraError::Released);
        }
        Ok(self.frames.pop_front())
    }

    fn release(&mut self) {
        self.frames.clear();
        self.released = true;
    }
}
