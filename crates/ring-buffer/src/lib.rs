//! Fixed-Depth Sliding Buffer
//!
//! Keeps the most recent per-frame detections for multi-frame smoothing.
//! The buffer is always full: it starts padded with default entries and every
//! push evicts the oldest one.

mod buffer;

pub use buffer::{SlidingBuffer, DEFAULT_DEPTH};
