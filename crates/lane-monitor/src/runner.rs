//! Cooperative frame loop
//!
//! One frame is read, processed and published before the next is
//! requested. The loop stops when shutdown is requested, the source ends,
//! or the source fails; it never retries.

use std::io::Write;
use std::sync::Arc;

use adas::{FrameInputs, LanePositionDetector};
use camera_capture::FrameSource;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::events::EventLog;
use crate::store::StateStore;

/// Why the loop ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    ShutdownRequested,
    EndOfStream,
    SourceFailed(String),
}

/// Loop statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub frames_read: u64,
    pub frames_processed: u64,
    /// Frames rejected by the detector
    pub frame_errors: u64,
    pub stop_reason: StopReason,
}

pub struct FrameLoop {
    detector: LanePositionDetector,
    store: Arc<dyn StateStore>,
    event_log: Option<EventLog<Box<dyn Write + Send>>>,
}

impl FrameLoop {
    pub fn new(detector: LanePositionDetector, store: Arc<dyn StateStore>) -> Self {
        Self {
            detector,
            store,
            event_log: None,
        }
    }

    /// Also write every event to `log`
    pub fn with_event_log(mut self, log: EventLog<Box<dyn Write + Send>>) -> Self {
        self.event_log = Some(log);
        self
    }

    pub fn detector(&self) -> &LanePositionDetector {
        &self.detector
    }

    /// Run until shutdown or the end of `source`, then release it
    pub fn run<F: FrameSource + ?Sized>(&mut self, source: &mut F) -> RunSummary {
        info!("Frame loop started");
        let mut frames_read = 0u64;
        let mut frames_processed = 0u64;
        let mut frame_errors = 0u64;

        let stop_reason = loop {
            if self.store.shutdown_requested() {
                break StopReason::ShutdownRequested;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break StopReason::EndOfStream,
                Err(e) => {
                    error!("Frame source failed: {}", e);
                    break StopReason::SourceFailed(e.to_string());
                }
            };
            frames_read += 1;

            let inputs = FrameInputs {
                settings: self.store.settings(),
                below_speed_threshold: self.store.below_speed_threshold(),
            };
            match self.detector.process_frame(&frame, &inputs) {
                Ok(output) => {
                    self.store.apply(&output);
                    frames_processed += 1;
                    if let Some(log) = self.event_log.as_mut() {
                        if let Err(e) = log.append(&output.event) {
                            warn!("Dropping event log after write failure: {}", e);
                            self.event_log = None;
                        }
                    }
                }
                Err(e) => {
                    warn!("Frame {} skipped: {}", frame.sequence, e);
                    frame_errors += 1;
                }
            }
        };

        source.release();
        if let Some(log) = self.event_log.as_mut() {
            if let Err(e) = log.flush() {
                warn!("Failed to flush event log: {}", e);
            }
            debug!("{} events logged", log.written());
        }

        let summary = RunSummary {
            frames_read,
            frames_processed,
            frame_errors,
            stop_reason,
        };
        info!("Frame loop stopped: {:?}", summary);
        summary
    }
}
