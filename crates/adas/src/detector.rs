//! Frame-by-frame lane position detector

use camera_capture::VideoFrame;
use tracing::{debug, info};

use crate::analysis::{DisplayFrames, FrameOutput, LaneEvent};
use crate::annotate;
use crate::classifier::LineClassifier;
use crate::geometry::EdgeGeometryPipeline;
use crate::position::VehiclePositionStateMachine;
use crate::roi::RegionExtractor;
use crate::smoother::TemporalSmoother;
use crate::width::RunningWidthEstimator;
use crate::{AdasConfig, AdasError, LiveSettings};

/// Values read from the shared state before each frame
#[derive(Debug, Clone, Default)]
pub struct FrameInputs {
    pub settings: LiveSettings,
    pub below_speed_threshold: bool,
}

/// Runs every stage on one frame at a time and keeps the cross-frame state
pub struct LanePositionDetector {
    config: AdasConfig,
    region: RegionExtractor,
    pipeline: EdgeGeometryPipeline,
    classifier: LineClassifier,
    smoother: TemporalSmoother,
    width: RunningWidthEstimator,
    position: VehiclePositionStateMachine,
    frames_processed: u64,
}

impl LanePositionDetector {
    /// Create a detector for the configured camera resolution
    pub fn new(config: AdasConfig) -> Result<Self, AdasError> {
        config.validate()?;
        let cal = &config.calibration;

        let detector = Self {
            region: RegionExtractor::new(&config)?,
            pipeline: EdgeGeometryPipeline::new(cal),
            classifier: LineClassifier::new(cal),
            smoother: TemporalSmoother::new(cal.history_depth),
            width: RunningWidthEstimator::new(cal),
            position: VehiclePositionStateMachine::new(cal, config.ambiguity_policy),
            frames_processed: 0,
            config,
        };
        info!(
            "Lane detector ready for {}x{} frames ({:?} ambiguity policy)",
            detector.config.frame_width, detector.config.frame_height, detector.config.ambiguity_policy
        );
        Ok(detector)
    }

    /// Process one frame.
    ///
    /// Errors are configuration errors for this frame only; detector state
    /// is left untouched by a failed frame.
    pub fn process_frame(
        &mut self,
        frame: &VideoFrame,
        inputs: &FrameInputs,
    ) -> Result<FrameOutput, AdasError> {
        let settings = &inputs.settings;
        settings.validate()?;
        let roi = self.region.extract(frame)?;
        let geometry = self.pipeline.process(&roi, settings)?;

        let classification = self.classifier.classify(&geometry.segments);
        let averaged = self.smoother.update(&classification);
        self.width.update(&averaged, settings.vehicle_width_m);
        let bounds = self.width.average();

        let gating = self
            .position
            .step(&averaged, bounds, inputs.below_speed_threshold);
        let evaluated = gating.is_none();
        self.frames_processed += 1;

        let event = LaneEvent {
            sequence: frame.sequence,
            timestamp_ns: frame.timestamp_ns,
            state: self.position.state(),
            flags: self.position.flags(),
            geometry: averaged,
            vehicle_bounds: bounds,
            segment_count: geometry.segments.len(),
            evaluated,
            gating,
        };
        debug!(
            "Frame {}: {:?} {:?} gating={:?}",
            event.sequence, event.state, event.flags, event.gating
        );

        let displays = DisplayFrames {
            full: frame.to_rgb_image(),
            roi: annotate::roi_frame(&roi, settings),
            warped: annotate::gray_frame(&geometry.warped),
            processed: evaluated.then(|| {
                annotate::processed_frame(&geometry.edges, &geometry.segments, &averaged, bounds)
            }),
        };

        Ok(FrameOutput { event, displays })
    }

    /// Forget all history, as if freshly created
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.width.reset();
        self.position.reset();
        self.frames_processed = 0;
        info!("Lane detector reset");
    }

    pub fn config(&self) -> &AdasConfig {
        &self.config
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GatingReason, PositionState};

    /// VGA frame whose ROI shows a double-line divider and a right lane line
    fn divider_scene() -> VideoFrame {
        scene(&[(40, 48), (60, 68), (288, 296)])
    }

    /// VGA frame with white stripes at the given canonical column ranges
    fn scene(stripes: &[(u32, u32)]) -> VideoFrame {
        let mut frame = VideoFrame::solid(640, 480, [30, 30, 30]);
        for y in 210..270 {
            for &(start, end) in stripes {
                for x in (160 + start)..(160 + end) {
                    let idx = ((y * 640 + x) * 3) as usize;
                    frame.data[idx..idx + 3].copy_from_slice(&[250, 250, 250]);
                }
            }
        }
        frame
    }

    fn wide_vehicle() -> FrameInputs {
        FrameInputs {
            settings: LiveSettings {
                vehicle_width_m: 3.0,
                ..Default::default()
            },
            below_speed_threshold: false,
        }
    }

    #[test]
    fn test_end_to_end_over_divider() {
        let mut detector = LanePositionDetector::new(AdasConfig::default()).unwrap();
        let frame = divider_scene();
        let inputs = wide_vehicle();

        for i in 1..30u32 {
            let out = detector
                .process_frame(&frame.clone().with_sequence(0, i), &inputs)
                .unwrap();
            assert_eq!(out.event.state, PositionState::NoLane, "frame {}", i);
            assert_eq!(out.event.gating, Some(GatingReason::Warmup));
            assert!(!out.event.flags.any());
            assert!(out.displays.processed.is_none());
        }

        let out = detector.process_frame(&frame, &inputs).unwrap();
        assert!(out.event.evaluated);
        assert!((6..=8).contains(&out.event.segment_count));
        assert_eq!(out.event.state, PositionState::OverDivider);
        let x4 = out.event.geometry.divider_x4().unwrap();
        assert!(out.event.vehicle_bounds.unwrap().left < x4);
        assert!(out.displays.processed.is_some());
        // Debounced: first evaluated frame differs from the gated NoLane
        assert!(!out.event.flags.crossed_divider);

        let out = detector.process_frame(&frame, &inputs).unwrap();
        assert!(out.event.flags.crossed_divider);
        assert_eq!(detector.frames_processed(), 31);
    }

    #[test]
    fn test_speed_gate() {
        let mut detector = LanePositionDetector::new(AdasConfig::default()).unwrap();
        let frame = divider_scene();
        let mut inputs = wide_vehicle();
        for _ in 0..30 {
            detector.process_frame(&frame, &inputs).unwrap();
        }

        inputs.below_speed_threshold = true;
        let out = detector.process_frame(&frame, &inputs).unwrap();
        assert_eq!(out.event.state, PositionState::NoLane);
        assert_eq!(out.event.gating, Some(GatingReason::BelowSpeedThreshold));
        assert!(!out.event.flags.any());
        assert!(out.displays.processed.is_none());
    }

    #[test]
    fn test_blank_road_has_no_width() {
        let mut detector = LanePositionDetector::new(AdasConfig::default()).unwrap();
        let frame = scene(&[]);
        let mut last = None;
        for _ in 0..31 {
            last = Some(detector.process_frame(&frame, &FrameInputs::default()).unwrap());
        }
        let event = last.unwrap().event;
        assert_eq!(event.gating, Some(GatingReason::NoWidthEstimate));
        assert_eq!(event.segment_count, 0);
        assert!(event.vehicle_bounds.is_none());
    }

    #[test]
    fn test_configuration_errors() {
        let mut detector = LanePositionDetector::new(AdasConfig::default()).unwrap();

        let wrong = VideoFrame::solid(800, 600, [0, 0, 0]);
        assert!(matches!(
            detector.process_frame(&wrong, &FrameInputs::default()),
            Err(AdasError::ResolutionMismatch { .. })
        ));

        let inputs = FrameInputs {
            settings: LiveSettings {
                first_row_for_warping: 60,
                ..Default::default()
            },
            below_speed_threshold: false,
        };
        assert!(matches!(
            detector.process_frame(&scene(&[]), &inputs),
            Err(AdasError::InvalidSetting { .. })
        ));
        assert_eq!(detector.frames_processed(), 0);

        assert!(LanePositionDetector::new(AdasConfig::for_resolution(160, 120)).is_err());
    }

    #[test]
    fn test_reset_restarts_warmup() {
        let mut detector = LanePositionDetector::new(AdasConfig::default()).unwrap();
        let frame = divider_scene();
        let inputs = wide_vehicle();
        for _ in 0..30 {
            detector.process_frame(&frame, &inputs).unwrap();
        }
        detector.reset();

        let out = detector.process_frame(&frame, &inputs).unwrap();
        assert_eq!(out.event.gating, Some(GatingReason::Warmup));
        assert_eq!(detector.frames_processed(), 1);
    }

    #[test]
    fn test_display_sizes() {
        let mut detector = LanePositionDetector::new(AdasConfig::default()).unwrap();
        let out = detector.process_frame(&divider_scene(), &wide_vehicle()).unwrap();
        assert_eq!(out.displays.full.dimensions(), (640, 480));
        assert_eq!(out.displays.roi.dimensions(), (320, 60));
        assert_eq!(out.displays.warped.dimensions(), (320, 60));
    }
}
