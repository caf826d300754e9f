//! Vehicle position state machine
//!
//! Decides where the vehicle sits relative to the averaged lane and divider
//! lines, then latches alert flags only when the same state is seen on two
//! consecutive frames.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analysis::GatingReason;
use crate::calibration::Calibration;
use crate::config::AmbiguityPolicy;
use crate::smoother::AveragedGeometry;
use crate::width::VehicleBounds;

/// Vehicle position relative to the road markings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionState {
    Undetermined,
    InLane,
    OutLane,
    OverDivider,
    #[default]
    NoLane,
}

impl PositionState {
    /// Flags this state latches; `None` leaves the flags untouched
    fn flags(self) -> Option<AlertFlags> {
        let flags = match self {
            Self::Undetermined => return None,
            Self::InLane => AlertFlags::default(),
            Self::OutLane => AlertFlags {
                crossed_lane: true,
                ..Default::default()
            },
            Self::OverDivider => AlertFlags {
                crossed_divider: true,
                ..Default::default()
            },
            Self::NoLane => AlertFlags {
                nothing_detected: true,
                ..Default::default()
            },
        };
        Some(flags)
    }
}

/// Debounced alert flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertFlags {
    pub crossed_lane: bool,
    pub crossed_divider: bool,
    pub nothing_detected: bool,
}

impl AlertFlags {
    pub fn any(&self) -> bool {
        self.crossed_lane || self.crossed_divider || self.nothing_detected
    }
}

pub struct VehiclePositionStateMachine {
    warmup_frames: u32,
    frames_seen: u32,
    policy: AmbiguityPolicy,
    state: PositionState,
    previous: Option<PositionState>,
    flags: AlertFlags,
}

impl VehiclePositionStateMachine {
    pub fn new(calibration: &Calibration, policy: AmbiguityPolicy) -> Self {
        Self {
            warmup_frames: calibration.warmup_frames,
            frames_seen: 0,
            policy,
            state: PositionState::NoLane,
            previous: None,
            flags: AlertFlags::default(),
        }
    }

    /// Advance by one processed frame.
    ///
    /// Returns the reason the frame was not evaluated, or `None` when the
    /// state machine ran. A gated frame reports `NoLane` with all flags
    /// cleared.
    pub fn step(
        &mut self,
        geometry: &AveragedGeometry,
        bounds: Option<VehicleBounds>,
        below_speed_threshold: bool,
    ) -> Option<GatingReason> {
        if self.frames_seen < self.warmup_frames {
            self.frames_seen += 1;
            if self.frames_seen == self.warmup_frames {
                info!("Warm-up complete after {} frames", self.warmup_frames);
            }
        }

        let gate = if self.frames_seen < self.warmup_frames {
            Some(GatingReason::Warmup)
        } else if bounds.is_none() {
            Some(GatingReason::NoWidthEstimate)
        } else if below_speed_threshold {
            Some(GatingReason::BelowSpeedThreshold)
        } else {
            None
        };

        match (gate, bounds) {
            (None, Some(bounds)) => self.evaluate(geometry, bounds),
            (gate, _) => {
                self.state = PositionState::NoLane;
                self.flags = AlertFlags::default();
                self.previous = Some(self.state);
                gate
            }
        }
    }

    fn evaluate(&mut self, geometry: &AveragedGeometry, bounds: VehicleBounds) -> Option<GatingReason> {
        let prev = self.previous;
        let mut state = self.divider_check(prev, geometry.divider_x4(), bounds);
        if state == PositionState::Undetermined {
            state = self.lane_check(prev, geometry, bounds);
        }

        if prev == Some(state) {
            if let Some(flags) = state.flags() {
                if flags != self.flags {
                    debug!("Flags latched for {:?}: {:?}", state, flags);
                }
                self.flags = flags;
            }
        }
        if prev != Some(state) {
            debug!("Position {:?} -> {:?}", prev, state);
        }

        self.state = state;
        self.previous = Some(state);
        None
    }

    /// Over the divider while the left side is left of its outer edge; once
    /// over, an unseen divider keeps the vehicle there.
    fn divider_check(
        &self,
        prev: Option<PositionState>,
        divider_x4: Option<f32>,
        bounds: VehicleBounds,
    ) -> PositionState {
        let over = match (prev, divider_x4) {
            (Some(PositionState::OverDivider), None) => true,
            (_, Some(x4)) => bounds.left < x4,
            (_, None) => false,
        };
        if over {
            PositionState::OverDivider
        } else {
            PositionState::Undetermined
        }
    }

    fn lane_check(
        &self,
        prev: Option<PositionState>,
        geometry: &AveragedGeometry,
        bounds: VehicleBounds,
    ) -> PositionState {
        let VehicleBounds { left, right } = bounds;
        match (geometry.lane_x1, geometry.lane_x2) {
            (Some(x1), Some(x2)) => {
                if (left > x1 && right > x2) || (left < x1 && right < x2) {
                    PositionState::OutLane
                } else {
                    PositionState::InLane
                }
            }
            (Some(x1), None) => {
                if left < x1 && x1 < right {
                    PositionState::OutLane
                } else {
                    self.resolve_ambiguous(prev)
                }
            }
            _ => PositionState::NoLane,
        }
    }

    /// One lane line seen and the vehicle is not on it
    fn resolve_ambiguous(&self, prev: Option<PositionState>) -> PositionState {
        match (self.policy, prev) {
            (
                AmbiguityPolicy::HoldPrevious,
                Some(held @ (PositionState::InLane | PositionState::OutLane)),
            ) => held,
            _ => PositionState::Undetermined,
        }
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn flags(&self) -> AlertFlags {
        self.flags
    }

    pub fn is_warm(&self) -> bool {
        self.frames_seen >= self.warmup_frames
    }

    pub fn reset(&mut self) {
        self.frames_seen = 0;
        self.state = PositionState::NoLane;
        self.previous = None;
        self.flags = AlertFlags::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BOUNDS: VehicleBounds = VehicleBounds {
        left: 99.0,
        right: 219.0,
    };

    fn machine(policy: AmbiguityPolicy) -> VehiclePositionStateMachine {
        let cal = Calibration {
            warmup_frames: 1,
            ..Default::default()
        };
        VehiclePositionStateMachine::new(&cal, policy)
    }

    fn geometry(lane: (Option<f32>, Option<f32>), x4: Option<f32>) -> AveragedGeometry {
        AveragedGeometry {
            lane_x1: lane.0,
            lane_x2: lane.1,
            divider: x4.map(|x4| [x4 - 34.0, x4 - 24.0, x4 - 10.0, x4]),
        }
    }

    fn full_lane() -> AveragedGeometry {
        geometry((Some(50.0), Some(250.0)), None)
    }

    fn run(sm: &mut VehiclePositionStateMachine, g: &AveragedGeometry) -> PositionState {
        assert_eq!(sm.step(g, Some(BOUNDS), false), None);
        sm.state()
    }

    #[test]
    fn test_warmup_gates_first_frames() {
        let mut sm = VehiclePositionStateMachine::new(&Calibration::default(), AmbiguityPolicy::default());
        for _ in 0..29 {
            assert_eq!(sm.step(&full_lane(), Some(BOUNDS), false), Some(GatingReason::Warmup));
            assert_eq!(sm.state(), PositionState::NoLane);
            assert!(!sm.flags().any());
        }
        assert!(!sm.is_warm());
        assert_eq!(sm.step(&full_lane(), Some(BOUNDS), false), None);
        assert!(sm.is_warm());
        assert_eq!(sm.state(), PositionState::InLane);
    }

    #[test]
    fn test_gating_reasons() {
        let mut sm = machine(AmbiguityPolicy::default());
        assert_eq!(sm.step(&full_lane(), None, false), Some(GatingReason::NoWidthEstimate));
        assert_eq!(
            sm.step(&full_lane(), Some(BOUNDS), true),
            Some(GatingReason::BelowSpeedThreshold)
        );
        assert_eq!(sm.state(), PositionState::NoLane);
        // Gated NoLane never latches nothing_detected
        assert!(!sm.flags().any());
    }

    #[test]
    fn test_in_and_out_of_lane() {
        let mut sm = machine(AmbiguityPolicy::default());
        assert_eq!(run(&mut sm, &full_lane()), PositionState::InLane);

        // Lane shifted right of the vehicle
        let shifted = geometry((Some(120.0), Some(330.0)), None);
        assert_eq!(run(&mut sm, &shifted), PositionState::OutLane);

        // Lane shifted left
        let shifted = geometry((Some(0.0), Some(200.0)), None);
        assert_eq!(run(&mut sm, &shifted), PositionState::OutLane);
    }

    #[test]
    fn test_debounce_needs_two_frames() {
        let mut sm = machine(AmbiguityPolicy::default());
        let out = geometry((Some(120.0), Some(330.0)), None);

        run(&mut sm, &out);
        assert!(!sm.flags().crossed_lane);
        run(&mut sm, &out);
        assert!(sm.flags().crossed_lane);

        // Single in-lane spike leaves the flag set
        run(&mut sm, &full_lane());
        assert!(sm.flags().crossed_lane);
        run(&mut sm, &full_lane());
        assert!(!sm.flags().any());
    }

    #[test]
    fn test_over_divider_sticky_without_divider() {
        let mut sm = machine(AmbiguityPolicy::default());
        let divider = geometry((Some(50.0), Some(250.0)), Some(135.0));

        assert_eq!(run(&mut sm, &divider), PositionState::OverDivider);
        assert_eq!(run(&mut sm, &divider), PositionState::OverDivider);
        assert!(sm.flags().crossed_divider);

        // Divider lost: stay over it
        for _ in 0..5 {
            assert_eq!(run(&mut sm, &full_lane()), PositionState::OverDivider);
        }
        assert!(sm.flags().crossed_divider);

        // Divider seen left of the vehicle again
        let passed = geometry((Some(50.0), Some(250.0)), Some(90.0));
        assert_eq!(run(&mut sm, &passed), PositionState::InLane);
    }

    #[test]
    fn test_unseen_divider_not_entered() {
        let mut sm = machine(AmbiguityPolicy::default());
        assert_eq!(run(&mut sm, &full_lane()), PositionState::InLane);
        let left_of_vehicle = geometry((Some(50.0), Some(250.0)), Some(99.0));
        assert_eq!(run(&mut sm, &left_of_vehicle), PositionState::InLane);
    }

    #[test]
    fn test_no_lane_latches_nothing_detected() {
        let mut sm = machine(AmbiguityPolicy::default());
        let empty = AveragedGeometry::default();
        assert_eq!(run(&mut sm, &empty), PositionState::NoLane);
        assert_eq!(run(&mut sm, &empty), PositionState::NoLane);
        assert!(sm.flags().nothing_detected);
    }

    #[test]
    fn test_single_line_straddled() {
        let mut sm = machine(AmbiguityPolicy::Surface);
        let single = geometry((Some(150.0), None), None);
        assert_eq!(run(&mut sm, &single), PositionState::OutLane);
    }

    #[test]
    fn test_single_line_ambiguity_policies() {
        let single = geometry((Some(20.0), None), None);

        let mut hold = machine(AmbiguityPolicy::HoldPrevious);
        run(&mut hold, &full_lane());
        assert_eq!(run(&mut hold, &single), PositionState::InLane);

        let mut surface = machine(AmbiguityPolicy::Surface);
        run(&mut surface, &full_lane());
        run(&mut surface, &full_lane());
        assert_eq!(run(&mut surface, &single), PositionState::Undetermined);
        assert_eq!(run(&mut surface, &single), PositionState::Undetermined);
        // Undetermined keeps the last latched flags
        assert_eq!(surface.flags(), AlertFlags::default());
    }

    #[test]
    fn test_hold_previous_ignores_gated_no_lane() {
        let mut sm = machine(AmbiguityPolicy::HoldPrevious);
        let single = geometry((Some(20.0), None), None);
        assert_eq!(sm.step(&single, Some(BOUNDS), true), Some(GatingReason::BelowSpeedThreshold));
        assert_eq!(sm.state(), PositionState::NoLane);

        assert_eq!(run(&mut sm, &single), PositionState::Undetermined);
        assert_eq!(run(&mut sm, &single), PositionState::Undetermined);
        assert!(!sm.flags().nothing_detected);
    }

    #[test]
    fn test_hold_previous_from_no_lane_is_undetermined() {
        let mut sm = machine(AmbiguityPolicy::HoldPrevious);
        assert_eq!(run(&mut sm, &AveragedGeometry::default()), PositionState::NoLane);
        let single = geometry((Some(20.0), None), None);
        assert_eq!(run(&mut sm, &single), PositionState::Undetermined);
    }

    #[test]
    fn test_hold_previous_from_divider_is_undetermined() {
        let mut sm = machine(AmbiguityPolicy::HoldPrevious);
        let divider = geometry((Some(20.0), None), Some(135.0));
        assert_eq!(run(&mut sm, &divider), PositionState::OverDivider);
        let passed = geometry((Some(20.0), None), Some(90.0));
        assert_eq!(run(&mut sm, &passed), PositionState::Undetermined);
    }

    #[test]
    fn test_reset() {
        let mut sm = machine(AmbiguityPolicy::default());
        run(&mut sm, &full_lane());
        sm.reset();
        assert!(!sm.is_warm());
        assert_eq!(sm.state(), PositionState::NoLane);
    }

    fn arb_geometry() -> impl Strategy<Value = AveragedGeometry> {
        (
            proptest::option::of(0.0f32..320.0),
            proptest::option::of(0.0f32..320.0),
            proptest::option::of(0.0f32..320.0),
        )
            .prop_map(|(x1, x2, x4)| geometry((x1, x1.and(x2)), x4))
    }

    proptest! {
        #[test]
        fn prop_flags_follow_repeated_states(frames in proptest::collection::vec(arb_geometry(), 1..40)) {
            let mut sm = machine(AmbiguityPolicy::default());
            let mut previous = None;
            for g in &frames {
                let before = sm.flags();
                run(&mut sm, g);
                let state = sm.state();
                if previous != Some(state) {
                    prop_assert_eq!(sm.flags(), before);
                }
                previous = Some(state);
            }
        }
    }
}
