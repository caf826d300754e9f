//! Alert selection for the audible collaborator

use std::time::Duration;

use adas::AlertFlags;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::StateStore;

/// Alert the piezo should play next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Vehicle speed moved across the alert threshold
    SpeedThresholdCrossed,
    Divider,
    Lane,
}

/// Tone sequence for one alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeepPattern {
    pub beeps: u32,
    pub on: Duration,
    pub off: Duration,
    /// Quiet time after the last beep
    pub pause: Duration,
    pub frequency_hz: u32,
}

impl AlertKind {
    /// Departure alert for the current flags. Nothing plays below the speed
    /// threshold; `nothing_detected` is status only.
    pub fn from_flags(flags: &AlertFlags, below_speed_threshold: bool) -> Option<Self> {
        if below_speed_threshold {
            return None;
        }
        if flags.crossed_divider {
            Some(Self::Divider)
        } else if flags.crossed_lane {
            Some(Self::Lane)
        } else {
            None
        }
    }

    /// Next alert from the store, consuming a pending speed-threshold crossing
    pub fn next(store: &dyn StateStore) -> Option<Self> {
        if store.take_speed_threshold_crossed() {
            debug!("Speed threshold crossed");
            return Some(Self::SpeedThresholdCrossed);
        }
        let snapshot = store.snapshot();
        Self::from_flags(&snapshot.flags, snapshot.below_speed_threshold)
    }

    pub fn pattern(self) -> BeepPattern {
        match self {
            Self::SpeedThresholdCrossed => BeepPattern {
                beeps: 1,
                on: Duration::from_secs(1),
                off: Duration::ZERO,
                pause: Duration::from_secs(1),
                frequency_hz: 1700,
            },
            Self::Divider | Self::Lane => BeepPattern {
                beeps: 3,
                on: Duration::from_millis(250),
                off: Duration::from_millis(750),
                pause: Duration::from_secs(2),
                frequency_hz: 1700,
            },
        }
    }
}

impl BeepPattern {
    /// Time from the first tone to the end of the pause
    pub fn total(&self) -> Duration {
        (self.on + self.off) * self.beeps + self.pause
    }
}
