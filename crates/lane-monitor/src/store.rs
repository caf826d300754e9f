//! Shared state store
//!
//! Single source of truth between the frame loop and the speed, alert and
//! display collaborators. Every read returns a copy and every write replaces
//! whole fields under one lock, so readers never see a half-applied frame.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use adas::{AlertFlags, DisplayFrames, FrameOutput, LaneEvent, LiveSettings, PositionState};
use serde::Serialize;
use tracing::{debug, info};

use crate::MonitorError;

/// Typed access to the shared state
pub trait StateStore: Send + Sync {
    /// Current live settings
    fn settings(&self) -> LiveSettings;

    /// Replace the live settings; invalid settings are rejected
    fn set_settings(&self, settings: LiveSettings) -> Result<(), MonitorError>;

    fn shutdown_requested(&self) -> bool;

    fn request_shutdown(&self);

    fn below_speed_threshold(&self) -> bool;

    /// Set the speed gate; a change latches the crossed-threshold flag
    fn set_below_speed_threshold(&self, below: bool);

    /// Read and clear the crossed-threshold flag
    fn take_speed_threshold_crossed(&self) -> bool;

    /// Publish one frame's results
    fn apply(&self, output: &FrameOutput);

    fn snapshot(&self) -> MonitorSnapshot;
}

/// Point-in-time copy of the store, without display images
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorSnapshot {
    pub settings: LiveSettings,
    pub shutdown_requested: bool,
    pub below_speed_threshold: bool,
    pub speed_threshold_crossed: bool,
    pub state: PositionState,
    pub flags: AlertFlags,
    pub last_event: Option<LaneEvent>,
    pub frames_applied: u64,
}

#[derive(Default)]
struct Inner {
    snapshot: MonitorSnapshot,
    displays: Option<DisplayFrames>,
}

/// In-process store guarded by a read-write lock
#[derive(Default)]
pub struct SharedStateStore {
    inner: RwLock<Inner>,
}

impl SharedStateStore {
    pub fn new(settings: LiveSettings) -> Self {
        Self {
            inner: RwLock::new(Inner {
                snapshot: MonitorSnapshot {
                    settings,
                    ..Default::default()
                },
                displays: None,
            }),
        }
    }

    /// Latest display images for the monitoring UI
    pub fn displays(&self) -> Option<DisplayFrames> {
        self.read().displays.clone()
    }

    // A writer that panicked leaves whole fields behind, never partial ones
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateStore for SharedStateStore {
    fn settings(&self) -> LiveSettings {
        self.read().snapshot.settings.clone()
    }

    fn set_settings(&self, settings: LiveSettings) -> Result<(), MonitorError> {
        settings.validate()?;
        info!("Live settings updated: {:?}", settings);
        self.write().snapshot.settings = settings;
        Ok(())
    }

    fn shutdown_requested(&self) -> bool {
        self.read().snapshot.shutdown_requested
    }

    fn request_shutdown(&self) {
        info!("Shutdown requested");
        self.write().snapshot.shutdown_requested = true;
    }

    fn below_speed_threshold(&self) -> bool {
        self.read().snapshot.below_speed_threshold
    }

    fn set_below_speed_threshold(&self, below: bool) {
        let mut inner = self.write();
        let snapshot = &mut inner.snapshot;
        if snapshot.below_speed_threshold != below {
            debug!("Below speed threshold: {}", below);
            snapshot.speed_threshold_crossed = true;
        }
        snapshot.below_speed_threshold = below;
    }

    fn take_speed_threshold_crossed(&self) -> bool {
        std::mem::take(&mut self.write().snapshot.speed_threshold_crossed)
    }

    fn apply(&self, output: &FrameOutput) {
        let mut inner = self.write();
        inner.snapshot.state = output.event.state;
        inner.snapshot.flags = output.event.flags;
        inner.snapshot.last_event = Some(output.event.clone());
        inner.snapshot.frames_applied += 1;
        inner.displays = Some(output.displays.clone());
    }

    fn snapshot(&self) -> MonitorSnapshot {
        self.read().snapshot.clone()
    }
}

/// Turns vehicle speed readings into the below-threshold gate
#[derive(Debug, Clone, Copy)]
pub struct SpeedGate {
    threshold_kmh: f32,
}

impl SpeedGate {
    pub fn new(threshold_kmh: f32) -> Self {
        Self { threshold_kmh }
    }

    pub fn threshold_kmh(&self) -> f32 {
        self.threshold_kmh
    }

    /// Record one speed reading; returns whether the vehicle is below threshold
    pub fn update(&self, store: &dyn StateStore, speed_kmh: f32) -> bool {
        let below = speed_kmh < self.threshold_kmh;
        store.set_below_speed_threshold(below);
        below
    }
}

impl Default for SpeedGate {
    fn default() -> Self {
        Self::new(48.0)
    }
}
