//! Monitor settings
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML file, then `LANE_MONITOR__SECTION__KEY` environment variables.

use std::path::{Path, PathBuf};

use adas::{AdasConfig, AdasError, AmbiguityPolicy, Calibration, LiveSettings};
use camera_capture::CameraConfig;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::SpeedGate;
use crate::MonitorError;

pub const ENV_PREFIX: &str = "LANE_MONITOR";

/// Road camera section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Directory of recorded frames to replay
    pub frames: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        let camera = CameraConfig::default();
        Self {
            frames: None,
            width: camera.width,
            height: camera.height,
            fps: camera.fps,
        }
    }
}

impl CameraSettings {
    pub fn camera_config(&self) -> CameraConfig {
        CameraConfig {
            width: self.width,
            height: self.height,
            fps: self.fps,
        }
    }
}

/// Speed gate section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedSettings {
    /// Alerts are silenced below this speed
    pub threshold_kmh: f32,
}

impl Default for SpeedSettings {
    fn default() -> Self {
        Self {
            threshold_kmh: SpeedGate::default().threshold_kmh(),
        }
    }
}

impl SpeedSettings {
    pub fn gate(&self) -> SpeedGate {
        SpeedGate::new(self.threshold_kmh)
    }

    pub fn validate(&self) -> Result<(), AdasError> {
        if !self.threshold_kmh.is_finite() || self.threshold_kmh <= 0.0 {
            return Err(AdasError::InvalidSetting {
                name: "threshold_kmh",
                reason: format!("must be a positive speed, got {}", self.threshold_kmh),
            });
        }
        Ok(())
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub camera: CameraSettings,
    /// Initial live settings
    pub detector: LiveSettings,
    pub calibration: Calibration,
    pub speed: SpeedSettings,
    pub policy: AmbiguityPolicy,
}

impl MonitorSettings {
    /// Defaults tuned for US roads (10 ft lanes)
    pub fn us_roads() -> Self {
        Self {
            calibration: Calibration::us_lane(),
            ..Default::default()
        }
    }

    /// Load defaults, then `path` if given, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, MonitorError> {
        Self::load_from(&Self::default(), path)
    }

    /// Like [`load`](Self::load), layered over `base` instead of the defaults
    pub fn load_from(base: &Self, path: Option<&Path>) -> Result<Self, MonitorError> {
        Self::load_with_prefix(base, path, ENV_PREFIX)
    }

    fn load_with_prefix(base: &Self, path: Option<&Path>, prefix: &str) -> Result<Self, MonitorError> {
        let mut builder = Config::builder().add_source(Config::try_from(base)?);
        if let Some(path) = path {
            info!("Loading settings from {}", path.display());
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        let settings: Self = builder
            .add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        self.detector.validate()?;
        self.speed.validate()?;
        self.adas_config().validate()?;
        Ok(())
    }

    /// Static detector configuration
    pub fn adas_config(&self) -> AdasConfig {
        AdasConfig {
            frame_width: self.camera.width,
            frame_height: self.camera.height,
            ambiguity_policy: self.policy,
            calibration: self.calibration.clone(),
        }
    }
}
