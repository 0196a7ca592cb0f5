//! Configuration loading
//!
//! The document is TOML. Every key is optional; an absent file means the
//! built-in defaults.
//!
//! ```toml
//! imu_sensor = "camera_imu"
//! telemetry_every = 1
//!
//! [pitch]
//! joint = "cgo3_camera_joint"
//! p = 4.0
//! cmd_max = 0.25
//!
//! [topics]
//! pitch_command = "~/gimbal_pitch_cmd"
//!
//! [runtime]
//! step_ms = 4
//! ```

use std::io::ErrorKind;
use std::path::Path;

use log::{info, warn};
use serde::Deserialize;

use crate::actuator::controller::PidGains;
use crate::axis::{Axis, AxisMap};
use crate::error::{GimbalError, Result};

pub const DEFAULT_IMU_SENSOR: &str = "camera_imu";

pub fn default_joint_name(axis: Axis) -> &'static str {
    match axis {
        Axis::Pitch => "cgo3_camera_joint",
        Axis::Roll => "cgo3_horizontal_arm_joint",
        Axis::Yaw => "cgo3_vertical_arm_joint",
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GimbalConfig {
    /// Orientation sensor name. Empty runs on joint readback only.
    pub imu_sensor: Option<String>,
    /// Publish telemetry every n-th completed tick.
    pub telemetry_every: u32,
    /// Measure yaw from the yaw joint (body frame) even when an IMU is used.
    pub yaw_from_joint: bool,
    pub pitch: AxisConfig,
    pub roll: AxisConfig,
    pub yaw: AxisConfig,
    pub topics: TopicConfig,
    pub runtime: RuntimeConfig,
}

impl Default for GimbalConfig {
    fn default() -> Self {
        Self {
            imu_sensor: Some(DEFAULT_IMU_SENSOR.to_string()),
            telemetry_every: 1,
            yaw_from_joint: false,
            pitch: AxisConfig::default(),
            roll: AxisConfig::default(),
            yaw: AxisConfig::default(),
            topics: TopicConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl GimbalConfig {
    pub fn axis(&self, axis: Axis) -> &AxisConfig {
        match axis {
            Axis::Pitch => &self.pitch,
            Axis::Roll => &self.roll,
            Axis::Yaw => &self.yaw,
        }
    }

    pub fn joint_name(&self, axis: Axis) -> String {
        self.axis(axis)
            .joint
            .clone()
            .unwrap_or_else(|| default_joint_name(axis).to_string())
    }

    /// Joint command sign per axis; anything but a negative value means +1.
    pub fn directions(&self) -> AxisMap<f64> {
        AxisMap::from_fn(|axis| if self.axis(axis).direction < 0.0 { -1.0 } else { 1.0 })
    }

    /// Merges the per-axis overrides onto the defaults and validates them.
    pub fn controller_gains(&self) -> Result<ControllerGains> {
        let mut gains = ControllerGains::default();
        for axis in Axis::ALL {
            let merged = self.axis(axis).overrides.apply(PidGains::default_for(axis));
            merged.validate(axis)?;
            gains.axes[axis] = merged;
        }
        Ok(gains)
    }

    /// Configured orientation sensor; an empty name disables the IMU.
    pub fn imu_sensor_name(&self) -> Option<&str> {
        self.imu_sensor.as_deref().filter(|name| !name.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AxisConfig {
    pub joint: Option<String>,
    pub direction: f64,
    #[serde(flatten)]
    pub overrides: GainOverrides,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            joint: None,
            direction: 1.0,
            overrides: GainOverrides::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GainOverrides {
    pub p: Option<f64>,
    pub i: Option<f64>,
    pub d: Option<f64>,
    pub i_min: Option<f64>,
    pub i_max: Option<f64>,
    pub cmd_min: Option<f64>,
    pub cmd_max: Option<f64>,
}

impl GainOverrides {
    pub fn apply(&self, base: PidGains) -> PidGains {
        PidGains {
            p: self.p.unwrap_or(base.p),
            i: self.i.unwrap_or(base.i),
            d: self.d.unwrap_or(base.d),
            i_min: self.i_min.unwrap_or(base.i_min),
            i_max: self.i_max.unwrap_or(base.i_max),
            cmd_min: self.cmd_min.unwrap_or(base.cmd_min),
            cmd_max: self.cmd_max.unwrap_or(base.cmd_max),
        }
    }
}

/// Immutable per-axis gains, built once at setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerGains {
    axes: AxisMap<PidGains>,
}

impl Default for ControllerGains {
    fn default() -> Self {
        Self {
            axes: AxisMap::from_fn(PidGains::default_for),
        }
    }
}

impl ControllerGains {
    pub fn get(&self, axis: Axis) -> PidGains {
        self.axes[axis]
    }
}

/// Transport topic names. Setpoint commands are routed to an axis by the
/// topic they arrive on.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    pub imu: String,
    pub pitch_command: String,
    pub roll_command: String,
    pub yaw_command: String,
    pub pitch_status: String,
    pub roll_status: String,
    pub yaw_status: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            imu: "~/camera_imu".to_string(),
            pitch_command: "~/gimbal_pitch_cmd".to_string(),
            roll_command: "~/gimbal_roll_cmd".to_string(),
            yaw_command: "~/gimbal_yaw_cmd".to_string(),
            pitch_status: "~/gimbal_pitch_status".to_string(),
            roll_status: "~/gimbal_roll_status".to_string(),
            yaw_status: "~/gimbal_yaw_status".to_string(),
        }
    }
}

impl TopicConfig {
    pub fn command(&self, axis: Axis) -> &str {
        match axis {
            Axis::Pitch => &self.pitch_command,
            Axis::Roll => &self.roll_command,
            Axis::Yaw => &self.yaw_command,
        }
    }

    pub fn status(&self, axis: Axis) -> &str {
        match axis {
            Axis::Pitch => &self.pitch_status,
            Axis::Roll => &self.roll_status,
            Axis::Yaw => &self.yaw_status,
        }
    }

    /// Axis a command topic feeds, if any.
    pub fn command_axis(&self, topic: &str) -> Option<Axis> {
        Axis::ALL.into_iter().find(|&axis| self.command(axis) == topic)
    }
}

/// Settings for the simulation host in the binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub step_ms: u64,
    pub imu_interval_ms: u64,
    pub run_secs: u64,
    pub imu_noise_rad: f64,
    pub seed: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            step_ms: 4,
            imu_interval_ms: 5,
            run_secs: 10,
            imu_noise_rad: 0.002,
            seed: 42,
        }
    }
}

pub fn parse_config(text: &str, origin: &str) -> Result<GimbalConfig> {
    toml::from_str::<GimbalConfig>(text).map_err(|source| GimbalError::ConfigParse {
        path: origin.to_string(),
        source,
    })
}

/// Reads the config file. A missing file yields the defaults; an unreadable
/// or malformed one is an error.
pub fn load_config(path: impl AsRef<Path>) -> Result<GimbalConfig> {
    let path = path.as_ref();
    let display = path.display().to_string();
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let config = parse_config(&text, &display)?;
            info!("loaded config from {}", display);
            Ok(config)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("config {} not found, using defaults", display);
            Ok(GimbalConfig::default())
        }
        Err(source) => Err(GimbalError::ConfigRead { path: display, source }),
    }
}
