//! Error kinds for the gimbal controller.
//!
//! Only configuration errors ever reach the host. Everything raised while the
//! loop is running is logged and degrades the affected axis or tick.

use crate::Axis;

#[derive(Debug, thiserror::Error)]
pub enum GimbalError {
    #[error("{axis} joint `{name}` not found")]
    MissingJoint { axis: Axis, name: String },

    #[error("orientation sensor `{name}` not found, falling back to joint readback")]
    MissingOrientationSource { name: String },

    #[error("{axis} setpoint payload rejected: {payload}")]
    InvalidSetpointPayload { axis: Axis, payload: String },

    #[error("non-positive timestep ({dt_secs:.6}s)")]
    NonPositiveTimestep { dt_secs: f64 },

    #[error("orientation sample outside numeric domain: {0}")]
    NumericDomain(String),

    #[error("{axis} gains invalid: {reason}")]
    InvalidGains { axis: Axis, reason: String },

    #[error("failed to read config `{path}`")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config `{path}`")]
    ConfigParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("metrics histogram creation failed")]
    Metrics(#[from] hdrhistogram::CreationError),
}

pub type Result<T> = std::result::Result<T, GimbalError>;
