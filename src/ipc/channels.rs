use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, Sender};

use crate::axis::Axis;
use crate::sensor::orientation::Quaternion;

#[derive(Clone)]
pub struct GimbalChannels {
    // IMU -> message context
    pub imu_tx: Sender<ImuMessage>,
    pub imu_rx: Arc<Receiver<ImuMessage>>,

    // Command publishers -> message context
    pub command_tx: Sender<SetpointCommand>,
    pub command_rx: Arc<Receiver<SetpointCommand>>,

    // Tick context -> telemetry subscribers
    pub telemetry_tx: Sender<Telemetry>,
    pub telemetry_rx: Arc<Receiver<Telemetry>>,
}

impl GimbalChannels {
    pub fn new(buffer_size: usize) -> Self {
        let (imu_tx, imu_rx) = bounded(buffer_size);
        let (command_tx, command_rx) = bounded(buffer_size);
        let (telemetry_tx, telemetry_rx) = bounded(buffer_size);

        Self {
            imu_tx,
            imu_rx: Arc::new(imu_rx),
            command_tx,
            command_rx: Arc::new(command_rx),
            telemetry_tx,
            telemetry_rx: Arc::new(telemetry_rx),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ImuMessage {
    /// Simulation time the sample was taken at.
    pub stamp: Duration,
    pub orientation: Quaternion,
}

/// A generically typed scalar message.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedValue {
    Double(f64),
    Int32(i32),
    String(String),
    Boolean(bool),
}

/// Setpoint command body. Publishers send either a typed scalar or the
/// legacy plain string; both mean "target angle in radians".
#[derive(Clone, Debug, PartialEq)]
pub enum SetpointPayload {
    Text(String),
    Typed(TypedValue),
}

impl SetpointPayload {
    /// Normalizes the payload to radians. The error is a short description of
    /// why the payload was refused.
    pub fn to_radians(&self) -> Result<f64, String> {
        let value = match self {
            SetpointPayload::Text(s) | SetpointPayload::Typed(TypedValue::String(s)) => {
                let trimmed = s.trim();
                trimmed.parse::<f64>().map_err(|_| format!("not a number: {:?}", s))?
            }
            SetpointPayload::Typed(TypedValue::Double(v)) => *v,
            SetpointPayload::Typed(TypedValue::Int32(v)) => f64::from(*v),
            SetpointPayload::Typed(TypedValue::Boolean(b)) => {
                return Err(format!("boolean {} is not an angle", b));
            }
        };

        if !value.is_finite() {
            return Err(format!("non-finite angle {}", value));
        }
        Ok(value)
    }
}

impl std::fmt::Display for SetpointPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetpointPayload::Text(s) => write!(f, "text {:?}", s),
            SetpointPayload::Typed(v) => write!(f, "typed {:?}", v),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SetpointCommand {
    pub axis: Axis,
    pub payload: SetpointPayload,
}

/// Measured angle readback for one axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Telemetry {
    pub axis: Axis,
    pub angle: f64,
    pub stamp: Duration,
}
