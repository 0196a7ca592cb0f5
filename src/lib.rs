pub mod angle;
pub mod sensor;
pub mod actuator;
pub mod ipc;
pub mod control_loop;
pub mod metrics;
pub mod logger;
pub mod sim;
pub mod async_impl;
pub mod threaded_impl;
pub mod config;
pub mod error;

mod axis;

pub use angle::{normalize_about, shortest_angular_distance};
pub use axis::{Axis, AxisMap};
pub use actuator::controller::{PidAxis, PidGains};
pub use actuator::joint::{JointHandle, SimJoint};
pub use config::{ControllerGains, GimbalConfig, TopicConfig};
pub use control_loop::{AxisStatus, GimbalControlLoop, GimbalPlugin, LoopState, PluginHost, SkipReason, TickReport};
pub use error::GimbalError;
pub use ipc::channels::{GimbalChannels, ImuMessage, SetpointCommand, SetpointPayload, Telemetry, TypedValue};
pub use ipc::shared_resource::{ImuSlot, MessageHandler, SetpointStore};
pub use sensor::orientation::{EulerAngles, Quaternion};
