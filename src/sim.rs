//! Simulated host world - a vehicle rocking under the gimbal and three
//! torque-driven joints. Stands in for the physics engine in the binary,
//! the benches and the integration tests.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::actuator::joint::{JointHandle, SimJoint};
use crate::axis::{Axis, AxisMap};
use crate::config::GimbalConfig;
use crate::control_loop::PluginHost;
use crate::sensor::orientation::EulerAngles;

const JOINT_INERTIA: f64 = 0.005;
const JOINT_DAMPING: f64 = 0.1;

/// Sinusoidal body motion, one term per axis.
#[derive(Debug, Clone, Copy)]
pub struct VehicleMotion {
    pub amplitude: AxisMap<f64>,
    pub frequency_hz: AxisMap<f64>,
}

impl Default for VehicleMotion {
    fn default() -> Self {
        Self {
            amplitude: AxisMap { pitch: 0.08, roll: 0.12, yaw: 0.3 },
            frequency_hz: AxisMap { pitch: 0.7, roll: 0.5, yaw: 0.1 },
        }
    }
}

impl VehicleMotion {
    pub fn still() -> Self {
        Self {
            amplitude: AxisMap::default(),
            frequency_hz: AxisMap::default(),
        }
    }

    pub fn angle(&self, axis: Axis, t: f64) -> f64 {
        let w = std::f64::consts::TAU * self.frequency_hz[axis];
        self.amplitude[axis] * (w * t).sin()
    }

    pub fn rate(&self, axis: Axis, t: f64) -> f64 {
        let w = std::f64::consts::TAU * self.frequency_hz[axis];
        self.amplitude[axis] * w * (w * t).cos()
    }
}

#[derive(Clone)]
pub struct SimWorld {
    joints: AxisMap<SimJoint>,
    vehicle: Arc<RwLock<VehicleMotion>>,
    clock_ns: Arc<AtomicU64>,
    imu_sensor: Option<String>,
}

impl SimWorld {
    pub fn new(config: &GimbalConfig, vehicle: VehicleMotion) -> Self {
        let joints = AxisMap {
            pitch: SimJoint::new(&config.joint_name(Axis::Pitch), JOINT_INERTIA, JOINT_DAMPING)
                .with_limits(-FRAC_PI_2, FRAC_PI_4),
            roll: SimJoint::new(&config.joint_name(Axis::Roll), JOINT_INERTIA, JOINT_DAMPING)
                .with_limits(-FRAC_PI_4, FRAC_PI_4),
            yaw: SimJoint::new(&config.joint_name(Axis::Yaw), JOINT_INERTIA, JOINT_DAMPING),
        };
        Self {
            joints,
            vehicle: Arc::new(RwLock::new(vehicle)),
            clock_ns: Arc::new(AtomicU64::new(0)),
            imu_sensor: config.imu_sensor_name().map(str::to_string),
        }
    }

    pub fn sim_joint(&self, axis: Axis) -> &SimJoint {
        &self.joints[axis]
    }

    pub fn sim_time(&self) -> Duration {
        Duration::from_nanos(self.clock_ns.load(Ordering::Acquire))
    }

    /// Advances the world clock and joint physics by one step. Joint friction
    /// drags each joint against the vehicle's motion.
    pub fn step(&self, dt: Duration) {
        let t = self.sim_time().as_secs_f64();
        let vehicle = *self.vehicle.read();
        for axis in Axis::ALL {
            self.joints[axis].step(dt.as_secs_f64(), -vehicle.rate(axis, t));
        }
        self.clock_ns.fetch_add(dt.as_nanos() as u64, Ordering::AcqRel);
    }

    /// Sets the clock back to zero, as a world reset does.
    pub fn reset_clock(&self) {
        self.clock_ns.store(0, Ordering::Release);
    }

    /// True camera orientation: vehicle attitude plus joint angles.
    pub fn camera_orientation(&self) -> EulerAngles {
        let t = self.sim_time().as_secs_f64();
        let vehicle = *self.vehicle.read();
        EulerAngles {
            pitch: vehicle.angle(Axis::Pitch, t) + self.joints.pitch.current_angle(),
            roll: vehicle.angle(Axis::Roll, t) + self.joints.roll.current_angle(),
            yaw: vehicle.angle(Axis::Yaw, t) + self.joints.yaw.current_angle(),
        }
    }
}

impl PluginHost for SimWorld {
    fn joint(&self, name: &str) -> Option<Arc<dyn JointHandle>> {
        Axis::ALL
            .iter()
            .map(|&axis| &self.joints[axis])
            .find(|joint| joint.name() == name)
            .map(|joint| Arc::new(joint.clone()) as Arc<dyn JointHandle>)
    }

    fn has_sensor(&self, name: &str) -> bool {
        self.imu_sensor.as_deref() == Some(name)
    }
}
