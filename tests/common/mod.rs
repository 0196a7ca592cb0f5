#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use gimbal_stabilizer::{
    GimbalConfig, GimbalControlLoop, GimbalPlugin, ImuMessage, JointHandle, MessageHandler,
    PluginHost, Quaternion,
};

/// Joint that records every command it receives.
pub struct RecordingJoint {
    angle: Mutex<f64>,
    commands: Mutex<Vec<f64>>,
    available: AtomicBool,
    limits: Option<(f64, f64)>,
}

impl RecordingJoint {
    pub fn new(angle: f64) -> Arc<Self> {
        Self::with_limits(angle, None)
    }

    pub fn with_limits(angle: f64, limits: Option<(f64, f64)>) -> Arc<Self> {
        Arc::new(Self {
            angle: Mutex::new(angle),
            commands: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            limits,
        })
    }

    pub fn set_angle(&self, angle: f64) {
        *self.angle.lock() = angle;
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn commands(&self) -> Vec<f64> {
        self.commands.lock().clone()
    }

    pub fn last_command(&self) -> Option<f64> {
        self.commands.lock().last().copied()
    }
}

impl JointHandle for RecordingJoint {
    fn current_angle(&self) -> f64 {
        *self.angle.lock()
    }

    fn apply_command(&self, value: f64) {
        self.commands.lock().push(value);
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn limits(&self) -> Option<(f64, f64)> {
        self.limits
    }
}

#[derive(Default)]
pub struct MockHost {
    joints: HashMap<String, Arc<RecordingJoint>>,
    sensors: Vec<String>,
}

impl MockHost {
    /// Host exposing all three default joints (at angle 0) and the default IMU.
    pub fn complete(config: &GimbalConfig) -> (Self, [Arc<RecordingJoint>; 3]) {
        let pitch = RecordingJoint::new(0.0);
        let roll = RecordingJoint::new(0.0);
        let yaw = RecordingJoint::new(0.0);
        let mut host = MockHost::default();
        host.add_joint(&config.joint_name(gimbal_stabilizer::Axis::Pitch), pitch.clone());
        host.add_joint(&config.joint_name(gimbal_stabilizer::Axis::Roll), roll.clone());
        host.add_joint(&config.joint_name(gimbal_stabilizer::Axis::Yaw), yaw.clone());
        if let Some(name) = config.imu_sensor_name() {
            host.add_sensor(name);
        }
        (host, [pitch, roll, yaw])
    }

    pub fn add_joint(&mut self, name: &str, joint: Arc<RecordingJoint>) {
        self.joints.insert(name.to_string(), joint);
    }

    pub fn remove_joint(&mut self, name: &str) {
        self.joints.remove(name);
    }

    pub fn add_sensor(&mut self, name: &str) {
        self.sensors.push(name.to_string());
    }
}

impl PluginHost for MockHost {
    fn joint(&self, name: &str) -> Option<Arc<dyn JointHandle>> {
        self.joints.get(name).map(|joint| joint.clone() as Arc<dyn JointHandle>)
    }

    fn has_sensor(&self, name: &str) -> bool {
        self.sensors.iter().any(|sensor| sensor == name)
    }
}

pub fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

pub fn imu(yaw: f64, roll: f64, pitch: f64) -> ImuMessage {
    ImuMessage {
        stamp: Duration::ZERO,
        orientation: Quaternion::from_zxy(yaw, roll, pitch),
    }
}

/// A loop set up against `host`, with its first (time-recording) tick done at t = 0.
pub fn running_loop(host: &MockHost, config: &GimbalConfig) -> (GimbalControlLoop, MessageHandler) {
    let handler = MessageHandler::new();
    let mut control = GimbalControlLoop::new(&handler);
    control.on_setup(host, config).expect("setup should succeed");
    assert!(control.on_tick(Duration::ZERO).is_skipped());
    (control, handler)
}
