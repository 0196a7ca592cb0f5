//! Joint actuation interface and a torque-driven simulated revolute joint.

use std::sync::Arc;

use parking_lot::Mutex;

/// Capability exposed by a physics joint.
pub trait JointHandle: Send + Sync {
    /// Current joint angle in radians.
    fn current_angle(&self) -> f64;

    /// Applies a clamped PID output. Whether it acts as a torque or a
    /// position target is up to the joint.
    fn apply_command(&self, value: f64);

    /// False once the joint has been removed from the world.
    fn is_available(&self) -> bool {
        true
    }

    /// Lower and upper angle limits, if the joint has any.
    fn limits(&self) -> Option<(f64, f64)> {
        None
    }
}

#[derive(Debug, Clone)]
struct JointState {
    angle: f64,
    velocity: f64,
    torque: f64,
    inertia: f64,
    damping: f64,
    limits: Option<(f64, f64)>,
    available: bool,
    commands: u64,
}

/// Revolute joint integrated with semi-implicit Euler. Cloning shares the
/// same joint, so the world and the controller can both hold it.
#[derive(Debug, Clone)]
pub struct SimJoint {
    name: Arc<str>,
    state: Arc<Mutex<JointState>>,
}

impl SimJoint {
    pub fn new(name: &str, inertia: f64, damping: f64) -> Self {
        Self {
            name: Arc::from(name),
            state: Arc::new(Mutex::new(JointState {
                angle: 0.0,
                velocity: 0.0,
                torque: 0.0,
                inertia: inertia.max(1e-6),
                damping,
                limits: None,
                available: true,
                commands: 0,
            })),
        }
    }

    pub fn with_limits(self, lower: f64, upper: f64) -> Self {
        self.state.lock().limits = Some((lower.min(upper), lower.max(upper)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Integrates one physics step. `base_rate` is the rate the mount is
    /// dragging the joint at (e.g. vehicle motion coupled through friction).
    pub fn step(&self, dt: f64, base_rate: f64) {
        if dt <= 0.0 {
            return;
        }
        let mut s = self.state.lock();
        let accel = (s.torque - s.damping * (s.velocity - base_rate)) / s.inertia;
        s.velocity += accel * dt;
        s.angle += s.velocity * dt;

        if let Some((lo, hi)) = s.limits {
            if s.angle < lo || s.angle > hi {
                s.angle = s.angle.clamp(lo, hi);
                s.velocity = 0.0;
            }
        }
    }

    pub fn set_angle(&self, angle: f64) {
        let mut s = self.state.lock();
        s.angle = angle;
        s.velocity = 0.0;
    }

    pub fn set_available(&self, available: bool) {
        let mut s = self.state.lock();
        s.available = available;
        if !available {
            s.torque = 0.0;
        }
    }

    pub fn torque(&self) -> f64 {
        self.state.lock().torque
    }

    pub fn command_count(&self) -> u64 {
        self.state.lock().commands
    }
}

impl JointHandle for SimJoint {
    fn current_angle(&self) -> f64 {
        self.state.lock().angle
    }

    fn apply_command(&self, value: f64) {
        let mut s = self.state.lock();
        if s.available {
            s.torque = value;
            s.commands += 1;
        }
    }

    fn is_available(&self) -> bool {
        self.state.lock().available
    }

    fn limits(&self) -> Option<(f64, f64)> {
        self.state.lock().limits
    }
}
