//! Gimbal control loop - one control tick per simulation step
//!
//! ```text
//! IMU sample / joint readback -> ZXY decode -> shortest angular error
//!     -> PidAxis::update -> JointHandle::apply_command + telemetry
//! ```
//!
//! The loop is `Uninitialized` until [`GimbalPlugin::on_setup`] resolves the
//! joints and the orientation source, then `Running`. An axis without a
//! usable joint is `Degraded`: its PID is held reset and it gets no command,
//! while the other axes keep running.

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::Sender;
use log::{debug, info, warn};

use crate::actuator::controller::{PidAxis, PidGains};
use crate::actuator::joint::JointHandle;
use crate::angle::shortest_angular_distance;
use crate::axis::{Axis, AxisMap};
use crate::config::GimbalConfig;
use crate::error::GimbalError;
use crate::ipc::channels::Telemetry;
use crate::ipc::shared_resource::{ImuSlot, MessageHandler, SetpointStore};
use crate::metrics::TickMetrics;
use crate::sensor::orientation::{decode, EulerAngles};

/// What the host offers the controller at setup.
pub trait PluginHost {
    fn joint(&self, name: &str) -> Option<Arc<dyn JointHandle>>;
    fn has_sensor(&self, name: &str) -> bool;
}

/// Lifecycle the host drives: one setup, then one tick per simulation step.
/// Ticks are never re-entrant.
pub trait GimbalPlugin {
    fn on_setup(&mut self, host: &dyn PluginHost, config: &GimbalConfig) -> Result<(), GimbalError>;
    fn on_tick(&mut self, sim_time: Duration) -> TickReport;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    Running,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisStatus {
    Active,
    Degraded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrientationSource {
    Imu,
    JointReadback,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    Uninitialized,
    FirstTick,
    NonPositiveTimestep,
    ClockRewound,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisOutcome {
    pub status: AxisStatus,
    pub measured: Option<f64>,
    pub setpoint: f64,
    pub error: Option<f64>,
    /// PID output, before the joint direction is applied.
    pub command: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TickReport {
    Skipped(SkipReason),
    Completed {
        dt: Duration,
        source: OrientationSource,
        axes: AxisMap<AxisOutcome>,
    },
}

impl TickReport {
    pub fn is_skipped(&self) -> bool {
        matches!(self, TickReport::Skipped(_))
    }

    pub fn axis(&self, axis: Axis) -> Option<&AxisOutcome> {
        match self {
            TickReport::Completed { axes, .. } => Some(&axes[axis]),
            TickReport::Skipped(_) => None,
        }
    }

    pub fn command(&self, axis: Axis) -> Option<f64> {
        self.axis(axis).and_then(|outcome| outcome.command)
    }
}

struct AxisChannel {
    joint_name: String,
    joint: Option<Arc<dyn JointHandle>>,
    pid: PidAxis,
    direction: f64,
    status: AxisStatus,
}

impl AxisChannel {
    fn unresolved(axis: Axis) -> Self {
        Self {
            joint_name: String::new(),
            joint: None,
            pid: PidAxis::new(PidGains::default_for(axis)),
            direction: 1.0,
            status: AxisStatus::Degraded,
        }
    }

    // Read even while unavailable: degraded axes still report their angle.
    fn readback(&self) -> Option<f64> {
        self.joint
            .as_ref()
            .map(|joint| joint.current_angle())
            .filter(|angle| angle.is_finite())
    }
}

pub struct GimbalControlLoop {
    state: LoopState,
    axes: AxisMap<AxisChannel>,
    imu: Arc<ImuSlot>,
    setpoints: Arc<SetpointStore>,
    imu_enabled: bool,
    yaw_from_joint: bool,
    telemetry_every: u64,
    telemetry: Option<Sender<Telemetry>>,
    metrics: Option<TickMetrics>,
    last_update: Option<Duration>,
    last_good: Option<EulerAngles>,
    domain_warned: bool,
    completed_ticks: u64,
}

impl GimbalControlLoop {
    /// Builds a loop reading the slots the given handler writes.
    pub fn new(messages: &MessageHandler) -> Self {
        Self {
            state: LoopState::Uninitialized,
            axes: AxisMap::from_fn(AxisChannel::unresolved),
            imu: messages.imu().clone(),
            setpoints: messages.setpoints().clone(),
            imu_enabled: false,
            yaw_from_joint: false,
            telemetry_every: 1,
            telemetry: None,
            metrics: None,
            last_update: None,
            last_good: None,
            domain_warned: false,
            completed_ticks: 0,
        }
    }

    pub fn with_telemetry(mut self, tx: Sender<Telemetry>) -> Self {
        self.telemetry = Some(tx);
        self
    }

    pub fn with_metrics(mut self, metrics: TickMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn axis_status(&self, axis: Axis) -> AxisStatus {
        self.axes[axis].status
    }

    pub fn pid(&self, axis: Axis) -> &PidAxis {
        &self.axes[axis].pid
    }

    pub fn imu_enabled(&self) -> bool {
        self.imu_enabled
    }

    pub fn last_known_orientation(&self) -> Option<EulerAngles> {
        self.last_good
    }

    fn skip(&self, reason: SkipReason) -> TickReport {
        if let Some(metrics) = &self.metrics {
            metrics.tick_skipped();
        }
        TickReport::Skipped(reason)
    }

    /// Picks up joints disappearing or coming back since the last tick.
    fn refresh_status(&mut self) {
        for axis in Axis::ALL {
            let ch = &mut self.axes[axis];
            let available = ch.joint.as_ref().is_some_and(|joint| joint.is_available());
            match (ch.status, available) {
                (AxisStatus::Active, false) => {
                    warn!("{} joint `{}` became unavailable, axis degraded", axis, ch.joint_name);
                    ch.status = AxisStatus::Degraded;
                }
                (AxisStatus::Degraded, true) => {
                    info!("{} joint `{}` available, axis resumed", axis, ch.joint_name);
                    ch.pid.reset();
                    ch.status = AxisStatus::Active;
                }
                _ => {}
            }
        }
    }

    fn imu_orientation(&mut self) -> Option<EulerAngles> {
        let sample = self.imu.latest()?;
        match decode(&sample.orientation) {
            Ok(euler) => {
                self.last_good = Some(euler);
                self.domain_warned = false;
                Some(euler)
            }
            Err(e) => {
                if !self.domain_warned {
                    warn!("{}; using last known orientation", e);
                    self.domain_warned = true;
                }
                self.last_good
            }
        }
    }

    fn measure(&mut self) -> (AxisMap<Option<f64>>, OrientationSource) {
        let readback = self.axes.map(|_, ch| ch.readback());

        if self.imu_enabled {
            if let Some(euler) = self.imu_orientation() {
                let measured = AxisMap {
                    pitch: Some(euler.pitch),
                    roll: Some(euler.roll),
                    yaw: if self.yaw_from_joint { readback.yaw } else { Some(euler.yaw) },
                };
                return (measured, OrientationSource::Imu);
            }
        }
        (readback, OrientationSource::JointReadback)
    }

    /// Sends every measured angle, degraded axes included. Axes with no finite
    /// measurement this tick are left out.
    fn publish(&self, stamp: Duration, measured: &AxisMap<Option<f64>>) {
        let Some(tx) = &self.telemetry else {
            return;
        };
        for (axis, angle) in measured.iter() {
            let Some(angle) = *angle else {
                continue;
            };
            if tx.try_send(Telemetry { axis, angle, stamp }).is_err() {
                if let Some(metrics) = &self.metrics {
                    metrics.telemetry_dropped();
                }
            }
        }
    }
}

impl GimbalPlugin for GimbalControlLoop {
    fn on_setup(&mut self, host: &dyn PluginHost, config: &GimbalConfig) -> Result<(), GimbalError> {
        let gains = config.controller_gains()?;
        let directions = config.directions();

        for axis in Axis::ALL {
            let joint_name = config.joint_name(axis);
            let joint = host.joint(&joint_name);
            let status = if joint.is_some() {
                AxisStatus::Active
            } else {
                warn!("{}", GimbalError::MissingJoint { axis, name: joint_name.clone() });
                AxisStatus::Degraded
            };
            self.axes[axis] = AxisChannel {
                joint_name,
                joint,
                pid: PidAxis::new(gains.get(axis)),
                direction: directions[axis],
                status,
            };
        }

        self.imu_enabled = match config.imu_sensor_name() {
            Some(name) if host.has_sensor(name) => {
                info!("using orientation sensor `{}`", name);
                true
            }
            Some(name) => {
                warn!("{}", GimbalError::MissingOrientationSource { name: name.to_string() });
                false
            }
            None => {
                info!("no orientation sensor configured, using joint readback");
                false
            }
        };

        self.yaw_from_joint = config.yaw_from_joint;
        self.telemetry_every = u64::from(config.telemetry_every.max(1));
        self.last_update = None;
        self.last_good = None;
        self.completed_ticks = 0;
        self.state = LoopState::Running;
        info!(
            "gimbal controller running (pitch: {:?}, roll: {:?}, yaw: {:?})",
            self.axes.pitch.status, self.axes.roll.status, self.axes.yaw.status
        );
        Ok(())
    }

    fn on_tick(&mut self, sim_time: Duration) -> TickReport {
        if self.state == LoopState::Uninitialized {
            return self.skip(SkipReason::Uninitialized);
        }

        let Some(last) = self.last_update else {
            self.last_update = Some(sim_time);
            return self.skip(SkipReason::FirstTick);
        };
        if sim_time < last {
            warn!(
                "simulation time went backwards ({:?} -> {:?}), re-basing clock",
                last, sim_time
            );
            self.last_update = Some(sim_time);
            return self.skip(SkipReason::ClockRewound);
        }
        let dt = sim_time - last;
        if dt.is_zero() {
            debug!("{}", GimbalError::NonPositiveTimestep { dt_secs: 0.0 });
            return self.skip(SkipReason::NonPositiveTimestep);
        }
        let dt_secs = dt.as_secs_f64();
        if let Some(metrics) = &self.metrics {
            metrics.record_dt(dt);
        }

        self.refresh_status();
        let (measured, source) = self.measure();
        let setpoints = self.setpoints.snapshot();

        let mut commands = 0;
        let mut outcomes = AxisMap::from_fn(|axis| AxisOutcome {
            status: self.axes[axis].status,
            measured: measured[axis],
            setpoint: setpoints[axis],
            error: None,
            command: None,
        });

        for axis in Axis::ALL {
            let ch = &mut self.axes[axis];
            let joint = match (&ch.joint, ch.status) {
                (Some(joint), AxisStatus::Active) => joint,
                _ => {
                    ch.pid.reset();
                    continue;
                }
            };
            let Some(current) = measured[axis] else {
                continue;
            };

            let target = match joint.limits() {
                Some((lower, upper)) => setpoints[axis].max(lower).min(upper),
                None => setpoints[axis],
            };
            let error = shortest_angular_distance(current, target);
            let command = ch.pid.update(error, dt_secs);
            joint.apply_command(ch.direction * command);
            commands += 1;

            outcomes[axis].setpoint = target;
            outcomes[axis].error = Some(error);
            outcomes[axis].command = Some(command);
        }

        if self.completed_ticks % self.telemetry_every == 0 {
            self.publish(sim_time, &measured);
        }

        self.last_update = Some(sim_time);
        self.completed_ticks += 1;
        if let Some(metrics) = &self.metrics {
            metrics.tick_completed(commands);
        }

        TickReport::Completed { dt, source, axes: outcomes }
    }
}
