mod common;

use std::time::Duration;

use approx::assert_relative_eq;

use common::{imu, running_loop, secs, MockHost};
use gimbal_stabilizer::control_loop::OrientationSource;
use gimbal_stabilizer::metrics::TickMetrics;
use gimbal_stabilizer::sim::{SimWorld, VehicleMotion};
use gimbal_stabilizer::{
    Axis, AxisStatus, GimbalChannels, GimbalConfig, GimbalControlLoop, GimbalError, GimbalPlugin,
    ImuMessage, LoopState, MessageHandler, Quaternion, SetpointCommand, SetpointPayload,
    SkipReason, TickReport, TypedValue,
};

fn source(report: &TickReport) -> OrientationSource {
    match report {
        TickReport::Completed { source, .. } => *source,
        TickReport::Skipped(reason) => panic!("tick skipped: {:?}", reason),
    }
}

#[test]
fn tick_before_setup_is_skipped() {
    let config = GimbalConfig::default();
    let (_host, [pitch, _, _]) = MockHost::complete(&config);
    let handler = MessageHandler::new();
    let mut control = GimbalControlLoop::new(&handler);

    assert_eq!(control.state(), LoopState::Uninitialized);
    assert_eq!(control.on_tick(secs(0.0)), TickReport::Skipped(SkipReason::Uninitialized));
    assert_eq!(control.on_tick(secs(0.1)), TickReport::Skipped(SkipReason::Uninitialized));
    assert!(pitch.commands().is_empty());
}

#[test]
fn missing_joint_degrades_only_that_axis() {
    let config = GimbalConfig::default();
    let (mut host, [pitch, roll, yaw]) = MockHost::complete(&config);
    host.remove_joint(&config.joint_name(Axis::Yaw));

    let channels = GimbalChannels::new(64);
    let handler = MessageHandler::new();
    let mut control = GimbalControlLoop::new(&handler).with_telemetry(channels.telemetry_tx.clone());
    control.on_setup(&host, &config).expect("missing joint is not fatal");

    assert_eq!(control.state(), LoopState::Running);
    assert_eq!(control.axis_status(Axis::Yaw), AxisStatus::Degraded);
    assert_eq!(control.axis_status(Axis::Pitch), AxisStatus::Active);

    handler.on_imu(imu(0.7, 0.01, 0.02));
    handler.setpoints().set(Axis::Yaw, 2.0);
    control.on_tick(secs(0.0));
    let report = control.on_tick(secs(0.01));

    assert_eq!(report.command(Axis::Yaw), None);
    assert_eq!(report.axis(Axis::Yaw).unwrap().status, AxisStatus::Degraded);
    assert!(yaw.commands().is_empty());
    assert_eq!(pitch.commands().len(), 1);
    assert_eq!(roll.commands().len(), 1);

    // the IMU still measures yaw, so it is still reported
    let yaw_samples: Vec<_> = channels.telemetry_rx.try_iter().filter(|t| t.axis == Axis::Yaw).collect();
    assert_eq!(yaw_samples.len(), 1);
    assert_relative_eq!(yaw_samples[0].angle, 0.7, epsilon = 1e-9);
}

#[test]
fn no_sensor_configured_uses_joint_readback() {
    let config = GimbalConfig { imu_sensor: Some(String::new()), ..GimbalConfig::default() };
    let (host, [pitch, _, _]) = MockHost::complete(&config);
    pitch.set_angle(0.1);
    let (mut control, handler) = running_loop(&host, &config);
    assert!(!control.imu_enabled());

    // samples are ignored while the sensor is disabled
    handler.on_imu(imu(0.0, 0.0, -0.5));
    let report = control.on_tick(secs(0.01));

    assert_eq!(source(&report), OrientationSource::JointReadback);
    assert_eq!(report.axis(Axis::Pitch).unwrap().measured, Some(0.1));
    assert_eq!(pitch.last_command(), Some(-0.3));
}

#[test]
fn absent_sensor_falls_back_to_readback() {
    let (host, [_, roll, _]) = MockHost::complete(&GimbalConfig::default());
    let config = GimbalConfig { imu_sensor: Some("gimbal_imu".to_string()), ..GimbalConfig::default() };
    roll.set_angle(-0.02);
    let (mut control, _handler) = running_loop(&host, &config);

    assert!(!control.imu_enabled());
    let report = control.on_tick(secs(0.01));
    assert_eq!(source(&report), OrientationSource::JointReadback);
    assert_relative_eq!(roll.last_command().unwrap(), 0.1, epsilon = 1e-12);
}

#[test]
fn no_sample_yet_uses_readback_until_one_arrives() {
    let config = GimbalConfig::default();
    let (host, [_, _, yaw]) = MockHost::complete(&config);
    yaw.set_angle(0.25);
    let (mut control, handler) = running_loop(&host, &config);
    assert!(control.imu_enabled());

    let report = control.on_tick(secs(0.01));
    assert_eq!(source(&report), OrientationSource::JointReadback);
    assert_eq!(report.axis(Axis::Yaw).unwrap().measured, Some(0.25));

    handler.on_imu(imu(0.1, 0.0, 0.0));
    let report = control.on_tick(secs(0.02));
    assert_eq!(source(&report), OrientationSource::Imu);
    assert_relative_eq!(report.axis(Axis::Yaw).unwrap().measured.unwrap(), 0.1, epsilon = 1e-9);
}

#[test]
fn repeated_timestamp_is_skipped() {
    let config = GimbalConfig::default();
    let (host, [pitch, _, _]) = MockHost::complete(&config);
    let (mut control, handler) = running_loop(&host, &config);
    handler.on_imu(imu(0.0, 0.0, 0.1));

    assert!(!control.on_tick(secs(0.1)).is_skipped());
    assert_eq!(control.on_tick(secs(0.1)), TickReport::Skipped(SkipReason::NonPositiveTimestep));
    assert_eq!(pitch.commands().len(), 1);
}

#[test]
fn clock_rewind_rebases_then_recovers() {
    let config = GimbalConfig::default();
    let (host, [pitch, _, _]) = MockHost::complete(&config);
    let (mut control, handler) = running_loop(&host, &config);
    handler.on_imu(imu(0.0, 0.0, 0.1));

    control.on_tick(secs(5.0));
    assert_eq!(control.on_tick(secs(0.5)), TickReport::Skipped(SkipReason::ClockRewound));
    assert_eq!(pitch.commands().len(), 1);

    match control.on_tick(secs(0.51)) {
        TickReport::Completed { dt, .. } => assert!(dt < Duration::from_millis(11)),
        TickReport::Skipped(reason) => panic!("tick skipped: {:?}", reason),
    }
    assert_eq!(pitch.commands().len(), 2);
}

#[test]
fn unavailable_joint_degrades_and_recovers() {
    let mut config = GimbalConfig::default();
    config.yaw.overrides.i = Some(1.0);
    config.yaw.overrides.i_min = Some(-1.0);
    config.yaw.overrides.i_max = Some(1.0);
    let (host, [_, _, yaw]) = MockHost::complete(&config);
    let (mut control, handler) = running_loop(&host, &config);

    handler.on_imu(imu(0.0, 0.0, 0.0));
    handler.setpoints().set(Axis::Yaw, 0.5);
    control.on_tick(secs(0.1));
    assert_relative_eq!(control.pid(Axis::Yaw).integral(), 0.05, epsilon = 1e-6);

    yaw.set_available(false);
    let report = control.on_tick(secs(0.2));
    assert_eq!(control.axis_status(Axis::Yaw), AxisStatus::Degraded);
    assert_eq!(report.command(Axis::Yaw), None);
    assert_eq!(control.pid(Axis::Yaw).integral(), 0.0);
    assert_eq!(yaw.commands().len(), 1);

    yaw.set_available(true);
    let report = control.on_tick(secs(0.3));
    assert_eq!(control.axis_status(Axis::Yaw), AxisStatus::Active);
    // fresh integral: 0.5 * 0.1
    assert_relative_eq!(control.pid(Axis::Yaw).integral(), 0.05, epsilon = 1e-6);
    assert!(report.command(Axis::Yaw).is_some());
    assert_eq!(yaw.commands().len(), 2);
}

#[test]
fn sim_joint_loss_and_world_reset() {
    let config = GimbalConfig { imu_sensor: Some(String::new()), ..GimbalConfig::default() };
    let world = SimWorld::new(&config, VehicleMotion::still());
    let channels = GimbalChannels::new(64);
    let handler = MessageHandler::new();
    let mut control = GimbalControlLoop::new(&handler).with_telemetry(channels.telemetry_tx.clone());
    control.on_setup(&world, &config).unwrap();
    handler.setpoints().set(Axis::Yaw, 0.5);

    let step = Duration::from_millis(4);
    let yaw = world.sim_joint(Axis::Yaw);
    control.on_tick(world.sim_time());
    world.step(step);
    control.on_tick(world.sim_time());
    assert_eq!(yaw.command_count(), 1);
    assert_relative_eq!(yaw.torque(), 0.5, epsilon = 1e-12);

    // joint removed from the world
    yaw.set_available(false);
    assert_eq!(yaw.torque(), 0.0);
    world.step(step);
    let stamp = world.sim_time();
    let report = control.on_tick(stamp);
    assert_eq!(control.axis_status(Axis::Yaw), AxisStatus::Degraded);
    assert_eq!(report.command(Axis::Yaw), None);
    assert_eq!(yaw.command_count(), 1);

    // a degraded axis still reports its readback
    let degraded_samples = channels
        .telemetry_rx
        .try_iter()
        .filter(|t| t.axis == Axis::Yaw && t.stamp == stamp)
        .count();
    assert_eq!(degraded_samples, 1);

    yaw.set_available(true);
    world.step(step);
    control.on_tick(world.sim_time());
    assert_eq!(control.axis_status(Axis::Yaw), AxisStatus::Active);
    assert_eq!(yaw.command_count(), 2);

    // world reset rewinds the clock
    world.reset_clock();
    assert_eq!(world.sim_time(), Duration::ZERO);
    assert_eq!(control.on_tick(world.sim_time()), TickReport::Skipped(SkipReason::ClockRewound));
    world.step(step);
    assert!(!control.on_tick(world.sim_time()).is_skipped());
    assert_eq!(yaw.command_count(), 3);
}

#[test]
fn unavailable_joint_readback_still_published() {
    let config = GimbalConfig { imu_sensor: Some(String::new()), ..GimbalConfig::default() };
    let (host, [pitch, roll, _]) = MockHost::complete(&config);
    roll.set_angle(0.12);
    let channels = GimbalChannels::new(64);
    let handler = MessageHandler::new();
    let mut control = GimbalControlLoop::new(&handler).with_telemetry(channels.telemetry_tx.clone());
    control.on_setup(&host, &config).unwrap();

    roll.set_available(false);
    control.on_tick(secs(0.0));
    let report = control.on_tick(secs(0.01));

    assert_eq!(report.command(Axis::Roll), None);
    assert!(roll.commands().is_empty());
    assert_eq!(pitch.commands().len(), 1);
    let roll_samples: Vec<_> = channels.telemetry_rx.try_iter().filter(|t| t.axis == Axis::Roll).collect();
    assert_eq!(roll_samples.len(), 1);
    assert_eq!(roll_samples[0].angle, 0.12);
}

#[test]
fn huge_setpoint_does_not_stall_the_tick() {
    let config = GimbalConfig::default();
    let (host, [_, _, yaw]) = MockHost::complete(&config);
    let (mut control, handler) = running_loop(&host, &config);

    handler.on_imu(imu(0.0, 0.0, 0.0));
    let accepted = handler.on_command(&SetpointCommand {
        axis: Axis::Yaw,
        payload: SetpointPayload::Text("2.3548055087408503e275".to_string()),
    });
    assert!(accepted.is_ok());

    let report = control.on_tick(secs(0.01));
    let error = report.axis(Axis::Yaw).unwrap().error.unwrap();
    assert!(error.abs() <= std::f64::consts::PI);
    let command = yaw.last_command().unwrap();
    assert!(command.is_finite() && command.abs() <= 1.0);
}

#[test]
fn bad_quaternion_reuses_last_good_orientation() {
    let config = GimbalConfig::default();
    let (host, [_, _, yaw]) = MockHost::complete(&config);
    let (mut control, handler) = running_loop(&host, &config);

    handler.on_imu(imu(0.2, 0.0, 0.0));
    control.on_tick(secs(0.01));

    handler.on_imu(ImuMessage {
        stamp: secs(0.02),
        orientation: Quaternion::new(f64::NAN, 0.0, 0.0, 0.0),
    });
    let report = control.on_tick(secs(0.02));
    assert_eq!(source(&report), OrientationSource::Imu);
    assert_relative_eq!(report.axis(Axis::Yaw).unwrap().measured.unwrap(), 0.2, epsilon = 1e-9);

    handler.on_imu(ImuMessage {
        stamp: secs(0.03),
        orientation: Quaternion::new(0.0, 0.0, 0.0, 0.0),
    });
    control.on_tick(secs(0.03));

    for command in yaw.commands() {
        assert!(command.is_finite());
        assert_relative_eq!(command, -0.2, epsilon = 1e-9);
    }
}

#[test]
fn bad_quaternion_without_history_uses_readback() {
    let config = GimbalConfig::default();
    let (host, [pitch, _, _]) = MockHost::complete(&config);
    pitch.set_angle(0.04);
    let (mut control, handler) = running_loop(&host, &config);

    handler.on_imu(ImuMessage {
        stamp: Duration::ZERO,
        orientation: Quaternion::new(f64::INFINITY, 1.0, 0.0, 0.0),
    });
    let report = control.on_tick(secs(0.01));

    assert!(control.last_known_orientation().is_none());
    assert_eq!(source(&report), OrientationSource::JointReadback);
    assert_relative_eq!(pitch.last_command().unwrap(), -0.2, epsilon = 1e-12);
}

#[test]
fn non_finite_readback_is_not_commanded() {
    let config = GimbalConfig { imu_sensor: Some(String::new()), ..GimbalConfig::default() };
    let (host, [pitch, roll, _]) = MockHost::complete(&config);
    roll.set_angle(f64::NAN);
    let (mut control, _handler) = running_loop(&host, &config);

    let report = control.on_tick(secs(0.01));
    assert_eq!(report.axis(Axis::Roll).unwrap().measured, None);
    assert!(roll.commands().is_empty());
    assert_eq!(pitch.commands().len(), 1);
}

#[test]
fn malformed_payload_keeps_previous_setpoint() {
    let handler = MessageHandler::new();
    handler.setpoints().set(Axis::Pitch, -0.4);

    for payload in [
        SetpointPayload::Text("level".to_string()),
        SetpointPayload::Text(String::new()),
        SetpointPayload::Text("NaN".to_string()),
        SetpointPayload::Typed(TypedValue::Boolean(true)),
        SetpointPayload::Typed(TypedValue::Double(f64::INFINITY)),
    ] {
        let result = handler.on_command(&SetpointCommand { axis: Axis::Pitch, payload });
        assert!(matches!(result, Err(GimbalError::InvalidSetpointPayload { axis: Axis::Pitch, .. })));
    }

    assert_eq!(handler.setpoints().get(Axis::Pitch), -0.4);
    assert_eq!(handler.setpoints().rejected(), 5);
}

#[test]
fn inverted_gain_limits_fail_setup() {
    let mut config = GimbalConfig::default();
    config.pitch.overrides.cmd_min = Some(1.0);
    config.pitch.overrides.cmd_max = Some(-1.0);
    let (host, _) = MockHost::complete(&config);
    let handler = MessageHandler::new();
    let mut control = GimbalControlLoop::new(&handler);

    let err = control.on_setup(&host, &config).unwrap_err();
    assert!(matches!(err, GimbalError::InvalidGains { axis: Axis::Pitch, .. }));
    assert_eq!(control.state(), LoopState::Uninitialized);
}

#[test]
fn full_telemetry_queue_drops_samples() {
    let config = GimbalConfig::default();
    let (host, [pitch, _, _]) = MockHost::complete(&config);
    let channels = GimbalChannels::new(2);
    let metrics = TickMetrics::new().unwrap();
    let handler = MessageHandler::new();
    let mut control = GimbalControlLoop::new(&handler)
        .with_telemetry(channels.telemetry_tx.clone())
        .with_metrics(metrics.clone());
    control.on_setup(&host, &config).unwrap();

    handler.on_imu(imu(0.0, 0.0, 0.0));
    control.on_tick(secs(0.0));
    control.on_tick(secs(0.01));
    control.on_tick(secs(0.02));

    // nothing drains the queue; the tick never blocks on it
    assert_eq!(pitch.commands().len(), 2);
    assert_eq!(channels.telemetry_rx.len(), 2);
    assert_eq!(metrics.report().telemetry_dropped, 4);
}
