use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gimbal_stabilizer::sensor::orientation::decode;
use gimbal_stabilizer::sim::{SimWorld, VehicleMotion};
use gimbal_stabilizer::{
    normalize_about, shortest_angular_distance, Axis, GimbalConfig, GimbalControlLoop,
    GimbalPlugin, ImuMessage, MessageHandler, PidAxis, PidGains, Quaternion,
};

fn benchmark_angle_math(c: &mut Criterion) {
    c.bench_function("normalize_about", |b| b.iter(|| normalize_about(black_box(17.3), black_box(-2.0))));
    c.bench_function("shortest_angular_distance", |b| {
        b.iter(|| shortest_angular_distance(black_box(3.0), black_box(-3.0)))
    });
}

fn benchmark_decode(c: &mut Criterion) {
    let q = Quaternion::from_zxy(0.4, -0.2, 0.3);
    c.bench_function("zxy_decode", |b| b.iter(|| decode(black_box(&q))));
}

fn benchmark_pid_update(c: &mut Criterion) {
    let mut pid = PidAxis::new(PidGains::default_for(Axis::Pitch));
    c.bench_function("pid_update", |b| b.iter(|| pid.update(black_box(0.02), black_box(0.004))));
}

fn benchmark_control_tick(c: &mut Criterion) {
    let config = GimbalConfig::default();
    let world = SimWorld::new(&config, VehicleMotion::default());
    let handler = MessageHandler::new();
    let mut control = GimbalControlLoop::new(&handler);
    control.on_setup(&world, &config).expect("setup should succeed");
    handler.setpoints().set(Axis::Pitch, -0.3);

    let step = Duration::from_millis(4);
    control.on_tick(world.sim_time());

    c.bench_function("control_tick", |b| {
        b.iter(|| {
            let truth = world.camera_orientation();
            handler.on_imu(ImuMessage {
                stamp: world.sim_time(),
                orientation: Quaternion::from_zxy(truth.yaw, truth.roll, truth.pitch),
            });
            world.step(step);
            control.on_tick(world.sim_time())
        })
    });
}

criterion_group!(
    benches,
    benchmark_angle_math,
    benchmark_decode,
    benchmark_pid_update,
    benchmark_control_tick
);
criterion_main!(benches);
