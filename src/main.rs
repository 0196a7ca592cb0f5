use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use log::{info, LevelFilter};

use gimbal_stabilizer::async_impl::{command_task, imu_task, telemetry_task};
use gimbal_stabilizer::config::load_config;
use gimbal_stabilizer::control_loop::{GimbalControlLoop, GimbalPlugin};
use gimbal_stabilizer::ipc::channels::GimbalChannels;
use gimbal_stabilizer::ipc::shared_resource::MessageHandler;
use gimbal_stabilizer::metrics::TickMetrics;
use gimbal_stabilizer::sensor::imu_sim::SimulatedImu;
use gimbal_stabilizer::sim::{SimWorld, VehicleMotion};
use gimbal_stabilizer::threaded_impl::{message_thread, tick_thread};
use gimbal_stabilizer::{logger, Axis, JointHandle};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init(LevelFilter::Info)?;
    info!("starting gimbal stabilizer simulation");

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config/gimbal.toml".to_string());
    let config = load_config(&config_path).with_context(|| format!("loading {}", config_path))?;
    let runtime = config.runtime.clone();
    let step = Duration::from_millis(runtime.step_ms.max(1));

    let world = SimWorld::new(&config, VehicleMotion::default());
    let channels = GimbalChannels::new(256);
    let handler = MessageHandler::new();
    let metrics = TickMetrics::new()?;

    let mut control = GimbalControlLoop::new(&handler)
        .with_telemetry(channels.telemetry_tx.clone())
        .with_metrics(metrics.clone());
    control.on_setup(&world, &config)?;

    // Message and tick contexts
    let (message_handle, message_stats) =
        message_thread::spawn_message_thread(channels.clone(), handler.clone());
    let (tick_handle, tick_stats) =
        tick_thread::spawn_tick_thread(control, world.clone(), step, metrics.clone());

    // Publishers
    let shutdown = Arc::new(AtomicBool::new(false));
    let imu = tokio::spawn(imu_task::imu_task(
        world.clone(),
        channels.imu_tx.clone(),
        config.topics.imu.clone(),
        SimulatedImu::new(runtime.seed, runtime.imu_noise_rad),
        Duration::from_millis(runtime.imu_interval_ms.max(1)),
        shutdown.clone(),
    ));
    let commands = tokio::spawn(command_task::command_task(
        channels.command_tx.clone(),
        command_task::demo_script(&config.topics),
        config.topics.clone(),
        shutdown.clone(),
    ));
    let telemetry = tokio::spawn(telemetry_task::telemetry_task(
        channels.telemetry_rx.clone(),
        config.topics.clone(),
        Duration::from_secs(1),
        shutdown.clone(),
    ));

    info!("running for {} seconds", runtime.run_secs);
    tokio::time::sleep(Duration::from_secs(runtime.run_secs)).await;

    info!("run complete, shutting down");
    shutdown.store(true, Ordering::Relaxed);
    tick_stats.shutdown.store(true, Ordering::Relaxed);
    message_stats.shutdown.store(true, Ordering::Relaxed);

    let imu_published = imu.await?;
    let commands_sent = commands.await?;
    let telemetry_seen = telemetry.await?;
    let control = tokio::task::spawn_blocking(move || tick_handle.join())
        .await?
        .map_err(|_| anyhow!("tick thread panicked"))?;
    tokio::task::spawn_blocking(move || message_handle.join())
        .await?
        .map_err(|_| anyhow!("message thread panicked"))?;

    let report = metrics.report();
    let setpoints = handler.setpoints().snapshot();
    let camera = world.camera_orientation();

    println!("===========================================");
    println!("GIMBAL STABILIZER RESULTS");
    println!("===========================================");
    println!("Sim time: {:.2}s", world.sim_time().as_secs_f64());
    println!(
        "Ticks: {} ({} skipped, {} overruns)",
        tick_stats.total_ticks.load(Ordering::Relaxed),
        tick_stats.skipped_ticks.load(Ordering::Relaxed),
        tick_stats.overruns.load(Ordering::Relaxed)
    );
    println!("Deadline Compliance: {:.2}% ({} missed)", report.deadline_compliance(), report.missed_deadlines);
    println!("IMU samples published: {}, delivered: {}", imu_published, message_stats.imu_messages.load(Ordering::Relaxed));
    println!(
        "Commands sent: {}, accepted: {}, rejected: {}",
        commands_sent,
        message_stats.commands_accepted.load(Ordering::Relaxed),
        message_stats.commands_rejected.load(Ordering::Relaxed)
    );
    println!("Telemetry samples: {} ({} dropped)", telemetry_seen, report.telemetry_dropped);
    println!("Axes:");
    for axis in Axis::ALL {
        let measured = match axis {
            Axis::Pitch => camera.pitch,
            Axis::Roll => camera.roll,
            Axis::Yaw => camera.yaw,
        };
        println!(
            "- {:<5}: {:?}, setpoint {:7.3} rad, camera {:7.3} rad, joint {:7.3} rad, last cmd {:6.3}",
            axis,
            control.axis_status(axis),
            setpoints[axis],
            measured,
            world.sim_joint(axis).current_angle(),
            control.pid(axis).last_output()
        );
    }
    println!("\n=== Performance Metrics ===");
    println!("Tick P50: {:?}, P99: {:?}, max: {:?}", report.tick_p50, report.tick_p99, report.tick_max);
    println!("Timestep jitter P50: {:?}, P99: {:?}", report.jitter_p50, report.jitter_p99);
    println!("Log lines dropped: {}", logger::dropped());

    log::logger().flush();
    Ok(())
}
