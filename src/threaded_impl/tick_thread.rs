use std::thread;
use std::time::{Duration, Instant};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info};

use crate::axis::Axis;
use crate::control_loop::{GimbalControlLoop, GimbalPlugin, TickReport};
use crate::metrics::TickMetrics;
use crate::sim::SimWorld;

pub struct TickStats {
    pub total_ticks: AtomicU64,
    pub skipped_ticks: AtomicU64,
    pub overruns: AtomicU64,
    pub shutdown: AtomicBool,
}

impl TickStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_ticks: AtomicU64::new(0),
            skipped_ticks: AtomicU64::new(0),
            overruns: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        })
    }
}

/// Steps the world and the controller once per `step`, paced to wall time.
/// The thread hands the controller back when it stops.
pub fn spawn_tick_thread(
    mut control: GimbalControlLoop,
    world: SimWorld,
    step: Duration,
    metrics: TickMetrics,
) -> (thread::JoinHandle<GimbalControlLoop>, Arc<TickStats>) {
    let stats = TickStats::new();
    let stats_clone = stats.clone();

    let handle = thread::spawn(move || {
        // sim time is not advanced for the setup tick
        control.on_tick(world.sim_time());

        loop {
            if stats_clone.shutdown.load(Ordering::Relaxed) {
                info!("tick thread shutting down at sim time {:?}", world.sim_time());
                break;
            }
            let cycle_start = Instant::now();

            world.step(step);
            let report = control.on_tick(world.sim_time());

            let elapsed = cycle_start.elapsed();
            metrics.record_tick(elapsed, step);
            let tick = stats_clone.total_ticks.fetch_add(1, Ordering::Relaxed) + 1;
            if report.is_skipped() {
                stats_clone.skipped_ticks.fetch_add(1, Ordering::Relaxed);
            }

            if tick % 250 == 0 {
                if let TickReport::Completed { .. } = &report {
                    debug!(
                        "tick #{}: cmd pitch {:?} roll {:?} yaw {:?} ({:?})",
                        tick,
                        report.command(Axis::Pitch),
                        report.command(Axis::Roll),
                        report.command(Axis::Yaw),
                        elapsed
                    );
                }
            }

            // Sleep to maintain the step rate
            if elapsed < step {
                thread::sleep(step - elapsed);
            } else {
                stats_clone.overruns.fetch_add(1, Ordering::Relaxed);
            }
        }
        control
    });

    (handle, stats)
}
