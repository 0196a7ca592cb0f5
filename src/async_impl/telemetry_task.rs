use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::channel::Receiver;
use log::info;
use tokio::time::{interval, Duration};

use crate::axis::{Axis, AxisMap};
use crate::config::TopicConfig;
use crate::ipc::channels::Telemetry;

/// Drains telemetry without blocking and logs the latest readback per status
/// topic once per `period`. Returns the total number of samples seen.
pub async fn telemetry_task(
    telemetry_rx: Arc<Receiver<Telemetry>>,
    topics: TopicConfig,
    period: Duration,
    shutdown: Arc<AtomicBool>,
) -> u64 {
    let mut interval_timer = interval(period);
    let mut latest: AxisMap<Option<Telemetry>> = AxisMap::default();
    let mut received = 0u64;

    loop {
        interval_timer.tick().await;
        for sample in telemetry_rx.try_iter() {
            latest[sample.axis] = Some(sample);
            received += 1;
        }

        let readback: Vec<String> = Axis::ALL
            .iter()
            .map(|&axis| {
                let degrees = latest[axis].map(|t| t.angle.to_degrees()).unwrap_or(f64::NAN);
                format!("{} {:7.2}deg", topics.status(axis), degrees)
            })
            .collect();
        info!("{} ({} samples)", readback.join(", "), received);

        if shutdown.load(Ordering::Relaxed) {
            break;
        }
    }
    received
}
