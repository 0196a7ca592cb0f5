use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::channel::{Sender, TrySendError};
use log::{debug, info, warn};
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::ipc::channels::ImuMessage;
use crate::sensor::imu_sim::SimulatedImu;
use crate::sim::SimWorld;

/// Publishes a noisy camera orientation on `topic` every `period`. Returns
/// the number of samples published.
pub async fn imu_task(
    world: SimWorld,
    imu_tx: Sender<ImuMessage>,
    topic: String,
    mut imu: SimulatedImu,
    period: Duration,
    shutdown: Arc<AtomicBool>,
) -> u64 {
    let mut interval_timer = interval(period);
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut published = 0u64;
    info!("publishing IMU samples on {} every {:?}", topic, period);

    loop {
        interval_timer.tick().await;
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        let sample = imu.sample(world.camera_orientation(), world.sim_time());
        match imu_tx.try_send(sample) {
            Ok(()) => published += 1,
            Err(TrySendError::Full(_)) => debug!("IMU queue full, sample #{} dropped", imu.get_sequence()),
            Err(TrySendError::Disconnected(_)) => {
                warn!("IMU subscribers gone, publisher stopping");
                break;
            }
        }
    }
    published
}
