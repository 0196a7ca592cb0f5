use std::thread;
use std::time::Duration;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::channel::Receiver;
use log::{info, warn};

use crate::ipc::channels::{GimbalChannels, ImuMessage, SetpointCommand};
use crate::ipc::shared_resource::MessageHandler;

pub struct MessageStats {
    pub imu_messages: AtomicU64,
    pub commands_accepted: AtomicU64,
    pub commands_rejected: AtomicU64,
    pub shutdown: AtomicBool,
}

impl MessageStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            imu_messages: AtomicU64::new(0),
            commands_accepted: AtomicU64::new(0),
            commands_rejected: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        })
    }
}

/// Delivers IMU samples and setpoint commands to the handler as they arrive.
pub fn spawn_message_thread(
    channels: GimbalChannels,
    handler: MessageHandler,
) -> (thread::JoinHandle<()>, Arc<MessageStats>) {
    let stats = MessageStats::new();
    let stats_clone = stats.clone();

    let handle = thread::spawn(move || {
        let imu_rx: &Receiver<ImuMessage> = &channels.imu_rx;
        let command_rx: &Receiver<SetpointCommand> = &channels.command_rx;

        loop {
            if stats_clone.shutdown.load(Ordering::Relaxed) {
                info!("message thread shutting down");
                break;
            }

            // Wake up periodically to check for shutdown
            crossbeam::select! {
                recv(imu_rx) -> msg => match msg {
                    Ok(message) => {
                        handler.on_imu(message);
                        stats_clone.imu_messages.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(_) => {
                        warn!("IMU channel closed");
                        break;
                    }
                },
                recv(command_rx) -> msg => match msg {
                    Ok(command) => match handler.on_command(&command) {
                        Ok(radians) => {
                            info!("{} setpoint {:.4} rad", command.axis, radians);
                            stats_clone.commands_accepted.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(_) => {
                            stats_clone.commands_rejected.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    Err(_) => {
                        warn!("command channel closed");
                        break;
                    }
                },
                default(Duration::from_millis(100)) => continue,
            }
        }
    });

    (handle, stats)
}
