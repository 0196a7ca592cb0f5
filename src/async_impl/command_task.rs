use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::channel::Sender;
use log::{info, warn};
use tokio::time::{sleep, Duration};

use crate::axis::Axis;
use crate::config::TopicConfig;
use crate::ipc::channels::{SetpointCommand, SetpointPayload, TypedValue};

#[derive(Clone, Debug)]
pub struct ScriptedCommand {
    /// Delay after the previous command.
    pub after: Duration,
    pub topic: String,
    pub payload: SetpointPayload,
}

fn scripted(after_ms: u64, topic: &str, payload: SetpointPayload) -> ScriptedCommand {
    ScriptedCommand {
        after: Duration::from_millis(after_ms),
        topic: topic.to_string(),
        payload,
    }
}

/// Setpoint sweep mixing typed and legacy text payloads, with one malformed
/// payload, one command on a topic nobody listens to, and one command
/// across the ±PI seam.
pub fn demo_script(topics: &TopicConfig) -> Vec<ScriptedCommand> {
    let pitch = topics.command(Axis::Pitch);
    let roll = topics.command(Axis::Roll);
    let yaw = topics.command(Axis::Yaw);
    vec![
        scripted(1500, pitch, SetpointPayload::Typed(TypedValue::Double(-0.5))),
        scripted(1000, yaw, SetpointPayload::Text("0.8".to_string())),
        scripted(1000, roll, SetpointPayload::Typed(TypedValue::Double(0.15))),
        scripted(500, roll, SetpointPayload::Text("level".to_string())),
        scripted(250, "~/gimbal_zoom_cmd", SetpointPayload::Typed(TypedValue::Double(2.0))),
        scripted(750, yaw, SetpointPayload::Typed(TypedValue::Double(3.0))),
        scripted(1500, yaw, SetpointPayload::Text("-3.0".to_string())),
        scripted(1000, pitch, SetpointPayload::Typed(TypedValue::String(" -0.2 ".to_string()))),
        scripted(500, roll, SetpointPayload::Typed(TypedValue::Int32(0))),
    ]
}

/// Routes the script to axes by topic and sends it in order. Returns how
/// many commands were sent.
pub async fn command_task(
    command_tx: Sender<SetpointCommand>,
    script: Vec<ScriptedCommand>,
    topics: TopicConfig,
    shutdown: Arc<AtomicBool>,
) -> usize {
    let mut sent = 0;
    for step in script {
        sleep(step.after).await;
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        let Some(axis) = topics.command_axis(&step.topic) else {
            warn!("no gimbal axis subscribes to `{}`, command ignored", step.topic);
            continue;
        };
        info!("publishing on {}: {}", step.topic, step.payload);
        if command_tx.try_send(SetpointCommand { axis, payload: step.payload }).is_err() {
            warn!("command queue unavailable, command dropped");
            continue;
        }
        sent += 1;
    }
    sent
}
