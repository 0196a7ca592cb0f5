use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::warn;
use parking_lot::{Mutex, RwLock};

use crate::axis::{Axis, AxisMap};
use crate::error::GimbalError;
use crate::ipc::channels::{ImuMessage, SetpointCommand, SetpointPayload};

// Latest IMU sample. Only the newest value matters, so writers overwrite.
#[derive(Default)]
pub struct ImuSlot {
    latest: Mutex<Option<ImuMessage>>,
    received: AtomicU64,
}

impl ImuSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, message: ImuMessage) {
        *self.latest.lock() = Some(message);
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn latest(&self) -> Option<ImuMessage> {
        *self.latest.lock()
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
}

// Commanded angles, one atomic per axis (f64 bits).
pub struct SetpointStore {
    values: AxisMap<AtomicU64>,
    rejected: AtomicU64,
}

impl Default for SetpointStore {
    fn default() -> Self {
        Self {
            values: AxisMap::from_fn(|_| AtomicU64::new(0.0_f64.to_bits())),
            rejected: AtomicU64::new(0),
        }
    }
}

impl SetpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, axis: Axis) -> f64 {
        f64::from_bits(self.values[axis].load(Ordering::Acquire))
    }

    pub fn snapshot(&self) -> AxisMap<f64> {
        AxisMap::from_fn(|axis| self.get(axis))
    }

    pub fn set(&self, axis: Axis, radians: f64) {
        self.values[axis].store(radians.to_bits(), Ordering::Release);
    }

    /// Parses and stores a payload. Rejected payloads leave the store as is.
    pub fn apply(&self, axis: Axis, payload: &SetpointPayload) -> Result<f64, GimbalError> {
        match payload.to_radians() {
            Ok(radians) => {
                self.set(axis, radians);
                Ok(radians)
            }
            Err(reason) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                Err(GimbalError::InvalidSetpointPayload {
                    axis,
                    payload: format!("{} ({})", payload, reason),
                })
            }
        }
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

/// Entry point of the message context. Cheap to clone; every clone feeds the
/// same slots the control loop reads.
#[derive(Clone, Default)]
pub struct MessageHandler {
    imu: Arc<ImuSlot>,
    setpoints: Arc<SetpointStore>,
}

impl MessageHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn imu(&self) -> &Arc<ImuSlot> {
        &self.imu
    }

    pub fn setpoints(&self) -> &Arc<SetpointStore> {
        &self.setpoints
    }

    pub fn on_imu(&self, message: ImuMessage) {
        self.imu.store(message);
    }

    pub fn on_command(&self, command: &SetpointCommand) -> Result<f64, GimbalError> {
        self.setpoints
            .apply(command.axis, &command.payload)
            .inspect_err(|e| warn!("{}", e))
    }
}

// Bounded history of recent log lines
#[derive(Clone)]
pub struct DiagnosticLog {
    entries: Arc<RwLock<VecDeque<String>>>,
    max_size: usize,
}

impl DiagnosticLog {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(max_size))),
            max_size: max_size.max(1),
        }
    }

    /// Appends a line, evicting the oldest past capacity. Gives up instead of
    /// waiting when a reader holds the history.
    pub fn try_write(&self, message: String) -> bool {
        match self.entries.try_write() {
            Some(mut log) => {
                log.push_back(message);
                if log.len() > self.max_size {
                    log.pop_front();
                }
                true
            }
            None => false,
        }
    }

    pub fn read_all(&self) -> Vec<String> {
        self.entries.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
