use std::time::Duration;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use crate::ipc::channels::ImuMessage;
use crate::sensor::orientation::{EulerAngles, Quaternion};

/// Camera IMU for the simulated world: true orientation plus uniform noise
/// on each Euler angle.
pub struct SimulatedImu {
    rng: StdRng,
    sequence_counter: u64,
    pub noise_amplitude: f64,
}

impl SimulatedImu {
    pub fn new(seed: u64, noise_amplitude: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            sequence_counter: 0,
            noise_amplitude: noise_amplitude.abs(),
        }
    }

    pub fn sample(&mut self, truth: EulerAngles, stamp: Duration) -> ImuMessage {
        self.sequence_counter += 1;
        let yaw = truth.yaw + self.noise();
        let roll = truth.roll + self.noise();
        let pitch = truth.pitch + self.noise();

        ImuMessage {
            stamp,
            orientation: Quaternion::from_zxy(yaw, roll, pitch),
        }
    }

    pub fn get_sequence(&self) -> u64 {
        self.sequence_counter
    }

    fn noise(&mut self) -> f64 {
        if self.noise_amplitude == 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-self.noise_amplitude..self.noise_amplitude)
    }
}
