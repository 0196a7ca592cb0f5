//! Sensor module - orientation decoding and the simulated camera IMU

pub mod orientation;
pub mod imu_sim;
