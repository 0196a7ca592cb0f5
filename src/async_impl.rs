//! Async publishers for the simulated world - IMU samples, scripted setpoint
//! commands, and a telemetry monitor

pub mod imu_task;
pub mod command_task;
pub mod telemetry_task;
