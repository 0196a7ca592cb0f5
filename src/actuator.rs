//! Actuator module - per-axis PID control and the joint actuation interface

pub mod controller;
pub mod joint;
