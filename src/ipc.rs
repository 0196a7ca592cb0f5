//! IPC module - message payloads, channels, and the state shared between the
//! message context and the tick context

pub mod channels;
pub mod shared_resource;
