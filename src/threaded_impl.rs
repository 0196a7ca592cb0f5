//! Threaded execution contexts - the serialized tick thread and the message
//! thread that drains inbound channels into the shared slots

pub mod tick_thread;
pub mod message_thread;
