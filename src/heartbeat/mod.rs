// src/heartbeat/mod.rs
mod buffer;

pub use buffer::{Heartbeat, HeartbeatBuffer};
