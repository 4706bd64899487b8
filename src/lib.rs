// src/lib.rs
pub mod config;
pub mod heartbeat;
pub mod metrics;
pub mod relay;
pub mod server;
