// src/metrics/mod.rs
mod collector;
mod server;

pub use collector::{MetricsCollector, MetricsRegistry, WaitingGuard};
pub use server::start_metrics_server;
