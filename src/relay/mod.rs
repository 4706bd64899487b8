// src/relay/mod.rs
mod monitor;
mod receiver;
mod relay;

pub use monitor::{
    create_monitor, BlockingMonitor, HeartbeatMonitor, MonitorStrategy, NonBlockingMonitor,
    ProbeOutcome,
};
pub use receiver::HeartbeatReceiver;
pub use relay::{Relay, RelayError};
