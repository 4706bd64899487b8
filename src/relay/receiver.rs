// src/relay/receiver.rs
use std::sync::Arc;
use tracing::debug;

use crate::heartbeat::HeartbeatBuffer;
use crate::metrics::MetricsCollector;

/// Receive endpoint core: one notification, one deposit attempt, never waits.
#[derive(Clone)]
pub struct HeartbeatReceiver {
    buffer: Arc<HeartbeatBuffer>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl HeartbeatReceiver {
    pub fn new(buffer: Arc<HeartbeatBuffer>, metrics: Option<Arc<MetricsCollector>>) -> Self {
        Self { buffer, metrics }
    }

    /// Returns whether the heartbeat was accepted. A drop is normal and is
    /// never surfaced to the producer.
    pub fn receive(&self) -> bool {
        let accepted = self.buffer.try_deposit();

        if accepted {
            debug!("Forwarded received heartbeat");
        } else {
            debug!("Dropping heartbeat (buffer full)");
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_heartbeat(accepted);
        }

        accepted
    }
}
