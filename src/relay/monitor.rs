// src/relay/monitor.rs
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::config::MonitorMode;
use crate::heartbeat::HeartbeatBuffer;
use crate::metrics::MetricsCollector;

/// What a single monitor probe learned about the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A heartbeat was pending and has been consumed.
    Alive,
    /// Nothing was pending.
    Absent,
}

/// How a probe withdraws from the buffer. Chosen once at startup.
#[async_trait]
pub trait MonitorStrategy: Send + Sync {
    async fn probe(&self, buffer: &HeartbeatBuffer) -> ProbeOutcome;

    fn mode(&self) -> MonitorMode;
}

/// Answers from the current slot state; silence is reported as [`ProbeOutcome::Absent`].
pub struct NonBlockingMonitor;

#[async_trait]
impl MonitorStrategy for NonBlockingMonitor {
    async fn probe(&self, buffer: &HeartbeatBuffer) -> ProbeOutcome {
        if buffer.try_withdraw() {
            ProbeOutcome::Alive
        } else {
            ProbeOutcome::Absent
        }
    }

    fn mode(&self) -> MonitorMode {
        MonitorMode::NonBlocking
    }
}

/// Waits for the next heartbeat and consumes exactly one.
///
/// Never reports absence. Silence shows up as the caller's own timeout
/// (typically the reverse proxy's read timeout) cutting the connection.
pub struct BlockingMonitor;

#[async_trait]
impl MonitorStrategy for BlockingMonitor {
    async fn probe(&self, buffer: &HeartbeatBuffer) -> ProbeOutcome {
        buffer.withdraw_blocking().await;
        ProbeOutcome::Alive
    }

    fn mode(&self) -> MonitorMode {
        MonitorMode::Blocking
    }
}

pub fn create_monitor(mode: MonitorMode) -> Arc<dyn MonitorStrategy> {
    match mode {
        MonitorMode::NonBlocking => Arc::new(NonBlockingMonitor),
        MonitorMode::Blocking => Arc::new(BlockingMonitor),
    }
}

/// Monitor endpoint core: one probe, one withdrawal attempt.
#[derive(Clone)]
pub struct HeartbeatMonitor {
    buffer: Arc<HeartbeatBuffer>,
    strategy: Arc<dyn MonitorStrategy>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl HeartbeatMonitor {
    pub fn new(
        buffer: Arc<HeartbeatBuffer>,
        strategy: Arc<dyn MonitorStrategy>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            buffer,
            strategy,
            metrics,
        }
    }

    pub fn mode(&self) -> MonitorMode {
        self.strategy.mode()
    }

    pub async fn probe(&self) -> ProbeOutcome {
        let start = Instant::now();
        let mode = self.strategy.mode();

        let _waiting = match (&self.metrics, mode) {
            (Some(metrics), MonitorMode::Blocking) => Some(metrics.probe_waiting()),
            _ => None,
        };

        let outcome = self.strategy.probe(&self.buffer).await;

        match outcome {
            ProbeOutcome::Alive => debug!(mode = mode.as_str(), "Served heartbeat from buffer"),
            ProbeOutcome::Absent => debug!(mode = mode.as_str(), "No heartbeat in buffer"),
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_probe(mode, outcome == ProbeOutcome::Alive, start.elapsed());
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsRegistry;
    use tokio::time::{sleep, timeout, Duration};

    #[tokio::test]
    async fn test_non_blocking_reports_absence_immediately() {
        let buffer = HeartbeatBuffer::new();
        let monitor = create_monitor(MonitorMode::NonBlocking);

        let outcome = timeout(Duration::from_millis(50), monitor.probe(&buffer))
            .await
            .expect("non-blocking probe must not wait");
        assert_eq!(outcome, ProbeOutcome::Absent);
    }

    #[tokio::test]
    async fn test_non_blocking_consumes_pending_heartbeat() {
        let buffer = HeartbeatBuffer::new();
        let monitor = create_monitor(MonitorMode::NonBlocking);
        buffer.try_deposit();

        assert_eq!(monitor.probe(&buffer).await, ProbeOutcome::Alive);
        assert_eq!(monitor.probe(&buffer).await, ProbeOutcome::Absent);
    }

    #[tokio::test]
    async fn test_blocking_probe_holds_until_heartbeat() {
        let buffer = Arc::new(HeartbeatBuffer::new());
        let monitor = HeartbeatMonitor::new(
            buffer.clone(),
            create_monitor(MonitorMode::Blocking),
            None,
        );
        assert_eq!(monitor.mode(), MonitorMode::Blocking);

        let probe = {
            let monitor = monitor.clone();
            tokio::spawn(async move { monitor.probe().await })
        };

        sleep(Duration::from_millis(100)).await;
        assert!(!probe.is_finished());

        buffer.try_deposit();
        let outcome = timeout(Duration::from_secs(1), probe).await.unwrap().unwrap();
        assert_eq!(outcome, ProbeOutcome::Alive);
    }

    #[tokio::test]
    async fn test_blocking_probe_tracks_waiting_gauge() {
        let registry = MetricsRegistry::new().unwrap();
        let metrics = registry.collector();
        let buffer = Arc::new(HeartbeatBuffer::new());
        let monitor = HeartbeatMonitor::new(
            buffer.clone(),
            create_monitor(MonitorMode::Blocking),
            Some(metrics.clone()),
        );

        let probe = tokio::spawn(async move { monitor.probe().await });
        sleep(Duration::from_millis(50)).await;
        assert_eq!(metrics.probes_waiting.get(), 1);

        // A probe abandoned by its connection must not stay counted.
        probe.abort();
        let _ = probe.await;
        assert_eq!(metrics.probes_waiting.get(), 0);
        assert!(buffer.try_deposit());
    }
}
